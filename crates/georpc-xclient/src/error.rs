#[derive(Debug, thiserror::Error)]
pub enum XClientError {
    #[error("discovery: {0}")]
    Discovery(#[from] georpc_discovery::DiscoveryError),
    #[error("client: {0}")]
    Client(#[from] georpc_client::ClientError),
    #[error("no servers available to broadcast to")]
    NoServers,
}
