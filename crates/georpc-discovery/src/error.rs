#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no servers available")]
    EmptyServerList,
    #[error("registry request failed: {0}")]
    Registry(#[from] reqwest::Error),
}
