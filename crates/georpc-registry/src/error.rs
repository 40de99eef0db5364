#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("heartbeat request failed: {0}")]
    Heartbeat(#[from] reqwest::Error),
}
