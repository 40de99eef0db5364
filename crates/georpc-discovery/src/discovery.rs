use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;

use crate::error::DiscoveryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    Random,
    RoundRobin,
}

/// How a client finds the address of a server willing to handle a call.
/// `Manual` and `Registry` discovery differ only in where the list of
/// candidates comes from; both share the same selection logic.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Forces a refresh against whatever backs this discovery (a no-op for
    /// [`ManualDiscovery`]).
    async fn refresh(&self) -> Result<(), DiscoveryError>;
    /// Replaces the candidate list outright.
    async fn update(&self, servers: Vec<String>) -> Result<(), DiscoveryError>;
    /// Picks one candidate per `mode`.
    async fn get(&self, mode: SelectMode) -> Result<String, DiscoveryError>;
    /// Returns every current candidate.
    async fn get_all(&self) -> Result<Vec<String>, DiscoveryError>;
}

struct ServerList {
    servers: Vec<String>,
    /// Next index `RoundRobin` will hand out. One mutex covers both fields
    /// so a `get` never observes a list and a position taken from different
    /// points in time.
    position: usize,
}

impl ServerList {
    fn new(servers: Vec<String>) -> Self {
        let position = if servers.is_empty() {
            0
        } else {
            rand::thread_rng().gen_range(0..servers.len())
        };
        Self { servers, position }
    }

    fn select(&mut self, mode: SelectMode) -> Result<String, DiscoveryError> {
        if self.servers.is_empty() {
            return Err(DiscoveryError::EmptyServerList);
        }
        match mode {
            SelectMode::Random => {
                let i = rand::thread_rng().gen_range(0..self.servers.len());
                Ok(self.servers[i].clone())
            }
            SelectMode::RoundRobin => {
                self.position %= self.servers.len();
                let server = self.servers[self.position].clone();
                self.position = (self.position + 1) % self.servers.len();
                Ok(server)
            }
        }
    }
}

/// A fixed, caller-supplied list of servers — no refresh, no backing store.
pub struct ManualDiscovery {
    list: Mutex<ServerList>,
}

impl ManualDiscovery {
    pub fn new(servers: Vec<String>) -> Self {
        Self {
            list: Mutex::new(ServerList::new(servers)),
        }
    }
}

#[async_trait]
impl Discovery for ManualDiscovery {
    async fn refresh(&self) -> Result<(), DiscoveryError> {
        Ok(())
    }

    async fn update(&self, servers: Vec<String>) -> Result<(), DiscoveryError> {
        *self.list.lock().await = ServerList::new(servers);
        Ok(())
    }

    async fn get(&self, mode: SelectMode) -> Result<String, DiscoveryError> {
        self.list.lock().await.select(mode)
    }

    async fn get_all(&self) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.list.lock().await.servers.clone())
    }
}

/// Discovers servers by polling a `georpc` registry's `X-Geerpc-Servers`
/// header, refreshing at most once per `ttl`.
pub struct RegistryDiscovery {
    registry_url: String,
    http: reqwest::Client,
    ttl: Duration,
    list: Mutex<ServerList>,
    last_refresh: Mutex<Option<Instant>>,
}

impl RegistryDiscovery {
    /// `ttl` of `Duration::ZERO` uses [`georpc_protocol::DEFAULT_DISCOVERY_REFRESH_TTL`].
    pub fn new(registry_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            registry_url: registry_url.into(),
            http: reqwest::Client::new(),
            ttl: if ttl.is_zero() {
                georpc_protocol::DEFAULT_DISCOVERY_REFRESH_TTL
            } else {
                ttl
            },
            list: Mutex::new(ServerList::new(Vec::new())),
            last_refresh: Mutex::new(None),
        }
    }

    async fn refresh_if_stale(&self) -> Result<(), DiscoveryError> {
        let mut last_refresh = self.last_refresh.lock().await;
        if let Some(at) = *last_refresh {
            if at.elapsed() < self.ttl {
                return Ok(());
            }
        }
        tracing::debug!(registry = %self.registry_url, "refreshing server list from registry");
        let response = self.http.get(&self.registry_url).send().await?;
        let header = response
            .headers()
            .get("X-Geerpc-Servers")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let servers: Vec<String> = header
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        *self.list.lock().await = ServerList::new(servers);
        *last_refresh = Some(Instant::now());
        Ok(())
    }
}

#[async_trait]
impl Discovery for RegistryDiscovery {
    async fn refresh(&self) -> Result<(), DiscoveryError> {
        // Force a refresh regardless of TTL by clearing the last-refresh
        // timestamp first.
        *self.last_refresh.lock().await = None;
        self.refresh_if_stale().await
    }

    async fn update(&self, servers: Vec<String>) -> Result<(), DiscoveryError> {
        *self.list.lock().await = ServerList::new(servers);
        *self.last_refresh.lock().await = Some(Instant::now());
        Ok(())
    }

    async fn get(&self, mode: SelectMode) -> Result<String, DiscoveryError> {
        self.refresh_if_stale().await?;
        self.list.lock().await.select(mode)
    }

    async fn get_all(&self) -> Result<Vec<String>, DiscoveryError> {
        self.refresh_if_stale().await?;
        Ok(self.list.lock().await.servers.clone())
    }
}
