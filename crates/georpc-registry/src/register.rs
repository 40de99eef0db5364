use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;

/// A live server bulletin board: servers `POST` a heartbeat to register or
/// renew themselves, clients `GET` the current set. Entries older than
/// `timeout` are dropped the next time anyone enumerates the list — there's
/// no background sweep, matching the original's lazy eviction.
pub struct Register {
    servers: Mutex<HashMap<String, Instant>>,
    timeout: Duration,
}

impl Register {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            servers: Mutex::new(HashMap::new()),
            timeout: if timeout.is_zero() {
                georpc_protocol::DEFAULT_REGISTRY_TIMEOUT
            } else {
                timeout
            },
        })
    }

    async fn put_server(&self, addr: String) {
        self.servers.lock().await.insert(addr, Instant::now());
    }

    /// Returns every server whose last heartbeat is still within `timeout`,
    /// evicting the rest as a side effect of enumerating them. `timeout ==
    /// 0` (only reachable by constructing with a non-default timeout of
    /// zero, which [`Register::new`] itself never produces) would mean
    /// "never expire"; kept here for parity with the original semantics.
    async fn alive_servers(&self) -> Vec<String> {
        let mut servers = self.servers.lock().await;
        let timeout = self.timeout;
        servers.retain(|_, started| timeout.is_zero() || started.elapsed() < timeout);
        servers.keys().cloned().collect()
    }
}

pub fn router(register: Arc<Register>) -> Router {
    Router::new()
        .route(
            georpc_protocol::DEFAULT_REGISTRY_PATH,
            get(handle_get).post(handle_post),
        )
        .with_state(register)
}

async fn handle_get(State(register): State<Arc<Register>>) -> impl axum::response::IntoResponse {
    let servers = register.alive_servers().await;
    let mut headers = HeaderMap::new();
    if let Ok(value) = servers.join(",").parse() {
        headers.insert("X-Geerpc-Servers", value);
    }
    (StatusCode::OK, headers)
}

async fn handle_post(
    State(register): State<Arc<Register>>,
    headers: HeaderMap,
) -> StatusCode {
    match headers.get("X-Geerpc-Server").and_then(|v| v.to_str().ok()) {
        Some(addr) if !addr.is_empty() => {
            register.put_server(addr.to_owned()).await;
            StatusCode::OK
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
