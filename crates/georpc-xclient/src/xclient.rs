use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use georpc_client::Client;
use georpc_discovery::{Discovery, SelectMode};
use georpc_protocol::ConnectOption;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::XClientError;

/// A client that picks its server address through a [`Discovery`] instead of
/// dialing a fixed one, caching one multiplexed [`Client`] per address it
/// has already dialed so repeated calls to the same server reuse one
/// connection.
pub struct XClient {
    discovery: Arc<dyn Discovery>,
    mode: SelectMode,
    option: ConnectOption,
    clients: Mutex<HashMap<String, Arc<Client>>>,
}

impl XClient {
    pub fn new(discovery: Arc<dyn Discovery>, mode: SelectMode, option: ConnectOption) -> Self {
        Self {
            discovery,
            mode,
            option,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client for `rpc_addr` if it's still available,
    /// otherwise dials a fresh one and replaces the cache entry.
    async fn dial(&self, rpc_addr: &str) -> Result<Arc<Client>, XClientError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(rpc_addr) {
            if client.is_available() {
                return Ok(client.clone());
            }
            clients.remove(rpc_addr);
        }
        let client = Client::dial(rpc_addr, self.option.clone()).await?;
        clients.insert(rpc_addr.to_owned(), client.clone());
        Ok(client)
    }

    /// Picks one server via the configured [`SelectMode`] and calls it.
    pub async fn call<Req, Res>(
        &self,
        service_method: &str,
        args: &Req,
        timeout: Option<Duration>,
    ) -> Result<Res, XClientError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let addr = self.discovery.get(self.mode).await?;
        let client = self.dial(&addr).await?;
        client
            .call(service_method, args, timeout)
            .await
            .map_err(XClientError::from)
    }

    /// Calls every currently-discovered server and waits for all of them to
    /// finish, so a straggler server never gets cancelled just because
    /// another one already answered.
    ///
    /// Keeps the first successful reply seen (in completion order) and the
    /// first error seen, same as the original. Differs from the original in
    /// one deliberate way: the original could return that first error even
    /// after a different call had already filled in a successful reply,
    /// because it recorded the error with no regard for `replyDone`. Here,
    /// any success at all wins; an error is only surfaced when every server
    /// failed.
    pub async fn broadcast<Req, Res>(
        &self,
        service_method: &str,
        args: &Req,
        timeout: Option<Duration>,
    ) -> Result<Res, XClientError>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let servers = self.discovery.get_all().await?;
        if servers.is_empty() {
            return Err(XClientError::NoServers);
        }

        let mut calls = FuturesUnordered::new();
        for addr in &servers {
            calls.push(async move {
                let client = self.dial(addr).await?;
                client
                    .call::<Req, Res>(service_method, args, timeout)
                    .await
                    .map_err(XClientError::from)
            });
        }

        let mut first_ok = None;
        let mut first_err = None;
        while let Some(result) = calls.next().await {
            match result {
                Ok(res) if first_ok.is_none() => first_ok = Some(res),
                Err(e) if first_err.is_none() => first_err = Some(e),
                _ => {}
            }
        }
        first_ok.ok_or_else(|| first_err.unwrap_or(XClientError::NoServers))
    }

    /// Closes and forgets every cached connection.
    pub async fn close(&self) -> Result<(), XClientError> {
        let mut clients = self.clients.lock().await;
        for (_, client) in clients.drain() {
            let _ = client.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use georpc_discovery::ManualDiscovery;
    use georpc_server::Server;
    use georpc_service::ServiceBuilder;

    async fn spawn_server(fail: bool) -> String {
        let server = Arc::new(Server::new());
        server
            .register(
                ServiceBuilder::new("Math")
                    .method("Sum", move |(a, b): (i32, i32)| async move {
                        if fail {
                            Err(georpc_service::ServiceError::Handler("down for maintenance".to_owned()))
                        } else {
                            Ok(a + b)
                        }
                    })
                    .build(),
            )
            .unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let addr_string = addr.to_string();
        tokio::spawn({
            let addr_string = addr_string.clone();
            async move {
                let _ = server.accept_tcp(&addr_string).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        format!("tcp {addr_string}")
    }

    #[tokio::test]
    async fn call_picks_one_server_and_succeeds() {
        let addr = spawn_server(false).await;
        let discovery = Arc::new(ManualDiscovery::new(vec![addr]));
        let xclient = XClient::new(discovery, SelectMode::Random, ConnectOption::new(georpc_protocol::GOB_CODEC));
        let sum: i32 = xclient.call("Math.Sum", &(2i32, 3i32), None).await.unwrap();
        assert_eq!(sum, 5);
    }

    #[tokio::test]
    async fn broadcast_waits_for_every_server_and_keeps_the_first_success() {
        let good = spawn_server(false).await;
        let bad = spawn_server(true).await;
        let discovery = Arc::new(ManualDiscovery::new(vec![good, bad]));
        let xclient = XClient::new(discovery, SelectMode::Random, ConnectOption::new(georpc_protocol::GOB_CODEC));
        let sum: i32 = xclient
            .broadcast("Math.Sum", &(10i32, 20i32), None)
            .await
            .unwrap();
        assert_eq!(sum, 30);
    }

    #[tokio::test]
    async fn broadcast_surfaces_an_error_only_when_every_server_fails() {
        let bad_a = spawn_server(true).await;
        let bad_b = spawn_server(true).await;
        let discovery = Arc::new(ManualDiscovery::new(vec![bad_a, bad_b]));
        let xclient = XClient::new(discovery, SelectMode::Random, ConnectOption::new(georpc_protocol::GOB_CODEC));
        let result: Result<i32, XClientError> = xclient.broadcast("Math.Sum", &(1i32, 1i32), None).await;
        assert!(matches!(result, Err(XClientError::Client(_))));
    }

    #[tokio::test]
    async fn broadcast_on_empty_discovery_errors_without_dialing() {
        let discovery = Arc::new(ManualDiscovery::new(Vec::new()));
        let xclient = XClient::new(discovery, SelectMode::Random, ConnectOption::new(georpc_protocol::GOB_CODEC));
        let result: Result<i32, XClientError> = xclient.broadcast("Math.Sum", &(1i32, 1i32), None).await;
        assert!(matches!(result, Err(XClientError::NoServers)));
    }

    #[tokio::test]
    async fn dial_reuses_a_cached_client() {
        let addr = spawn_server(false).await;
        let discovery = Arc::new(ManualDiscovery::new(vec![addr]));
        let xclient = XClient::new(discovery, SelectMode::RoundRobin, ConnectOption::new(georpc_protocol::GOB_CODEC));
        let _: i32 = xclient.call("Math.Sum", &(1i32, 1i32), None).await.unwrap();
        let cached_after_first = xclient.clients.lock().await.len();
        let _: i32 = xclient.call("Math.Sum", &(2i32, 2i32), None).await.unwrap();
        let cached_after_second = xclient.clients.lock().await.len();
        assert_eq!(cached_after_first, 1);
        assert_eq!(cached_after_second, 1);
    }
}
