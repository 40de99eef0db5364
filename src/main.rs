//! Demo entry point: starts a registry, two servers that heartbeat into it,
//! then drives a super-client through a plain call and a broadcast call —
//! the same shape as the original's `day7demo`, minus its commented-out
//! earlier iterations.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use georpc_discovery::{RegistryDiscovery, SelectMode};
use georpc_registry::Register;
use georpc_server::Server;
use georpc_service::ServiceBuilder;
use georpc_xclient::XClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn foo_service() -> Arc<georpc_service::Service> {
    ServiceBuilder::new("Foo")
        .method("Sum", |(num1, num2): (i64, i64)| async move { Ok(num1 + num2) })
        .build()
}

async fn start_registry() -> String {
    let register = Register::new(Duration::ZERO);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind registry");
    let addr = listener.local_addr().expect("registry local addr");
    tokio::spawn(async move {
        let app = georpc_registry::router(register);
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "registry stopped");
        }
    });
    format!("http://{addr}{}", georpc_protocol::DEFAULT_REGISTRY_PATH)
}

async fn start_server(registry_url: &str) {
    let server = Arc::new(Server::new());
    server.register(foo_service()).expect("register Foo service");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind server");
    let addr = listener.local_addr().expect("server local addr");
    drop(listener);
    let rpc_addr = format!("tcp {addr}");
    georpc_registry::heartbeat(registry_url.to_owned(), rpc_addr, Duration::ZERO)
        .await
        .expect("start heartbeat");
    tokio::spawn(async move {
        if let Err(e) = server.accept_tcp(&addr.to_string()).await {
            tracing::error!(error = %e, "server stopped");
        }
    });
}

async fn simple_call(xc: &XClient) {
    for i in 0..5i64 {
        match xc.call::<(i64, i64), i64>("Foo.Sum", &(i, i), None).await {
            Ok(reply) => info!(reply, "simple call succeeded"),
            Err(e) => tracing::warn!(error = %e, "simple call failed"),
        }
    }
}

async fn broadcast_call(xc: &XClient) {
    for i in 0..5i64 {
        match xc.broadcast::<(i64, i64), i64>("Foo.Sum", &(i, i), None).await {
            Ok(reply) => info!(reply, "broadcast call succeeded"),
            Err(e) => tracing::warn!(error = %e, "broadcast call failed"),
        }
    }
}

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let registry_url = start_registry().await;
    info!(registry = %registry_url, "registry listening");

    start_server(&registry_url).await;
    start_server(&registry_url).await;
    // Give both servers time to land their first heartbeat before discovery
    // polls the registry.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let discovery = Arc::new(RegistryDiscovery::new(registry_url, Duration::ZERO));
    let xclient = XClient::new(discovery, SelectMode::Random, georpc_protocol::ConnectOption::default());

    simple_call(&xclient).await;
    broadcast_call(&xclient).await;

    xclient.close().await.expect("close xclient");
}
