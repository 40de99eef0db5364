use std::sync::Arc;
use std::time::Duration;

use georpc_discovery::{RegistryDiscovery, SelectMode};
use georpc_protocol::DEFAULT_REGISTRY_PATH;
use georpc_registry::Register;
use georpc_server::Server;
use georpc_service::{Service, ServiceBuilder};
use georpc_xclient::XClient;

fn foo_service() -> Arc<Service> {
    ServiceBuilder::new("Foo")
        .method("Sum", |(num1, num2): (i64, i64)| async move { Ok(num1 + num2) })
        .build()
}

async fn start_registry() -> String {
    let register = Register::new(Duration::from_secs(60));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let app = georpc_registry::router(register);
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}{DEFAULT_REGISTRY_PATH}")
}

async fn start_server(registry_url: &str) -> Arc<Service> {
    let service = foo_service();
    let server = Arc::new(Server::new());
    server.register(service.clone()).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    georpc_registry::heartbeat(
        registry_url.to_owned(),
        format!("tcp {addr}"),
        Duration::from_millis(50),
    )
    .await
    .unwrap();
    tokio::spawn(async move {
        let _ = server.accept_tcp(&addr.to_string()).await;
    });
    service
}

/// S3: a super-client over random selection, spread across two servers
/// behind one registry, sees every call answered correctly and both
/// servers' call counters end up strictly positive and summing to the total.
#[tokio::test]
async fn random_selection_spreads_load_across_both_servers() {
    let registry_url = start_registry().await;
    let service_a = start_server(&registry_url).await;
    let service_b = start_server(&registry_url).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    let discovery = Arc::new(RegistryDiscovery::new(registry_url, Duration::from_millis(20)));
    let xclient = XClient::new(discovery, SelectMode::Random, georpc_protocol::ConnectOption::default());

    for i in 0..100i64 {
        let reply: i64 = xclient.call("Foo.Sum", &(i, i), None).await.unwrap();
        assert_eq!(reply, i * 2);
    }

    let count_a = service_a.method("Sum").unwrap().call_count();
    let count_b = service_b.method("Sum").unwrap().call_count();
    assert_eq!(count_a + count_b, 100);
    assert!(count_a > 0, "server A never got a call");
    assert!(count_b > 0, "server B never got a call");
}
