use std::sync::Arc;
use std::time::Duration;

use georpc_discovery::{ManualDiscovery, SelectMode};
use georpc_server::Server;
use georpc_service::ServiceBuilder;
use georpc_xclient::{XClient, XClientError};

async fn start_server() -> (String, tokio::task::JoinHandle<()>) {
    let server = Arc::new(Server::new());
    server
        .register(
            ServiceBuilder::new("Foo")
                .method("Sum", |(num1, num2): (i64, i64)| async move { Ok(num1 + num2) })
                .build(),
        )
        .unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = server.accept_tcp(&addr.to_string()).await;
    });
    // accept_tcp binds once it runs; give it a moment before handing back
    // the address the listener above already reserved.
    tokio::time::sleep(Duration::from_millis(20)).await;
    (format!("tcp {addr}"), handle)
}

/// S4: `broadcast` waits for every discovered server and returns the first
/// success; killing one server still leaves the broadcast succeeding via
/// the other; killing both surfaces an error.
#[tokio::test]
async fn broadcast_survives_a_single_server_loss_but_not_both() {
    let (addr_a, handle_a) = start_server().await;
    let (addr_b, handle_b) = start_server().await;
    let discovery = Arc::new(ManualDiscovery::new(vec![addr_a, addr_b]));
    let xclient = XClient::new(discovery, SelectMode::Random, georpc_protocol::ConnectOption::default());

    let reply: i64 = xclient.broadcast("Foo.Sum", &(5i64, 5i64), None).await.unwrap();
    assert_eq!(reply, 10);

    // Drop the cached connections so the next broadcast has to dial fresh —
    // otherwise an already-open socket to a "killed" server would still work,
    // since killing only stops the listener from accepting new connections.
    xclient.close().await.unwrap();
    handle_b.abort();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let reply: i64 = xclient.broadcast("Foo.Sum", &(5i64, 5i64), None).await.unwrap();
    assert_eq!(reply, 10);

    xclient.close().await.unwrap();
    handle_a.abort();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result: Result<i64, XClientError> = xclient.broadcast("Foo.Sum", &(5i64, 5i64), None).await;
    assert!(result.is_err());
}
