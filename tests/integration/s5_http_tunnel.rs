use std::sync::Arc;
use std::time::Duration;

use georpc_client::Client;
use georpc_protocol::ConnectOption;
use georpc_server::Server;
use georpc_service::ServiceBuilder;

/// S5: the same call as S1, but dialed through an HTTP CONNECT tunnel
/// instead of a raw socket.
#[tokio::test]
async fn http_tunneled_call_returns_the_summed_reply() {
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
    tokio::spawn(async move {
        let _ = axum::serve(listener, georpc_server::router(server)).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = Client::dial(&format!("http {addr}"), ConnectOption::new(georpc_protocol::GOB_CODEC))
        .await
        .unwrap();
    let reply: i64 = client.call("Foo.Sum", &(3i64, 4i64), None).await.unwrap();
    assert_eq!(reply, 7);
}
