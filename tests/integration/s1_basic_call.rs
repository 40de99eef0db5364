use std::sync::Arc;
use std::time::Duration;

use georpc_client::Client;
use georpc_protocol::ConnectOption;
use georpc_server::Server;
use georpc_service::ServiceBuilder;

/// S1: register `Foo.Sum`, connect over raw TCP, call it, expect the sum
/// back with no error.
#[tokio::test]
async fn raw_tcp_call_returns_the_summed_reply() {
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
    drop(listener);
    let addr_string = addr.to_string();
    tokio::spawn({
        let addr_string = addr_string.clone();
        async move {
            let _ = server.accept_tcp(&addr_string).await;
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = Client::dial_tcp(&addr_string, ConnectOption::new(georpc_protocol::GOB_CODEC))
        .await
        .unwrap();
    let reply: i64 = client.call("Foo.Sum", &(3i64, 4i64), None).await.unwrap();
    assert_eq!(reply, 7);
}
