use std::sync::Arc;
use std::time::Duration;

use georpc_client::{Client, ClientError};
use georpc_protocol::ConnectOption;
use georpc_server::Server;
use georpc_service::ServiceBuilder;

/// S6: calling a method nobody registered comes back as a named error, and
/// the connection survives to serve a following, valid call.
#[tokio::test]
async fn unknown_method_errors_without_breaking_the_connection() {
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

    let result: Result<i64, ClientError> = client.call("NoSuch.Method", &(), None).await;
    match result {
        Err(ClientError::Remote(msg)) => assert!(msg.contains("NoSuch")),
        other => panic!("expected a named remote error, got {other:?}"),
    }

    let reply: i64 = client.call("Foo.Sum", &(1i64, 2i64), None).await.unwrap();
    assert_eq!(reply, 3);
}
