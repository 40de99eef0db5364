use std::sync::Arc;
use std::time::Duration;

use georpc_client::{Client, ClientError};
use georpc_protocol::ConnectOption;
use georpc_server::Server;
use georpc_service::ServiceBuilder;

/// S2: a server-side `handle_timeout` shorter than a slow method's own sleep
/// surfaces the timeout marker to the caller as a remote error, and the
/// connection keeps serving later calls normally — the straggler handler
/// itself is never cancelled, only its reply is discarded.
#[tokio::test]
async fn slow_method_times_out_but_connection_stays_usable() {
    let server = Arc::new(
        Server::new().with_handle_timeout(Duration::from_millis(50)),
    );
    server
        .register(
            ServiceBuilder::new("Foo")
                .method("Sum", |(num1, num2): (i64, i64)| async move { Ok(num1 + num2) })
                .method("Slow", |millis: u64| async move {
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    Ok(())
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

    let client = Client::dial_tcp(&addr_string, ConnectOption::new(georpc_protocol::GOB_CODEC))
        .await
        .unwrap();

    let result: Result<(), ClientError> = client.call("Foo.Slow", &300u64, None).await;
    match result {
        Err(ClientError::Remote(msg)) => assert_eq!(msg, georpc_protocol::HANDLE_TIMEOUT_MARKER),
        other => panic!("expected the handle-timeout marker, got {other:?}"),
    }

    // The straggler handler is still running in the background, but the
    // connection itself is unaffected: a fresh call succeeds normally.
    let reply: i64 = client.call("Foo.Sum", &(10i64, 20i64), None).await.unwrap();
    assert_eq!(reply, 30);
}
