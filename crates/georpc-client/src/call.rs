use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::error::ClientError;

/// One registered entry in the client's pending-call table: just enough to
/// route the matching response (or the terminal error, if the connection
/// drops first) back to whoever is waiting on `rx`.
pub(crate) struct PendingEntry {
    pub(crate) tx: mpsc::Sender<Result<Vec<u8>, ClientError>>,
}

/// A call in flight. Returned by [`crate::Client::go`]; [`crate::Client::call`]
/// is built on top of it for the common "send and wait" case.
///
/// `buf` (the channel capacity passed to `go`) must be at least 1, so the
/// receive loop's `try_send` of the single eventual result never blocks or
/// is dropped for lack of a slot.
pub struct Call {
    pub seq: u64,
    pub service_method: String,
    pub(crate) rx: mpsc::Receiver<Result<Vec<u8>, ClientError>>,
}

impl Call {
    /// Waits for the reply body, still encoded.
    pub async fn recv_bytes(mut self) -> Result<Vec<u8>, ClientError> {
        self.rx.recv().await.ok_or(ClientError::ConnectionClosed)?
    }

    /// Waits for the reply and decodes it as `Res`.
    pub async fn recv<Res: DeserializeOwned>(self) -> Result<Res, ClientError> {
        let bytes = self.recv_bytes().await?;
        georpc_codec::decode(&bytes).map_err(ClientError::from)
    }
}
