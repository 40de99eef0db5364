//! Wire-level data model shared by the server, client, discovery and
//! registry crates: the request/response `Header`, the connection-opening
//! `ConnectOption` handshake record, address/service-method grammar helpers,
//! and the handful of protocol-wide constants (paths, magic numbers,
//! defaults) that every other crate in this workspace needs to agree on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Magic value the server checks on every [`ConnectOption`] to reject
/// connections that aren't speaking this protocol at all.
pub const TYPE_NUMBER: u32 = 0x123456;

/// Built-in body codec name. See `georpc-codec`.
pub const GOB_CODEC: &str = "gob";

/// HTTP CONNECT path the server mounts for tunneled connections.
pub const DEFAULT_RPC_PATH: &str = "/_geerpc_";

/// HTTP path serving the per-service call-count debug page.
pub const DEFAULT_DEBUG_PATH: &str = "/debug/geerpc";

/// Default mount path for the service registry.
pub const DEFAULT_REGISTRY_PATH: &str = "/_geerpc_/registry";

/// Reason phrase the server writes (and the HTTP-tunnel client checks for)
/// on a successful CONNECT upgrade.
pub const CONNECTED_REASON: &str = "200 Connected to Gee RPC";

/// Error text placed in a response header when a handler is still running
/// after `handle_timeout` elapses.
pub const HANDLE_TIMEOUT_MARKER: &str = "rpc server: handle and send request timeout";

/// Default registry liveness window.
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default discovery refresh TTL.
pub const DEFAULT_DISCOVERY_REFRESH_TTL: Duration = Duration::from_secs(10);

/// `heartbeat()`'s default period when the caller passes `Duration::ZERO`:
/// `DEFAULT_REGISTRY_TIMEOUT - 1 minute`.
pub fn default_heartbeat_period() -> Duration {
    DEFAULT_REGISTRY_TIMEOUT - Duration::from_secs(60)
}

/// The header accompanying every request/response body on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub service_method: String,
    pub seq: u64,
    /// Empty iff the call succeeded.
    #[serde(default)]
    pub error: String,
}

impl Header {
    pub fn request(service_method: impl Into<String>, seq: u64) -> Self {
        Self {
            service_method: service_method.into(),
            seq,
            error: String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// The first-message handshake, always carried by the meta-codec (JSON),
/// never by the negotiated body codec.
///
/// Timeouts are serialized as milliseconds since `serde` has no native
/// `Duration` support; `0` means "no timeout" for both fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOption {
    pub type_number: u32,
    pub codec_type: String,
    #[serde(default)]
    pub connection_timeout_ms: u64,
    #[serde(default)]
    pub handle_timeout_ms: u64,
}

impl ConnectOption {
    pub fn new(codec_type: impl Into<String>) -> Self {
        Self {
            type_number: TYPE_NUMBER,
            codec_type: codec_type.into(),
            connection_timeout_ms: 0,
            handle_timeout_ms: 0,
        }
    }

    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_handle_timeout(mut self, timeout: Duration) -> Self {
        self.handle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn handle_timeout(&self) -> Duration {
        Duration::from_millis(self.handle_timeout_ms)
    }
}

impl Default for ConnectOption {
    fn default() -> Self {
        Self::new(GOB_CODEC)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed address {0:?}, expected \"<protocol> <target>\"")]
    MalformedAddress(String),
    #[error("malformed service method {0:?}, expected \"Service.Method\"")]
    MalformedServiceMethod(String),
}

/// Split `"tcp 127.0.0.1:4321"` into `("tcp", "127.0.0.1:4321")`.
pub fn split_address(rpc_addr: &str) -> Result<(&str, &str), ProtocolError> {
    rpc_addr
        .split_once(' ')
        .ok_or_else(|| ProtocolError::MalformedAddress(rpc_addr.to_owned()))
}

/// Split `"Foo.Sum"` into `("Foo", "Sum")` on the *last* dot, so a service
/// name containing dots (none of ours do, but nothing stops a caller) still
/// resolves the method name correctly.
pub fn split_service_method(service_method: &str) -> Result<(&str, &str), ProtocolError> {
    let dot = service_method
        .rfind('.')
        .ok_or_else(|| ProtocolError::MalformedServiceMethod(service_method.to_owned()))?;
    Ok((&service_method[..dot], &service_method[dot + 1..]))
}
