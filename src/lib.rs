//! `georpc`: a compact remote-procedure-call framework split across a small
//! workspace of crates. This root crate is a facade — it re-exports the
//! public API of each `georpc-*` crate under one namespace for callers who'd
//! rather depend on one thing, and hosts the end-to-end integration tests
//! under `tests/integration/`.

pub use georpc_client as client;
pub use georpc_codec as codec;
pub use georpc_discovery as discovery;
pub use georpc_protocol as protocol;
pub use georpc_registry as registry;
pub use georpc_server as server;
pub use georpc_service as service;
pub use georpc_xclient as xclient;
