//! Drives registered [`georpc_service::Service`]s from accepted connections,
//! over raw TCP/Unix sockets or a tunneled HTTP CONNECT, through a
//! negotiated [`georpc_codec::Codec`].

mod conn;
mod error;
mod http;
mod server;
mod service_map;

pub use error::ServerError;
pub use http::{accept_http, router};
pub use server::{serve_one, Server};
