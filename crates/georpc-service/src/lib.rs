//! Maps typed request handlers onto the byte-in/byte-out shape the server
//! and codec layers deal in. A [`ServiceBuilder`] is the closest thing this
//! workspace has to reflection: it's where the compiler, not a runtime
//! lookup, decides which handlers are eligible to serve a request.

mod error;
mod service;

pub use error::ServiceError;
pub use service::{MethodType, Service, ServiceBuilder};
