use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ServiceError;

type ErasedHandler = Box<dyn Fn(Vec<u8>) -> BoxFuture<'static, Result<Vec<u8>, ServiceError>> + Send + Sync>;

/// One registered method. Knows nothing about `Req`/`Res` at this point —
/// those were erased into the closure at registration time, which is also
/// where the compiler checked they're `Send + 'static` and serde-capable.
/// A handler that needs reflection-style runtime eligibility checks in Go
/// has nothing to check here: a `MethodType` that exists at all is eligible
/// by construction.
pub struct MethodType {
    name: String,
    call_count: AtomicU64,
    handler: ErasedHandler,
}

impl MethodType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub async fn invoke(&self, args_bytes: Vec<u8>) -> Result<Vec<u8>, ServiceError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        (self.handler)(args_bytes).await
    }
}

/// A named collection of methods, as built by [`ServiceBuilder`].
pub struct Service {
    name: String,
    methods: HashMap<String, Arc<MethodType>>,
}

impl Service {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, method: &str) -> Result<Arc<MethodType>, ServiceError> {
        self.methods
            .get(method)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownMethod {
                service: self.name.clone(),
                method: method.to_owned(),
            })
    }

    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodType>> {
        self.methods.values()
    }
}

/// Registers typed request handlers and compiles them down into a [`Service`]
/// whose methods dispatch on raw bytes, so the server's hot path never needs
/// to know a single concrete `Req`/`Res` type.
pub struct ServiceBuilder {
    name: String,
    methods: HashMap<String, Arc<MethodType>>,
}

impl ServiceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    /// Registers `handler` under `method_name`. `Req` is decoded from, and
    /// `Res` encoded to, the same wire format a [`georpc_codec::Codec`]
    /// frames for the caller.
    #[must_use]
    pub fn method<Req, Res, F, Fut>(mut self, method_name: impl Into<String>, handler: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, ServiceError>> + Send + 'static,
    {
        let method_name = method_name.into();
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Box::new(move |bytes: Vec<u8>| {
            let handler = handler.clone();
            Box::pin(async move {
                let req: Req = georpc_codec::decode(&bytes).map_err(ServiceError::Decode)?;
                let res = handler(req).await?;
                georpc_codec::encode(&res).map_err(ServiceError::Encode)
            })
        });
        self.methods.insert(
            method_name.clone(),
            Arc::new(MethodType {
                name: method_name,
                call_count: AtomicU64::new(0),
                handler: erased,
            }),
        );
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Service> {
        Arc::new(Service {
            name: self.name,
            methods: self.methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_method_decodes_invokes_and_encodes() {
        let service = ServiceBuilder::new("Math")
            .method("Sum", |(a, b): (i32, i32)| async move { Ok(a + b) })
            .build();

        let method = service.method("Sum").unwrap();
        let args = georpc_codec::encode(&(3i32, 4i32)).unwrap();
        let reply_bytes = method.invoke(args).await.unwrap();
        let reply: i32 = georpc_codec::decode(&reply_bytes).unwrap();
        assert_eq!(reply, 7);
        assert_eq!(method.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_method_is_reported_by_name() {
        let service = ServiceBuilder::new("Math").build();
        match service.method("Sum") {
            Err(ServiceError::UnknownMethod { service, method }) => {
                assert_eq!(service, "Math");
                assert_eq!(method, "Sum");
            }
            other => panic!("expected UnknownMethod, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_error_propagates_without_touching_call_count_twice() {
        let service = ServiceBuilder::new("Math")
            .method("Fail", |_: ()| async move {
                Err(ServiceError::Handler("boom".to_owned()))
            })
            .build();
        let method = service.method("Fail").unwrap();
        let args = georpc_codec::encode(&()).unwrap();
        let err = method.invoke(args).await.unwrap_err();
        assert!(matches!(err, ServiceError::Handler(msg) if msg == "boom"));
        assert_eq!(method.call_count(), 1);
    }
}
