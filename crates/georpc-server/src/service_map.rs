use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use georpc_service::Service;

use crate::error::ServerError;

/// Registry of services a [`crate::Server`] dispatches to, keyed by
/// [`Service::name`]. Registration is store-if-absent: re-registering the
/// same name is a configuration mistake, not something to silently allow or
/// silently overwrite.
#[derive(Default)]
pub struct ServiceMap {
    services: RwLock<HashMap<String, Arc<Service>>>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service: Arc<Service>) -> Result<(), ServerError> {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if services.contains_key(service.name()) {
            return Err(ServerError::AlreadyRegistered(service.name().to_owned()));
        }
        services.insert(service.name().to_owned(), service);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Service>, ServerError> {
        self.services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ServerError::UnknownService(name.to_owned()))
    }

    pub fn services(&self) -> Vec<Arc<Service>> {
        self.services
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
