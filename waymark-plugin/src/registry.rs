//! Adapter registry resolving store types to connected adapters

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use waymark_interfaces::{Adapter, AdapterFactory, Settings};

use crate::error::{PluginError, PluginResult};

/// Link-time registration record submitted by [`crate::register_adapter!`]
pub struct AdapterRegistration {
    factory: fn() -> Box<dyn AdapterFactory>,
}

impl AdapterRegistration {
    pub const fn new(factory: fn() -> Box<dyn AdapterFactory>) -> Self {
        Self { factory }
    }

    fn create(&self) -> Box<dyn AdapterFactory> {
        (self.factory)()
    }
}

inventory::collect!(AdapterRegistration);

/// Registered adapter information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub store_type: String,
    pub description: String,
}

/// Adapter registry keyed by store type.
///
/// Built once at startup and then only read; the orchestrator holds it
/// behind an `Arc` for the duration of a run.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, Arc<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every factory submitted with `register_adapter!`
    pub fn with_static_adapters() -> PluginResult<Self> {
        let mut registry = Self::new();
        for registration in inventory::iter::<AdapterRegistration> {
            registry.register_boxed(registration.create())?;
        }
        Ok(registry)
    }

    /// Register a factory
    pub fn register<F>(&mut self, factory: F) -> PluginResult<()>
    where
        F: AdapterFactory + 'static,
    {
        self.register_shared(Arc::new(factory))
    }

    pub fn register_boxed(&mut self, factory: Box<dyn AdapterFactory>) -> PluginResult<()> {
        self.register_shared(Arc::from(factory))
    }

    pub fn register_shared(&mut self, factory: Arc<dyn AdapterFactory>) -> PluginResult<()> {
        let store_type = factory.store_type().to_string();
        if self.factories.contains_key(&store_type) {
            return Err(PluginError::AdapterAlreadyRegistered { store_type });
        }

        tracing::debug!(
            target: "adapter_registry",
            store_type = %store_type,
            "Adapter registered"
        );

        self.factories.insert(store_type, factory);
        Ok(())
    }

    pub fn contains(&self, store_type: &str) -> bool {
        self.factories.contains_key(store_type)
    }

    /// Registered store types in sorted order
    pub fn store_types(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// List registered adapters
    pub fn list(&self) -> Vec<AdapterInfo> {
        self.factories
            .iter()
            .map(|(store_type, factory)| AdapterInfo {
                store_type: store_type.clone(),
                description: factory.description().to_string(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Store type named by the final segment of a migrations folder
    pub fn store_type_for(folder: &Path) -> PluginResult<String> {
        folder
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PluginError::InvalidStoreFolder {
                path: folder.display().to_string(),
            })
    }

    /// Resolve and connect the adapter for a migrations folder
    pub async fn resolve(
        &self,
        folder: &Path,
        settings: &Settings,
    ) -> PluginResult<Box<dyn Adapter>> {
        let store_type = Self::store_type_for(folder)?;

        let factory = self.factories.get(&store_type).ok_or_else(|| {
            PluginError::AdapterNotFound {
                store_type: store_type.clone(),
                known: self.known_types(),
            }
        })?;

        tracing::debug!(
            target: "adapter_registry",
            store_type = %store_type,
            folder = %folder.display(),
            "Connecting adapter"
        );

        factory
            .connect(settings)
            .await
            .map_err(|source| PluginError::ConnectFailed { store_type, source })
    }

    fn known_types(&self) -> String {
        if self.factories.is_empty() {
            "none".to_string()
        } else {
            self.store_types().join(", ")
        }
    }
}
