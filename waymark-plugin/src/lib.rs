//! Adapter plugin system for waymark
//!
//! Store adapters are plugins keyed by store type. The execution core asks
//! the [`AdapterRegistry`] for a connected adapter for a migrations folder;
//! the folder's final path segment names the store type.
//!
//! Factories are registered explicitly with [`AdapterRegistry::register`] or
//! at link time with [`register_adapter!`], which
//! [`AdapterRegistry::with_static_adapters`] collects.

pub mod error;
pub mod registry;

// Re-export main types
pub use error::{PluginError, PluginResult};
pub use registry::{AdapterInfo, AdapterRegistration, AdapterRegistry};
pub use waymark_interfaces::{Adapter, AdapterFactory};

/// Static registration support
pub mod macros {
    pub use inventory;

    /// Register an adapter factory at link time
    ///
    /// # Example
    /// ```rust,ignore
    /// use waymark_plugin::register_adapter;
    ///
    /// struct RedisFactory;
    ///
    /// // impl AdapterFactory for RedisFactory { ... }
    ///
    /// register_adapter!(RedisFactory);
    /// ```
    #[macro_export]
    macro_rules! register_adapter {
        ($factory:expr) => {
            const _: () = {
                fn __waymark_adapter_factory() -> ::std::boxed::Box<dyn $crate::AdapterFactory> {
                    ::std::boxed::Box::new($factory)
                }

                $crate::macros::inventory::submit! {
                    $crate::AdapterRegistration::new(__waymark_adapter_factory)
                }
            };
        };
    }
}
