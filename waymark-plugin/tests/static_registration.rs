//! Link-time adapter registration

use async_trait::async_trait;
use std::any::Any;
use std::path::Path;
use waymark_interfaces::{Adapter, AdapterFactory, AdapterResult, Settings, StoreHandle};
use waymark_plugin::{register_adapter, AdapterRegistry, PluginError};

struct EchoHandle(Vec<String>);

#[async_trait]
impl StoreHandle for EchoHandle {
    async fn execute(&mut self, script: &str) -> AdapterResult<()> {
        self.0.push(script.to_string());
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct EchoAdapter(EchoHandle);

#[async_trait]
impl Adapter for EchoAdapter {
    fn store_type(&self) -> &str {
        "echo"
    }

    fn handle(&mut self) -> &mut dyn StoreHandle {
        &mut self.0
    }

    async fn applied_state(&mut self, _name: &str) -> AdapterResult<bool> {
        Ok(false)
    }

    async fn record(&mut self, _name: &str) -> AdapterResult<()> {
        Ok(())
    }

    async fn remove(&mut self, _name: &str) -> AdapterResult<()> {
        Ok(())
    }

    async fn commit(&mut self) -> AdapterResult<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> AdapterResult<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> AdapterResult<()> {
        Ok(())
    }
}

struct EchoFactory;

#[async_trait]
impl AdapterFactory for EchoFactory {
    fn store_type(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes scripts"
    }

    async fn connect(&self, _settings: &Settings) -> AdapterResult<Box<dyn Adapter>> {
        Ok(Box::new(EchoAdapter(EchoHandle(Vec::new()))))
    }
}

register_adapter!(EchoFactory);

#[tokio::test]
async fn test_static_adapters_are_collected() {
    let registry = AdapterRegistry::with_static_adapters().unwrap();
    assert!(registry.contains("echo"));

    let mut adapter = registry
        .resolve(Path::new("migrations/echo"), &Settings::empty())
        .await
        .unwrap();
    adapter.handle().execute("hello").await.unwrap();

    let echoed = adapter
        .handle()
        .as_any_mut()
        .downcast_mut::<EchoHandle>()
        .map(|handle| handle.0.clone());
    assert_eq!(echoed, Some(vec!["hello".to_string()]));
}

#[test]
fn test_explicit_registration_conflicts_with_static() {
    let mut registry = AdapterRegistry::with_static_adapters().unwrap();
    let err = registry.register(EchoFactory).unwrap_err();
    assert!(matches!(err, PluginError::AdapterAlreadyRegistered { .. }));
}
