//! Testing utilities for waymark-core
//!
//! An in-memory adapter whose shared [`MemoryStore`] records every call made
//! against it, plus migration units that log their invocations. Available to
//! other crates through the `testing` feature.

use async_trait::async_trait;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use waymark_interfaces::{
    Adapter, AdapterError, AdapterFactory, AdapterResult, Settings, StoreHandle, UnitError,
    UnitOperations, UnitResult,
};

use crate::executor::Direction;

/// Adapter call observed by a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCall {
    Connect,
    AppliedState(String),
    Record(String),
    Remove(String),
    Execute(String),
    Commit,
    Rollback,
    Close,
}

#[derive(Debug, Default)]
struct MemoryState {
    applied: BTreeMap<String, bool>,
    calls: Vec<MemoryCall>,
    fail_script_marker: Option<String>,
    fail_record: Option<String>,
    fail_commit: bool,
}

/// Shared state behind every [`MemoryAdapter`] created from it.
///
/// State changes take effect immediately; commit and rollback are only
/// counted, like a store without transactions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn push(&self, call: MemoryCall) {
        self.state().calls.push(call);
    }

    pub fn set_applied(&self, name: &str, applied: bool) {
        self.state().applied.insert(name.to_string(), applied);
    }

    pub fn is_applied(&self, name: &str) -> bool {
        self.state().applied.get(name).copied().unwrap_or(false)
    }

    /// Recorded state, `None` if the unit was never touched
    pub fn recorded(&self, name: &str) -> Option<bool> {
        self.state().applied.get(name).copied()
    }

    pub fn calls(&self) -> Vec<MemoryCall> {
        self.state().calls.clone()
    }

    /// Calls other than state queries and script execution
    pub fn session_calls(&self) -> Vec<MemoryCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    MemoryCall::Connect
                        | MemoryCall::Commit
                        | MemoryCall::Rollback
                        | MemoryCall::Close
                )
            })
            .collect()
    }

    pub fn count(&self, call: &MemoryCall) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    pub fn executed_scripts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MemoryCall::Execute(script) => Some(script),
                _ => None,
            })
            .collect()
    }

    /// Make `execute` fail for scripts containing `marker`
    pub fn fail_scripts_containing(&self, marker: &str) {
        self.state().fail_script_marker = Some(marker.to_string());
    }

    /// Make `record` fail for `name`
    pub fn fail_record_of(&self, name: &str) {
        self.state().fail_record = Some(name.to_string());
    }

    pub fn fail_commit(&self) {
        self.state().fail_commit = true;
    }
}

/// Handle passed to units run against a [`MemoryAdapter`]
#[derive(Debug)]
pub struct MemoryHandle {
    store: MemoryStore,
}

impl MemoryHandle {
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl StoreHandle for MemoryHandle {
    async fn execute(&mut self, script: &str) -> AdapterResult<()> {
        self.store.push(MemoryCall::Execute(script.to_string()));
        let marker = self.store.state().fail_script_marker.clone();
        match marker {
            Some(marker) if script.contains(&marker) => Err(AdapterError::Execution(format!(
                "script rejected: contains '{}'",
                marker
            ))),
            _ => Ok(()),
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Adapter backed by a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryAdapter {
    store_type: String,
    handle: MemoryHandle,
}

impl MemoryAdapter {
    pub fn new(store_type: impl Into<String>, store: MemoryStore) -> Self {
        Self {
            store_type: store_type.into(),
            handle: MemoryHandle { store },
        }
    }

    fn store(&self) -> &MemoryStore {
        &self.handle.store
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn store_type(&self) -> &str {
        &self.store_type
    }

    fn handle(&mut self) -> &mut dyn StoreHandle {
        &mut self.handle
    }

    async fn applied_state(&mut self, name: &str) -> AdapterResult<bool> {
        self.store().push(MemoryCall::AppliedState(name.to_string()));
        Ok(self.store().is_applied(name))
    }

    async fn record(&mut self, name: &str) -> AdapterResult<()> {
        self.store().push(MemoryCall::Record(name.to_string()));
        if self.store().state().fail_record.as_deref() == Some(name) {
            return Err(AdapterError::State {
                name: name.to_string(),
                reason: "ledger is read-only".to_string(),
            });
        }
        self.store().set_applied(name, true);
        Ok(())
    }

    async fn remove(&mut self, name: &str) -> AdapterResult<()> {
        self.store().push(MemoryCall::Remove(name.to_string()));
        self.store().set_applied(name, false);
        Ok(())
    }

    async fn commit(&mut self) -> AdapterResult<()> {
        self.store().push(MemoryCall::Commit);
        if self.store().state().fail_commit {
            return Err(AdapterError::Transaction("commit refused".to_string()));
        }
        Ok(())
    }

    async fn rollback(&mut self) -> AdapterResult<()> {
        self.store().push(MemoryCall::Rollback);
        Ok(())
    }

    async fn close(self: Box<Self>) -> AdapterResult<()> {
        self.store().push(MemoryCall::Close);
        Ok(())
    }
}

/// Factory producing [`MemoryAdapter`]s over one shared store
#[derive(Debug, Clone)]
pub struct MemoryFactory {
    store_type: String,
    store: MemoryStore,
}

impl MemoryFactory {
    pub fn new(store_type: impl Into<String>, store: MemoryStore) -> Self {
        Self {
            store_type: store_type.into(),
            store,
        }
    }
}

#[async_trait]
impl AdapterFactory for MemoryFactory {
    fn store_type(&self) -> &str {
        &self.store_type
    }

    fn description(&self) -> &str {
        "In-memory store for tests"
    }

    async fn connect(&self, _settings: &Settings) -> AdapterResult<Box<dyn Adapter>> {
        self.store.push(MemoryCall::Connect);
        Ok(Box::new(MemoryAdapter::new(
            self.store_type.clone(),
            self.store.clone(),
        )))
    }
}

/// Shared log of unit invocations, in call order
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<(String, Direction)>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, name: &str, direction: Direction) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((name.to_string(), direction));
        }
    }

    pub fn entries(&self) -> Vec<(String, Direction)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Names invoked in `direction`, in order
    pub fn invoked(&self, direction: Direction) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(_, d)| *d == direction)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Unit that logs each invocation and can be told to fail
#[derive(Debug, Clone)]
pub struct RecordingUnit {
    name: String,
    log: InvocationLog,
    fail_forward: bool,
    fail_reverse: bool,
}

impl RecordingUnit {
    pub fn new(name: impl Into<String>, log: InvocationLog) -> Self {
        Self {
            name: name.into(),
            log,
            fail_forward: false,
            fail_reverse: false,
        }
    }

    pub fn failing_forward(mut self) -> Self {
        self.fail_forward = true;
        self
    }

    pub fn failing_reverse(mut self) -> Self {
        self.fail_reverse = true;
        self
    }
}

#[async_trait]
impl UnitOperations for RecordingUnit {
    async fn forward(&self, _handle: &mut dyn StoreHandle, _settings: &Settings) -> UnitResult {
        self.log.push(&self.name, Direction::Apply);
        if self.fail_forward {
            return Err(UnitError::failed(format!("{} forward exploded", self.name)));
        }
        Ok(())
    }

    async fn reverse(&self, _handle: &mut dyn StoreHandle, _settings: &Settings) -> UnitResult {
        self.log.push(&self.name, Direction::Revert);
        if self.fail_reverse {
            return Err(UnitError::failed(format!("{} reverse exploded", self.name)));
        }
        Ok(())
    }
}
