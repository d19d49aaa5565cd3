//! Single unit execution

use std::fmt;
use std::path::Path;
use waymark_interfaces::{Adapter, Settings, UnitError};

use crate::discovery::unit_name;
use crate::error::{MigrateError, MigrateResult};
use crate::guard::ensure_transition;
use crate::unit::UnitLoader;

/// Direction a unit is executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Apply,
    Revert,
}

impl Direction {
    /// Recorded state the unit is moved to
    pub fn target_state(self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Revert => write!(f, "revert"),
        }
    }
}

/// Run one unit in `direction` against `adapter`.
///
/// The guard runs first, then the unit is loaded, then its operation runs and
/// only after it succeeds is the new state recorded.
pub async fn execute(
    unit_path: &Path,
    direction: Direction,
    adapter: &mut dyn Adapter,
    loader: &dyn UnitLoader,
    settings: &Settings,
    force: bool,
) -> MigrateResult<()> {
    let name = unit_name(unit_path);

    ensure_transition(adapter, direction.target_state(), &name, force).await?;

    let unit = loader.load(unit_path)?;

    tracing::debug!(unit = %name, direction = %direction, "Running migration");

    let outcome = match direction {
        Direction::Apply => unit.forward(adapter.handle(), settings).await,
        Direction::Revert => unit.reverse(adapter.handle(), settings).await,
    };
    outcome.map_err(|source| MigrateError::ExecutionFailure {
        name: name.clone(),
        direction,
        source,
    })?;

    let recorded = match direction {
        Direction::Apply => adapter.record(&name).await,
        Direction::Revert => adapter.remove(&name).await,
    };
    recorded.map_err(|source| MigrateError::ExecutionFailure {
        name: name.clone(),
        direction,
        source: UnitError::Store(source),
    })?;

    match direction {
        Direction::Apply => {
            tracing::info!(store_type = %adapter.store_type(), unit = %name, "Applied migration")
        }
        Direction::Revert => {
            tracing::info!(store_type = %adapter.store_type(), unit = %name, "Reverted migration")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InvocationLog, MemoryAdapter, MemoryCall, MemoryStore, RecordingUnit};
    use crate::unit::StaticUnitLoader;

    const UNIT: &str = "migrations/memory/2024-01-01T00-00-00000-a.sql";
    const NAME: &str = "2024-01-01T00-00-00000-a";

    fn fixture(unit: RecordingUnit) -> StaticUnitLoader {
        StaticUnitLoader::new().with_unit(NAME, unit)
    }

    async fn run(
        direction: Direction,
        adapter: &mut MemoryAdapter,
        loader: &StaticUnitLoader,
    ) -> MigrateResult<()> {
        execute(Path::new(UNIT), direction, adapter, loader, &Settings::empty(), false).await
    }

    #[tokio::test]
    async fn test_apply_then_revert_round_trip() {
        let store = MemoryStore::new();
        let log = InvocationLog::new();
        let loader = fixture(RecordingUnit::new(NAME, log.clone()));
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        run(Direction::Apply, &mut adapter, &loader).await.unwrap();
        assert_eq!(store.recorded(NAME), Some(true));

        run(Direction::Revert, &mut adapter, &loader).await.unwrap();
        assert_eq!(store.recorded(NAME), Some(false));
        assert_eq!(log.invoked(Direction::Apply), vec![NAME]);
        assert_eq!(log.invoked(Direction::Revert), vec![NAME]);
    }

    #[tokio::test]
    async fn test_failed_operation_leaves_state() {
        let store = MemoryStore::new();
        let log = InvocationLog::new();
        let loader = fixture(RecordingUnit::new(NAME, log.clone()).failing_forward());
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        let err = run(Direction::Apply, &mut adapter, &loader).await.unwrap_err();

        assert!(matches!(
            err,
            MigrateError::ExecutionFailure {
                direction: Direction::Apply,
                ..
            }
        ));
        assert_eq!(store.recorded(NAME), None);
        assert_eq!(store.count(&MemoryCall::Record(NAME.to_string())), 0);
    }

    #[tokio::test]
    async fn test_record_failure_is_execution_failure() {
        let store = MemoryStore::new();
        store.fail_record_of(NAME);
        let loader = fixture(RecordingUnit::new(NAME, InvocationLog::new()));
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        let err = run(Direction::Apply, &mut adapter, &loader).await.unwrap_err();

        assert!(matches!(err, MigrateError::ExecutionFailure { ref name, .. } if name == NAME));
        assert!(err.to_string().contains("ledger is read-only"));
    }

    #[tokio::test]
    async fn test_guard_runs_before_load() {
        let store = MemoryStore::new();
        store.set_applied(NAME, true);
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        // Nothing registered: a load attempt would fail with UnitLoad
        let err = run(Direction::Apply, &mut adapter, &StaticUnitLoader::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn test_unit_load_before_store_touched() {
        let store = MemoryStore::new();
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        let err = run(Direction::Apply, &mut adapter, &StaticUnitLoader::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::UnitLoad { .. }));
        assert!(store.executed_scripts().is_empty());
        assert_eq!(store.recorded(NAME), None);
    }
}
