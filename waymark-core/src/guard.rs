//! Apply-state guard

use waymark_interfaces::Adapter;

use crate::error::{ConflictReason, MigrateError, MigrateResult};

/// Check that moving `name` to the wanted state is consistent with what the
/// store has recorded. With `force` the store is not consulted at all.
pub async fn ensure_transition(
    adapter: &mut dyn Adapter,
    want_applied: bool,
    name: &str,
    force: bool,
) -> MigrateResult<()> {
    if force {
        tracing::warn!(unit = %name, "State check bypassed by force");
        return Ok(());
    }

    let applied = adapter
        .applied_state(name)
        .await
        .map_err(|source| MigrateError::StateQuery {
            name: name.to_string(),
            source,
        })?;

    tracing::debug!(unit = %name, applied, want_applied, "Checked recorded state");

    match (want_applied, applied) {
        (true, true) => Err(MigrateError::StateConflict {
            name: name.to_string(),
            reason: ConflictReason::AlreadyApplied,
        }),
        (false, false) => Err(MigrateError::StateConflict {
            name: name.to_string(),
            reason: ConflictReason::NotApplied,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryAdapter, MemoryCall, MemoryStore};

    #[tokio::test]
    async fn test_apply_requires_not_applied() {
        let store = MemoryStore::new();
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        assert!(ensure_transition(&mut adapter, true, "a", false).await.is_ok());

        store.set_applied("a", true);
        let err = ensure_transition(&mut adapter, true, "a", false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::StateConflict { reason: ConflictReason::AlreadyApplied, .. }
        ));
    }

    #[tokio::test]
    async fn test_revert_requires_applied() {
        let store = MemoryStore::new();
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        let err = ensure_transition(&mut adapter, false, "a", false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::StateConflict { reason: ConflictReason::NotApplied, .. }
        ));

        store.set_applied("a", true);
        assert!(ensure_transition(&mut adapter, false, "a", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_force_skips_state_query() {
        let store = MemoryStore::new();
        store.set_applied("a", true);
        let mut adapter = MemoryAdapter::new("memory", store.clone());

        assert!(ensure_transition(&mut adapter, true, "a", true).await.is_ok());
        assert!(!store
            .calls()
            .iter()
            .any(|call| matches!(call, MemoryCall::AppliedState(_))));
    }
}
