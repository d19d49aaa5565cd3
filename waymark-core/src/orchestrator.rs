//! Session orchestration
//!
//! [`Migrator`] drives discovery, unit execution and adapter finalize for a
//! single unit or for whole migrations directories. Every resolved adapter is
//! finalized exactly once: commit or rollback, then close.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use waymark_interfaces::{Adapter, Settings};
use waymark_plugin::AdapterRegistry;

use crate::discovery::{discover, unit_name};
use crate::error::{FinalizeStage, MigrateError, MigrateResult};
use crate::executor::{execute, Direction};
use crate::unit::{ScriptLoader, UnitLoader};

/// Outcome of one adapter session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub store_type: String,
    pub applied: Vec<String>,
    pub reverted: Vec<String>,
    /// Units passed over because they were already applied
    pub skipped: usize,
    pub elapsed: Duration,
}

impl RunReport {
    fn new(store_type: impl Into<String>) -> Self {
        Self {
            store_type: store_type.into(),
            applied: Vec::new(),
            reverted: Vec::new(),
            skipped: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Whether the session changed nothing
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.reverted.is_empty()
    }
}

/// Recorded state of one discovered unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    pub name: String,
    pub path: PathBuf,
    pub applied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finalize {
    Commit,
    Rollback,
}

/// Migration orchestrator
#[derive(Clone)]
pub struct Migrator {
    registry: Arc<AdapterRegistry>,
    loader: Arc<dyn UnitLoader>,
}

impl Migrator {
    /// Create a migrator that loads `.sql` unit files
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self::with_loader(registry, Arc::new(ScriptLoader::new()))
    }

    pub fn with_loader(registry: Arc<AdapterRegistry>, loader: Arc<dyn UnitLoader>) -> Self {
        Self { registry, loader }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Apply or revert a single unit in its own adapter session.
    ///
    /// When the store was not touched (state conflict, unreadable unit) the
    /// session is committed; when the operation failed it is rolled back.
    pub async fn apply_one(
        &self,
        unit_path: &Path,
        direction: Direction,
        settings: &Settings,
        force: bool,
    ) -> MigrateResult<RunReport> {
        let started = Instant::now();
        let folder = unit_folder(unit_path)?;
        let mut adapter = self.resolve(&folder, settings).await?;
        let mut report = RunReport::new(adapter.store_type());

        let result = execute(
            unit_path,
            direction,
            adapter.as_mut(),
            self.loader.as_ref(),
            settings,
            force,
        )
        .await;

        let mode = match &result {
            Ok(()) => Finalize::Commit,
            Err(err) if err.leaves_store_untouched() => Finalize::Commit,
            Err(_) => Finalize::Rollback,
        };

        let finalized = finalize(adapter, mode).await;
        surface(result, finalized)?;

        let name = unit_name(unit_path);
        match direction {
            Direction::Apply => report.applied.push(name),
            Direction::Revert => report.reverted.push(name),
        }
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Apply every pending unit of each directory, in the order given.
    ///
    /// Each directory gets its own adapter session. The first failure rolls
    /// back that session and stops the run; later directories are left alone.
    pub async fn apply_all(
        &self,
        directories: &[PathBuf],
        settings: &Settings,
        force: bool,
    ) -> MigrateResult<Vec<RunReport>> {
        let mut reports = Vec::with_capacity(directories.len());

        for dir in directories {
            match self.apply_directory(dir, settings, force).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    tracing::error!(
                        dir = %dir.display(),
                        completed = reports.len(),
                        "Migration run halted: {}",
                        err
                    );
                    return Err(err);
                }
            }
        }

        Ok(reports)
    }

    async fn apply_directory(
        &self,
        dir: &Path,
        settings: &Settings,
        force: bool,
    ) -> MigrateResult<RunReport> {
        let started = Instant::now();
        let mut adapter = self.resolve(dir, settings).await?;
        let mut report = RunReport::new(adapter.store_type());

        let result = match discover(dir) {
            Ok(units) => {
                self.apply_units(adapter.as_mut(), &units, settings, force, &mut report)
                    .await
            }
            Err(err) => Err(err),
        };

        let mode = if result.is_ok() {
            Finalize::Commit
        } else {
            Finalize::Rollback
        };

        let finalized = finalize(adapter, mode).await;
        surface(result, finalized)?;

        report.elapsed = started.elapsed();
        tracing::info!(
            store_type = %report.store_type,
            applied = report.applied.len(),
            skipped = report.skipped,
            "Directory complete"
        );
        Ok(report)
    }

    async fn apply_units(
        &self,
        adapter: &mut dyn Adapter,
        units: &[PathBuf],
        settings: &Settings,
        force: bool,
        report: &mut RunReport,
    ) -> MigrateResult<()> {
        for unit_path in units {
            let name = unit_name(unit_path);

            let applied = adapter
                .applied_state(&name)
                .await
                .map_err(|source| MigrateError::StateQuery {
                    name: name.clone(),
                    source,
                })?;
            if applied {
                tracing::debug!(unit = %name, "Already applied, skipping");
                report.skipped += 1;
                continue;
            }

            execute(
                unit_path,
                Direction::Apply,
                adapter,
                self.loader.as_ref(),
                settings,
                force,
            )
            .await?;
            report.applied.push(name);
        }

        Ok(())
    }

    /// List the units of a directory with their recorded state.
    ///
    /// The session is rolled back afterwards; status never changes the store.
    pub async fn status(&self, dir: &Path, settings: &Settings) -> MigrateResult<Vec<UnitStatus>> {
        let mut adapter = self.resolve(dir, settings).await?;

        let result = match discover(dir) {
            Ok(units) => query_states(adapter.as_mut(), units).await,
            Err(err) => Err(err),
        };

        let finalized = finalize(adapter, Finalize::Rollback).await;
        surface(result, finalized)
    }

    async fn resolve(&self, folder: &Path, settings: &Settings) -> MigrateResult<Box<dyn Adapter>> {
        let adapter = self.registry.resolve(folder, settings).await?;
        tracing::debug!(
            store_type = %adapter.store_type(),
            folder = %folder.display(),
            "Adapter session opened"
        );
        Ok(adapter)
    }
}

async fn query_states(
    adapter: &mut dyn Adapter,
    units: Vec<PathBuf>,
) -> MigrateResult<Vec<UnitStatus>> {
    let mut statuses = Vec::with_capacity(units.len());
    for path in units {
        let name = unit_name(&path);
        let applied = adapter
            .applied_state(&name)
            .await
            .map_err(|source| MigrateError::StateQuery {
                name: name.clone(),
                source,
            })?;
        statuses.push(UnitStatus { name, path, applied });
    }
    Ok(statuses)
}

/// Folder naming the store a unit belongs to
fn unit_folder(unit_path: &Path) -> MigrateResult<PathBuf> {
    match unit_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => Ok(std::env::current_dir()?),
    }
}

/// End an adapter session. Close is attempted even if commit or rollback failed.
async fn finalize(mut adapter: Box<dyn Adapter>, mode: Finalize) -> MigrateResult<()> {
    let store_type = adapter.store_type().to_string();

    let ended = match mode {
        Finalize::Commit => adapter
            .commit()
            .await
            .map_err(|source| MigrateError::FinalizeFailure {
                stage: FinalizeStage::Commit,
                source,
            }),
        Finalize::Rollback => adapter
            .rollback()
            .await
            .map_err(|source| MigrateError::FinalizeFailure {
                stage: FinalizeStage::Rollback,
                source,
            }),
    };

    let closed = adapter
        .close()
        .await
        .map_err(|source| MigrateError::FinalizeFailure {
            stage: FinalizeStage::Close,
            source,
        });

    tracing::debug!(store_type = %store_type, mode = ?mode, "Adapter session finalized");

    match (ended, closed) {
        (Err(err), Err(close_err)) => {
            tracing::error!(store_type = %store_type, "{}", close_err);
            Err(err)
        }
        (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Combine the run result with the finalize result; the run error wins
fn surface<T>(result: MigrateResult<T>, finalized: MigrateResult<()>) -> MigrateResult<T> {
    match (result, finalized) {
        (Err(err), Err(finalize_err)) => {
            tracing::error!("{}", finalize_err);
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
        (Ok(_), Err(finalize_err)) => Err(finalize_err),
        (Ok(value), Ok(())) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCall, MemoryFactory, MemoryStore};

    #[tokio::test]
    async fn test_finalize_closes_after_failed_commit() {
        let store = MemoryStore::new();
        store.fail_commit();
        let adapter: Box<dyn Adapter> =
            Box::new(crate::testing::MemoryAdapter::new("memory", store.clone()));

        let err = finalize(adapter, Finalize::Commit).await.unwrap_err();
        assert!(matches!(
            err,
            MigrateError::FinalizeFailure {
                stage: FinalizeStage::Commit,
                ..
            }
        ));
        assert_eq!(store.session_calls(), vec![MemoryCall::Commit, MemoryCall::Close]);
    }

    #[test]
    fn test_surface_keeps_prior_error() {
        let run: MigrateResult<()> = Err(MigrateError::Scaffold("first".to_string()));
        let finalized = Err(MigrateError::Scaffold("second".to_string()));
        let err = surface(run, finalized).unwrap_err();
        assert_eq!(err.to_string(), "Cannot create migration: first");
    }

    #[tokio::test]
    async fn test_empty_directory_commits() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("memory");
        std::fs::create_dir(&folder).unwrap();

        let store = MemoryStore::new();
        let mut registry = AdapterRegistry::new();
        registry.register(MemoryFactory::new("memory", store.clone())).unwrap();
        let migrator = Migrator::new(Arc::new(registry));

        let reports = migrator
            .apply_all(&[folder], &Settings::empty(), false)
            .await
            .unwrap();
        assert!(reports[0].is_empty());
        assert_eq!(
            store.session_calls(),
            vec![MemoryCall::Connect, MemoryCall::Commit, MemoryCall::Close]
        );
    }
}
