//! Shell store adapter
//!
//! Unit sections are handed to a shell as `<shell> -c <script>`. Commands
//! cannot be undone, so the session is not transactional: every record and
//! remove is written to the JSON ledger file straight away, and commit and
//! rollback only end the session.
//!
//! Settings (under a `shell` section, or at the top level):
//!
//! ```yaml
//! shell:
//!   ledger: .waymark-ledger.json
//!   shell: sh
//!   workdir: ./deploy
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use waymark_interfaces::{
    Adapter, AdapterError, AdapterFactory, AdapterResult, Settings, StoreHandle,
};

use crate::store_section;

pub const STORE_TYPE: &str = "shell";
pub const DEFAULT_LEDGER: &str = "waymark-ledger.json";
pub const DEFAULT_SHELL: &str = "sh";

/// Settings for the shell adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub ledger: PathBuf,
    pub shell: String,
    pub workdir: Option<PathBuf>,
}

impl ShellSettings {
    pub fn from_settings(settings: &Settings) -> AdapterResult<Self> {
        let section = store_section(settings, STORE_TYPE);

        let shell = section.get_str("shell").unwrap_or(DEFAULT_SHELL).trim();
        if shell.is_empty() {
            return Err(AdapterError::InvalidSettings(
                "shell cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            ledger: PathBuf::from(section.get_str("ledger").unwrap_or(DEFAULT_LEDGER)),
            shell: shell.to_string(),
            workdir: section.get_str("workdir").map(PathBuf::from),
        })
    }
}

/// One ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub applied: bool,
    pub updated_at: DateTime<Utc>,
}

/// Applied state of every unit this ledger has seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub units: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Read a ledger file; a missing file is an empty ledger
    pub fn load(path: &Path) -> AdapterResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(Self::default()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                AdapterError::Connection(format!("corrupt ledger {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the ledger file in one step
    pub fn save(&self, path: &Path) -> AdapterResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AdapterError::Other(e.to_string()))?;
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.persist(path).map_err(|e| AdapterError::Io(e.error))?;
        Ok(())
    }

    pub fn is_applied(&self, name: &str) -> bool {
        self.units.get(name).is_some_and(|entry| entry.applied)
    }

    fn set(&mut self, name: &str, applied: bool) {
        self.units.insert(
            name.to_string(),
            LedgerEntry {
                applied,
                updated_at: Utc::now(),
            },
        );
    }
}

/// Handle running scripts through the configured shell
#[derive(Debug)]
pub struct ShellHandle {
    shell: String,
    workdir: Option<PathBuf>,
    finalized: bool,
}

#[async_trait]
impl StoreHandle for ShellHandle {
    async fn execute(&mut self, script: &str) -> AdapterResult<()> {
        if self.finalized {
            return Err(AdapterError::SessionFinalized);
        }

        let mut command = Command::new(&self.shell);
        command.arg("-c").arg(script).kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        let output = command.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(shell = %self.shell, "{}", stdout.trim_end());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdapterError::Execution(format!(
                "{} exited with {}: {}",
                self.shell,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Session over a ledger file
#[derive(Debug)]
pub struct ShellAdapter {
    ledger_path: PathBuf,
    ledger: Ledger,
    handle: ShellHandle,
}

impl ShellAdapter {
    pub fn open(settings: &ShellSettings) -> AdapterResult<Self> {
        let ledger = Ledger::load(&settings.ledger)?;
        tracing::debug!(
            ledger = %settings.ledger.display(),
            units = ledger.units.len(),
            "Ledger loaded"
        );

        Ok(Self {
            ledger_path: settings.ledger.clone(),
            ledger,
            handle: ShellHandle {
                shell: settings.shell.clone(),
                workdir: settings.workdir.clone(),
                finalized: false,
            },
        })
    }

    fn ensure_open(&self) -> AdapterResult<()> {
        if self.handle.finalized {
            Err(AdapterError::SessionFinalized)
        } else {
            Ok(())
        }
    }

    /// Set and persist one unit's state
    fn write_state(&mut self, name: &str, applied: bool) -> AdapterResult<()> {
        self.ensure_open()?;
        let mut updated = self.ledger.clone();
        updated.set(name, applied);
        updated.save(&self.ledger_path)?;
        self.ledger = updated;
        Ok(())
    }
}

#[async_trait]
impl Adapter for ShellAdapter {
    fn store_type(&self) -> &str {
        STORE_TYPE
    }

    fn handle(&mut self) -> &mut dyn StoreHandle {
        &mut self.handle
    }

    async fn applied_state(&mut self, name: &str) -> AdapterResult<bool> {
        Ok(self.ledger.is_applied(name))
    }

    async fn record(&mut self, name: &str) -> AdapterResult<()> {
        self.write_state(name, true)
    }

    async fn remove(&mut self, name: &str) -> AdapterResult<()> {
        self.write_state(name, false)
    }

    async fn commit(&mut self) -> AdapterResult<()> {
        self.ensure_open()?;
        self.handle.finalized = true;
        Ok(())
    }

    async fn rollback(&mut self) -> AdapterResult<()> {
        self.ensure_open()?;
        tracing::debug!(
            ledger = %self.ledger_path.display(),
            "Shell session rolled back; completed commands stay recorded"
        );
        self.handle.finalized = true;
        Ok(())
    }

    async fn close(self: Box<Self>) -> AdapterResult<()> {
        Ok(())
    }
}

/// Creates [`ShellAdapter`] sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellFactory;

#[async_trait]
impl AdapterFactory for ShellFactory {
    fn store_type(&self) -> &str {
        STORE_TYPE
    }

    fn description(&self) -> &str {
        "Shell commands with a JSON ledger; rollback does not undo commands"
    }

    async fn connect(&self, settings: &Settings) -> AdapterResult<Box<dyn Adapter>> {
        let settings = ShellSettings::from_settings(settings)?;
        Ok(Box::new(ShellAdapter::open(&settings)?))
    }
}
