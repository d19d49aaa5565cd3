//! SQLite store adapter
//!
//! Every session runs inside one database transaction. Migration scripts and
//! the tracking table share it, so a rolled back session leaves neither
//! schema changes nor state records behind.
//!
//! Settings (under a `sqlite` section, or at the top level):
//!
//! ```yaml
//! sqlite:
//!   url: "sqlite://app.db?mode=rwc"
//!   table: waymark_migrations
//! ```

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqliteConnection, Transaction};
use std::any::Any;
use waymark_interfaces::{
    Adapter, AdapterError, AdapterFactory, AdapterResult, Settings, StoreHandle,
};

use crate::store_section;

pub const STORE_TYPE: &str = "sqlite";
pub const DEFAULT_URL: &str = "sqlite://waymark.db?mode=rwc";
pub const DEFAULT_TABLE: &str = "waymark_migrations";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Connection settings for the SQLite adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSettings {
    pub url: String,
    pub table: String,
}

impl SqliteSettings {
    pub fn from_settings(settings: &Settings) -> AdapterResult<Self> {
        let section = store_section(settings, STORE_TYPE);
        let url = section.get_str("url").unwrap_or(DEFAULT_URL).to_string();
        let table = section.get_str("table").unwrap_or(DEFAULT_TABLE).to_string();

        if !IDENTIFIER.is_match(&table) {
            return Err(AdapterError::InvalidSettings(format!(
                "tracking table name '{}' is not a plain identifier",
                table
            )));
        }

        Ok(Self { url, table })
    }
}

/// Handle giving units access to the session transaction
pub struct SqliteHandle {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteHandle {
    /// Connection of the open session transaction
    pub fn connection(&mut self) -> AdapterResult<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or(AdapterError::SessionFinalized)
    }
}

#[async_trait]
impl StoreHandle for SqliteHandle {
    async fn execute(&mut self, script: &str) -> AdapterResult<()> {
        let conn = self.connection()?;
        conn.execute(sqlx::raw_sql(script))
            .await
            .map_err(|e| AdapterError::Execution(e.to_string()))?;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One transactional session against a SQLite database
pub struct SqliteAdapter {
    pool: SqlitePool,
    handle: SqliteHandle,
    table: String,
}

impl SqliteAdapter {
    pub async fn connect(settings: &SqliteSettings) -> AdapterResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&settings.url)
            .await
            .map_err(|e| AdapterError::Connection(format!("{}: {}", settings.url, e)))?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             name TEXT PRIMARY KEY, \
             applied INTEGER NOT NULL, \
             updated_at TEXT NOT NULL)",
            settings.table
        );
        sqlx::query(&ddl)
            .execute(&pool)
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        let tx = pool
            .begin()
            .await
            .map_err(|e| AdapterError::Transaction(e.to_string()))?;

        tracing::debug!(table = %settings.table, "SQLite session opened");

        Ok(Self {
            pool,
            handle: SqliteHandle { tx: Some(tx) },
            table: settings.table.clone(),
        })
    }

    async fn set_applied(&mut self, name: &str, applied: bool) -> AdapterResult<()> {
        let sql = format!(
            "INSERT INTO {} (name, applied, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO UPDATE \
             SET applied = excluded.applied, updated_at = excluded.updated_at",
            self.table
        );
        let conn = self.handle.connection()?;
        sqlx::query(&sql)
            .bind(name)
            .bind(applied)
            .bind(Utc::now())
            .execute(conn)
            .await
            .map_err(|e| AdapterError::State {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Names currently recorded as applied, in order
    pub async fn applied_units(&mut self) -> AdapterResult<Vec<String>> {
        let sql = format!(
            "SELECT name FROM {} WHERE applied = 1 ORDER BY name",
            self.table
        );
        let conn = self.handle.connection()?;
        sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(conn)
            .await
            .map_err(|e| AdapterError::Other(e.to_string()))
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn store_type(&self) -> &str {
        STORE_TYPE
    }

    fn handle(&mut self) -> &mut dyn StoreHandle {
        &mut self.handle
    }

    async fn applied_state(&mut self, name: &str) -> AdapterResult<bool> {
        let sql = format!("SELECT applied FROM {} WHERE name = ?", self.table);
        let conn = self.handle.connection()?;
        let applied = sqlx::query_scalar::<_, bool>(&sql)
            .bind(name)
            .fetch_optional(conn)
            .await
            .map_err(|e| AdapterError::State {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(applied.unwrap_or(false))
    }

    async fn record(&mut self, name: &str) -> AdapterResult<()> {
        self.set_applied(name, true).await
    }

    async fn remove(&mut self, name: &str) -> AdapterResult<()> {
        self.set_applied(name, false).await
    }

    async fn commit(&mut self) -> AdapterResult<()> {
        let tx = self.handle.tx.take().ok_or(AdapterError::SessionFinalized)?;
        tx.commit()
            .await
            .map_err(|e| AdapterError::Transaction(format!("Failed to commit: {}", e)))?;
        tracing::debug!("SQLite session committed");
        Ok(())
    }

    async fn rollback(&mut self) -> AdapterResult<()> {
        let tx = self.handle.tx.take().ok_or(AdapterError::SessionFinalized)?;
        tx.rollback()
            .await
            .map_err(|e| AdapterError::Transaction(format!("Failed to roll back: {}", e)))?;
        tracing::debug!("SQLite session rolled back");
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> AdapterResult<()> {
        if let Some(tx) = self.handle.tx.take() {
            tracing::warn!("SQLite session closed without commit or rollback, rolling back");
            tx.rollback()
                .await
                .map_err(|e| AdapterError::Transaction(e.to_string()))?;
        }
        self.pool.close().await;
        Ok(())
    }
}

/// Creates [`SqliteAdapter`] sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteFactory;

#[async_trait]
impl AdapterFactory for SqliteFactory {
    fn store_type(&self) -> &str {
        STORE_TYPE
    }

    fn description(&self) -> &str {
        "SQLite database; each session is one transaction"
    }

    async fn connect(&self, settings: &Settings) -> AdapterResult<Box<dyn Adapter>> {
        let settings = SqliteSettings::from_settings(settings)?;
        Ok(Box::new(SqliteAdapter::connect(&settings).await?))
    }
}
