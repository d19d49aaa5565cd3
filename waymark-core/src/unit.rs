//! Migration unit loading
//!
//! A loader turns a unit path into the unit's forward/reverse operations.
//! [`ScriptLoader`] reads `.sql` files split into sections:
//!
//! ```sql
//! -- forward
//! CREATE TABLE ${schema}.users (id INTEGER PRIMARY KEY);
//!
//! -- reverse
//! DROP TABLE ${schema}.users;
//! ```
//!
//! [`StaticUnitLoader`] serves units implemented in Rust.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use waymark_interfaces::{Settings, StoreHandle, UnitError, UnitOperations, UnitResult};

use crate::discovery::unit_name;
use crate::error::{MigrateError, MigrateResult};

static SECTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^--\s*(forward|reverse|up|down)\s*$").expect("section marker pattern")
});

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z0-9_.\-]+)\s*\}").expect("placeholder pattern")
});

/// Produces the operations of a migration unit
pub trait UnitLoader: Send + Sync {
    fn load(&self, path: &Path) -> MigrateResult<Arc<dyn UnitOperations>>;
}

/// Forward and reverse script text of a unit file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptUnit {
    pub forward: String,
    pub reverse: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Forward,
    Reverse,
}

/// Split unit file text into its forward and reverse sections.
///
/// Text before the first marker is ignored. The reverse section is optional.
pub fn parse_script(text: &str) -> Result<ScriptUnit, String> {
    let mut unit = ScriptUnit::default();
    let mut current: Option<Section> = None;
    let mut seen_forward = false;
    let mut seen_reverse = false;

    for line in text.lines() {
        if let Some(captures) = SECTION_MARKER.captures(line.trim()) {
            let section = match captures[1].to_ascii_lowercase().as_str() {
                "forward" | "up" => Section::Forward,
                _ => Section::Reverse,
            };

            let seen = match section {
                Section::Forward => &mut seen_forward,
                Section::Reverse => &mut seen_reverse,
            };
            if *seen {
                return Err(format!("duplicate '{}' section", line.trim()));
            }
            *seen = true;
            current = Some(section);
            continue;
        }

        let target = match current {
            Some(Section::Forward) => &mut unit.forward,
            Some(Section::Reverse) => &mut unit.reverse,
            None => continue,
        };
        target.push_str(line);
        target.push('\n');
    }

    if !seen_forward {
        return Err("missing '-- forward' section".to_string());
    }

    Ok(unit)
}

/// Replace `${key}` placeholders with scalar values from `settings`.
///
/// Keys may be dotted paths into nested mappings.
pub fn render(template: &str, settings: &Settings) -> Result<String, UnitError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let key = &captures[1];
        let value = settings
            .lookup_scalar(key)
            .ok_or_else(|| UnitError::MissingSetting(key.to_string()))?;

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&value);
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

#[async_trait]
impl UnitOperations for ScriptUnit {
    async fn forward(&self, handle: &mut dyn StoreHandle, settings: &Settings) -> UnitResult {
        run_section(&self.forward, handle, settings).await
    }

    async fn reverse(&self, handle: &mut dyn StoreHandle, settings: &Settings) -> UnitResult {
        run_section(&self.reverse, handle, settings).await
    }
}

async fn run_section(
    section: &str,
    handle: &mut dyn StoreHandle,
    settings: &Settings,
) -> UnitResult {
    if section.trim().is_empty() {
        return Ok(());
    }

    let script = render(section, settings)?;
    handle.execute(&script).await?;
    Ok(())
}

/// Loads `.sql` unit files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLoader;

impl ScriptLoader {
    pub fn new() -> Self {
        Self
    }
}

impl UnitLoader for ScriptLoader {
    fn load(&self, path: &Path) -> MigrateResult<Arc<dyn UnitOperations>> {
        let name = unit_name(path);
        let text = std::fs::read_to_string(path).map_err(|e| MigrateError::UnitLoad {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        let unit = parse_script(&text).map_err(|reason| MigrateError::UnitLoad { name, reason })?;
        Ok(Arc::new(unit))
    }
}

/// Serves units registered by name, for migrations written in Rust
#[derive(Default, Clone)]
pub struct StaticUnitLoader {
    units: HashMap<String, Arc<dyn UnitOperations>>,
}

impl StaticUnitLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, unit: impl UnitOperations + 'static) {
        self.units.insert(name.into(), Arc::new(unit));
    }

    pub fn with_unit(
        mut self,
        name: impl Into<String>,
        unit: impl UnitOperations + 'static,
    ) -> Self {
        self.insert(name, unit);
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl UnitLoader for StaticUnitLoader {
    fn load(&self, path: &Path) -> MigrateResult<Arc<dyn UnitOperations>> {
        let name = unit_name(path);
        self.units
            .get(&name)
            .cloned()
            .ok_or_else(|| MigrateError::UnitLoad {
                name,
                reason: "no unit registered under this name".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryAdapter, MemoryStore};
    use serde_json::json;
    use waymark_interfaces::Adapter;

    const SCRIPT: &str = "\
Creates the users table.

-- Forward
CREATE TABLE ${schema}.users (id INTEGER PRIMARY KEY);

--reverse
DROP TABLE ${schema}.users;
";

    fn settings() -> Settings {
        Settings::from_value(json!({
            "schema": "app",
            "sqlite": { "port": 5432, "ssl": false, "tags": ["a"] }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_sections() {
        let unit = parse_script(SCRIPT).unwrap();
        assert_eq!(
            unit.forward.trim(),
            "CREATE TABLE ${schema}.users (id INTEGER PRIMARY KEY);"
        );
        assert_eq!(unit.reverse.trim(), "DROP TABLE ${schema}.users;");
    }

    #[test]
    fn test_parse_aliases_and_missing_reverse() {
        let unit = parse_script("-- UP\nINSERT INTO t VALUES (1);\n").unwrap();
        assert_eq!(unit.forward, "INSERT INTO t VALUES (1);\n");
        assert!(unit.reverse.is_empty());

        let unit =
            parse_script("-- down\nDELETE FROM t;\n-- up\nINSERT INTO t VALUES (1);\n").unwrap();
        assert_eq!(unit.reverse, "DELETE FROM t;\n");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_script("CREATE TABLE t (id INTEGER);").is_err());
        assert!(parse_script("-- reverse\nDROP TABLE t;").is_err());
        assert!(parse_script("-- forward\nA;\n-- up\nB;\n").is_err());
    }

    #[test]
    fn test_render_placeholders() {
        let settings = settings();
        assert_eq!(
            render("SELECT ${ schema }, ${sqlite.port}, ${sqlite.ssl};", &settings).unwrap(),
            "SELECT app, 5432, false;"
        );
        assert_eq!(render("no placeholders", &settings).unwrap(), "no placeholders");

        let err = render("${sqlite.tags}", &settings).unwrap_err();
        assert!(matches!(err, UnitError::MissingSetting(ref key) if key == "sqlite.tags"));
        assert!(render("${absent}", &settings).is_err());
    }

    #[tokio::test]
    async fn test_script_unit_executes_rendered_sections() {
        let store = MemoryStore::new();
        let mut adapter = MemoryAdapter::new("memory", store.clone());
        let unit = parse_script(SCRIPT).unwrap();

        unit.forward(adapter.handle(), &settings()).await.unwrap();
        unit.reverse(adapter.handle(), &settings()).await.unwrap();

        let scripts = store.executed_scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].contains("CREATE TABLE app.users"));
        assert!(scripts[1].contains("DROP TABLE app.users"));
    }

    #[tokio::test]
    async fn test_empty_section_is_noop() {
        let store = MemoryStore::new();
        let mut adapter = MemoryAdapter::new("memory", store.clone());
        let unit = parse_script("-- forward\n\n-- reverse\n   \n").unwrap();

        unit.forward(adapter.handle(), &Settings::empty()).await.unwrap();
        unit.reverse(adapter.handle(), &Settings::empty()).await.unwrap();
        assert!(store.executed_scripts().is_empty());
    }

    #[test]
    fn test_script_loader_reports_unit_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-01-01T00-00-00000-broken.sql");
        std::fs::write(&path, "SELECT 1;").unwrap();

        let err = ScriptLoader::new().load(&path).err().unwrap();
        assert!(matches!(
            err,
            MigrateError::UnitLoad { ref name, .. } if name == "2024-01-01T00-00-00000-broken"
        ));

        let err = ScriptLoader::new()
            .load(&dir.path().join("absent.sql"))
            .err()
            .unwrap();
        assert!(matches!(err, MigrateError::UnitLoad { .. }));
    }

    #[test]
    fn test_static_loader_lookup_by_name() {
        let loader =
            StaticUnitLoader::new().with_unit("2024-01-01T00-00-00000-a", ScriptUnit::default());
        assert_eq!(loader.len(), 1);
        assert!(loader.load(Path::new("x/2024-01-01T00-00-00000-a.sql")).is_ok());
        assert!(loader.load(Path::new("x/2024-01-01T00-00-00000-b.sql")).is_err());
    }
}
