//! Task-type → action template registry.
//!
//! The table lives behind a read/write lock. Lookups hand out deep copies so a
//! reload never reaches into an action chain that is already running, and a
//! reload either replaces the whole table or leaves it untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use agri_core::types::{Action, WAIT_ACTION};
use serde::Deserialize;

use crate::error::RegistryError;

/// Task type name → ordered action templates.
pub type TemplateTable = HashMap<String, Vec<Action>>;

/// On-disk shape of a scenario file; only the `actions` section matters.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    actions: TemplateTable,
}

pub struct ActionTemplateRegistry {
    table: RwLock<TemplateTable>,
    source: RwLock<Option<PathBuf>>,
}

impl ActionTemplateRegistry {
    pub fn new(table: TemplateTable) -> Self {
        Self {
            table: RwLock::new(table),
            source: RwLock::new(None),
        }
    }

    /// Registry seeded with the built-in table.
    pub fn with_defaults() -> Self {
        Self::new(Self::default_table())
    }

    /// Built-in fallback used when no scenario file can be loaded.
    pub fn default_table() -> TemplateTable {
        let mut table = TemplateTable::new();
        table.insert(
            "irrigation".to_string(),
            vec![
                Action::new("open_valve", "irrigation"),
                Action::new(WAIT_ACTION, "system"),
                Action::new("close_valve", "irrigation"),
            ],
        );
        table
    }

    /// Independent copy of the templates for `task_type`.
    pub fn lookup(&self, task_type: &str) -> Option<Vec<Action>> {
        let table = self.table.read().unwrap_or_else(|p| p.into_inner());
        table.get(task_type).cloned()
    }

    /// Registered task types, sorted.
    pub fn task_types(&self) -> Vec<String> {
        let table = self.table.read().unwrap_or_else(|p| p.into_inner());
        let mut types: Vec<String> = table.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically swap in a new table.
    pub fn replace(&self, table: TemplateTable) {
        let mut guard = self.table.write().unwrap_or_else(|p| p.into_inner());
        *guard = table;
    }

    /// Path the registry was last successfully loaded from.
    pub fn source(&self) -> Option<PathBuf> {
        self.source.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Load a YAML (`.yaml`/`.yml`) or JSON (`.json`) scenario file and
    /// replace the table with its `actions` section.
    ///
    /// On any error the current table stays active. Returns the number of
    /// task types now registered.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let path = path.as_ref();
        let table = parse_file(path)?;
        let count = table.len();

        self.replace(table);
        *self.source.write().unwrap_or_else(|p| p.into_inner()) = Some(path.to_path_buf());

        tracing::info!(path = %path.display(), task_types = count, "Action registry loaded");
        Ok(count)
    }

    /// Re-read the file the registry was last loaded from.
    pub fn reload(&self) -> Result<usize, RegistryError> {
        let path = self.source().ok_or(RegistryError::NoSource)?;
        self.load_from_file(path)
    }
}

impl Default for ActionTemplateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn parse_file(path: &Path) -> Result<TemplateTable, RegistryError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: display.clone(),
        source,
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let file: RegistryFile = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| RegistryError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?,
        "json" => serde_json::from_str(&content).map_err(|e| RegistryError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?,
        _ => return Err(RegistryError::UnsupportedFormat(display)),
    };

    if file.actions.is_empty() {
        return Err(RegistryError::Empty(display));
    }
    for (task_type, actions) in &file.actions {
        if let Some(pos) = actions.iter().position(|a| a.action_type.trim().is_empty()) {
            return Err(RegistryError::Parse {
                path: display,
                message: format!("{task_type}: action {pos} has an empty action_type"),
            });
        }
    }
    Ok(file.actions)
}
