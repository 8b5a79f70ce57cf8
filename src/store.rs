//! Scenario persistence.
//!
//! All saved scenarios live in one JSON object under a single key of a
//! [`KeyValueStore`]:
//!
//! ```text
//! <dir>/monte-carlo-scenarios.json
//! {
//!   "Pricing": {"name": "Pricing", "variables": [...], "formulas": [...], "numSimulations": 10000},
//!   ...
//! }
//! ```
//!
//! Writes go to `<key>.json.tmp` first and are renamed into place.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::SCENARIO_NAMESPACE;
use crate::errors::ValidationError;
use crate::prelude::Result;
use crate::types::Scenario;
use crate::Error;

/// String-keyed storage of text values.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Creates `dir` if it doesn't exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(Error::Io(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "Stored key");
        Ok(())
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: HashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Named scenarios in one namespace. Saving an existing name overwrites it.
#[derive(Debug, Clone)]
pub struct ScenarioStore<S = FileKvStore> {
    backend: S,
}

impl ScenarioStore<FileKvStore> {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(FileKvStore::new(dir)?))
    }
}

impl<S: KeyValueStore> ScenarioStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    fn read_all(&self) -> Result<BTreeMap<String, Scenario>> {
        match self.backend.get(SCENARIO_NAMESPACE)? {
            Some(text) => serde_json::from_str(&text).map_err(Error::from),
            None => Ok(BTreeMap::new()),
        }
    }

    pub fn save(&mut self, name: &str, scenario: &Scenario) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        // serde_json writes NaN and infinity as null, which would make the
        // whole namespace unreadable
        for var in &scenario.variables {
            var.distribution.check_finite()?;
        }

        let mut all = self.read_all()?;
        let replaced = all.insert(name.to_string(), scenario.clone()).is_some();
        let text = serde_json::to_string_pretty(&all)?;
        self.backend.set(SCENARIO_NAMESPACE, &text)?;

        info!(
            scenario = name,
            replaced,
            variables = scenario.variables.len(),
            formulas = scenario.formulas.len(),
            "Scenario saved"
        );
        Ok(())
    }

    pub fn list(&self) -> Result<BTreeSet<String>> {
        Ok(self.read_all()?.into_keys().collect())
    }

    pub fn load(&self, name: &str) -> Result<Scenario> {
        self.read_all()?
            .remove(name.trim())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }
}
