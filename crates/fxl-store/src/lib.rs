//! JSON file scenario store.
//!
//! One `<id>.json` document per scenario under a configurable directory. The
//! core only ever asks this store for `Scenario` values; nothing else in the
//! workspace knows the storage format.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use fxl_model::Scenario;

pub struct ScenarioStore {
    dir: PathBuf,
}

impl ScenarioStore {
    /// Opens (and creates if needed) the scenario directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("create_dir_all {dir:?}"))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn save(&self, scenario: &Scenario) -> Result<()> {
        let path = self.path_for(&scenario.id);
        let json = serde_json::to_string_pretty(scenario)
            .with_context(|| format!("serialize scenario {}", scenario.id))?;
        fs::write(&path, json).with_context(|| format!("write scenario {path:?}"))?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<Option<Scenario>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("read scenario {path:?}"))?;
        let scenario =
            serde_json::from_str(&raw).with_context(|| format!("parse scenario {path:?}"))?;
        Ok(Some(scenario))
    }

    /// All parseable scenarios, sorted by id. Unreadable or invalid files are
    /// skipped with a warning, as a scenario directory accumulates drafts.
    pub fn list(&self) -> Result<Vec<Scenario>> {
        let mut scenarios = Vec::new();

        let entries =
            fs::read_dir(&self.dir).with_context(|| format!("read_dir {:?}", self.dir))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read_dir entry in {:?}", self.dir))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|raw| serde_json::from_str::<Scenario>(&raw).map_err(Into::into))
            {
                Ok(scenario) => scenarios.push(scenario),
                Err(e) => warn!(?path, error = %e, "skipping invalid scenario file"),
            }
        }

        scenarios.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(scenarios)
    }

    /// Returns `true` when a document was actually removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("remove scenario {path:?}"))?;
        Ok(true)
    }
}
