//! Scenario catalog loading.
//!
//! Loads scenario definitions (`*.json`, bare scenario or snapshot envelope)
//! from a directory. Each entry keeps its source text so every run starts
//! from a fresh copy of the definition.

use std::fs;
use std::path::{Path, PathBuf};

use sortie_core::error::EngineError;
use sortie_core::scenario::Scenario;
use thiserror::Error;
use tracing::{debug, warn};

/// Extension of scenario definition files.
pub const SCENARIO_EXTENSION: &str = "json";

/// Error type for catalog loading.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Directory not found.
    #[error("Scenario directory not found: {0}")]
    DirectoryNotFound(String),
    /// Failed to read a file or directory.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A definition does not parse as a scenario.
    #[error("Invalid scenario {path}: {source}")]
    Invalid {
        /// Offending path.
        path: String,
        /// Underlying error.
        #[source]
        source: EngineError,
    },
}

/// One scenario definition.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// File stem, used to label runs.
    pub name: String,
    /// Source file.
    pub path: PathBuf,
    source: String,
}

impl CatalogEntry {
    /// Read and check a definition file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let source = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        let entry = Self::from_source(name, path, source);
        entry.instantiate().map_err(|source| CatalogError::Invalid {
            path: path.display().to_string(),
            source,
        })?;
        Ok(entry)
    }

    /// Entry from in-memory source text.
    pub fn from_source(name: impl Into<String>, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            source: source.into(),
        }
    }

    /// Definition text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fresh scenario from the definition.
    ///
    /// Patrols without a creation time are stamped with the scenario's
    /// current time.
    pub fn instantiate(&self) -> Result<Scenario, EngineError> {
        let mut scenario = Scenario::from_json(&self.source)?;
        let now = scenario.current_time;
        for mission in &mut scenario.missions {
            if let Some(patrol) = mission.as_patrol_mut() {
                patrol.creation_time.get_or_insert(now);
            }
        }
        Ok(scenario)
    }
}

/// Problem found while validating a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIssue {
    /// Entry name.
    pub scenario: String,
    /// What is wrong.
    pub message: String,
}

/// Ordered collection of scenario definitions.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    entries: Vec<CatalogEntry>,
}

impl ScenarioCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog from prepared entries.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Load every `*.json` file in `dir`, sorted by file name.
    ///
    /// Files that fail to load are skipped with a warning.
    pub fn load_from_directory(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.exists() {
            return Err(CatalogError::DirectoryNotFound(dir.display().to_string()));
        }
        let io_error = |source| CatalogError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().is_some_and(|e| e == SCENARIO_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            match CatalogEntry::load(&path) {
                Ok(entry) => {
                    debug!(scenario = %entry.name, "Loaded scenario definition");
                    entries.push(entry);
                }
                Err(e) => warn!("Failed to load scenario from {:?}: {}", path, e),
            }
        }
        Ok(Self { entries })
    }

    /// Add an entry at the end.
    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in run order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Entries as a slice, for chunking.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entry by name.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entry names in run order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Check every entry for problems that would spoil a batch run.
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        for entry in &self.entries {
            let mut report = |message: String| {
                issues.push(CatalogIssue {
                    scenario: entry.name.clone(),
                    message,
                });
            };
            let scenario = match entry.instantiate() {
                Ok(scenario) => scenario,
                Err(e) => {
                    report(e.to_string());
                    continue;
                }
            };

            if scenario.sides.len() != 2 {
                report(format!(
                    "expected two sides for feature extraction, found {}",
                    scenario.sides.len()
                ));
            }
            for mission in &scenario.missions {
                if mission.check_time_limit(scenario.current_time, scenario.end_time) {
                    report(format!(
                        "mission '{}' cannot complete: time limit {} exceeds the time left",
                        mission.id(),
                        mission.time_limit()
                    ));
                }
                if scenario.get_side(mission.side_id()).is_none() {
                    report(format!(
                        "mission '{}' belongs to unknown side '{}'",
                        mission.id(),
                        mission.side_id()
                    ));
                }
                for unit_id in mission.assigned_unit_ids() {
                    if !scenario.unit_exists(unit_id) {
                        report(format!(
                            "mission '{}' assigns missing unit '{}'",
                            mission.id(),
                            unit_id
                        ));
                    }
                }
            }
            for side in scenario.sides.iter() {
                let listed = scenario
                    .missions
                    .iter()
                    .filter(|m| m.side_id() == side.id)
                    .count();
                if (side.missions_assigned as usize) < listed {
                    report(format!(
                        "side '{}' lists {} missions but missionsAssigned is {}",
                        side.id, listed, side.missions_assigned
                    ));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortie_core::prelude::*;
    use sortie_test_utils::fixtures::{engagement_scenario, patrol_mission, SIDE_A};

    fn entry_for(scenario: &Scenario) -> CatalogEntry {
        CatalogEntry::from_source(
            scenario.name.clone(),
            format!("{}.json", scenario.name),
            scenario.to_snapshot_line().unwrap(),
        )
    }

    #[test]
    fn test_load_from_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_second", "a_first"] {
            let line = engagement_scenario(name).to_snapshot_line().unwrap();
            fs::write(dir.path().join(format!("{name}.json")), line).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

        let catalog = ScenarioCatalog::load_from_directory(dir.path()).unwrap();
        assert_eq!(catalog.names(), vec!["a_first", "b_second"]);
        assert!(catalog.get("broken").is_none());
    }

    #[test]
    fn test_missing_directory() {
        let err = ScenarioCatalog::load_from_directory(Path::new("/no/such/scenarios")).unwrap_err();
        assert!(matches!(err, CatalogError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_instantiate_is_fresh_each_time() {
        let entry = entry_for(&engagement_scenario("Fresh"));
        let mut first = entry.instantiate().unwrap();
        first.remove_unit("a-f1");
        let second = entry.instantiate().unwrap();
        assert!(second.unit_exists("a-f1"));
    }

    #[test]
    fn test_instantiate_stamps_patrol_creation_time() {
        let json = r#"{
            "id": "s", "name": "Stamp", "startTime": 500, "duration": 3600,
            "sides": [{"id": "a", "name": "A", "missionsAssigned": 1}, {"id": "b", "name": "B"}],
            "missions": [{
                "kind": "patrol", "id": "p", "name": "Patrol North", "sideId": "a",
                "assignedArea": [
                    {"latitude": 0.0, "longitude": 0.0},
                    {"latitude": 0.0, "longitude": 1.0},
                    {"latitude": 1.0, "longitude": 1.0}
                ],
                "timeLimit": 600
            }]
        }"#;
        let scenario = CatalogEntry::from_source("stamp", "stamp.json", json)
            .instantiate()
            .unwrap();
        let patrol = scenario.get_mission("p").unwrap().as_patrol().unwrap();
        assert_eq!(patrol.creation_time, Some(500));
        assert_eq!(patrol.mission_end_time(), Some(1100));
    }

    #[test]
    fn test_validate_clean_catalog() {
        let catalog = ScenarioCatalog::from_entries(vec![entry_for(&engagement_scenario("Clean"))]);
        assert!(catalog.validate().is_empty());
    }

    #[test]
    fn test_validate_flags_problems() {
        let mut scenario = engagement_scenario("Flawed");
        scenario.current_time = scenario.end_time - 10;
        scenario.missions.push(patrol_mission("late", SIDE_A, &["ghost"], 600));

        let catalog = ScenarioCatalog::from_entries(vec![entry_for(&scenario)]);
        let messages: Vec<String> = catalog.validate().into_iter().map(|i| i.message).collect();
        assert!(messages.iter().any(|m| m.contains("'late' cannot complete")));
        assert!(messages.iter().any(|m| m.contains("missing unit 'ghost'")));
        assert!(messages.iter().any(|m| m.contains("lists 2 missions")));
    }
}
