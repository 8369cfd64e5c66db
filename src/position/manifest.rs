use crate::position::{validate_path, PositionData};
use anyhow::Result;
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One position-data file of an experimental set
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub set: String,
    pub fps: f64,
    /// Largest lag (seconds) used by MSD fits; `<= 0` disables the limit
    #[serde(default)]
    pub tau_limit: f64,
}

/// Ordered list of position-data files grouped into named sets.
///
/// Relative entry paths are looked up in the working directory first and next to the
/// manifest file second.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    #[serde(skip)]
    base: Option<PathBuf>,
}

/// Set-level properties, taken from the first file of the set
///
#[derive(Debug, Clone, PartialEq)]
pub struct SetInfo {
    pub name: String,
    pub fps: f64,
    pub tau_limit: f64,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self {
            entries,
            base: None,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        validate_path(path, "json")?;
        let mut manifest: Manifest = serde_json::from_str(&fs::read_to_string(path)?)?;
        manifest.base = path.parent().map(Path::to_path_buf);
        debug!("Manifest '{}' lists {} files", path.display(), manifest.entries.len());
        Ok(manifest)
    }

    /// Distinct set names in lexicographic order
    ///
    pub fn sets(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.set.clone())
            .unique()
            .sorted()
            .collect()
    }

    /// Entries of `set` in manifest order
    ///
    pub fn files_in(&self, set: &str) -> Vec<&ManifestEntry> {
        self.entries.iter().filter(|e| e.set == set).collect()
    }

    pub fn set_info(&self, set: &str) -> Option<SetInfo> {
        self.entries.iter().find(|e| e.set == set).map(|e| SetInfo {
            name: e.set.clone(),
            fps: e.fps,
            tau_limit: e.tau_limit,
        })
    }

    pub fn resolve(&self, entry: &ManifestEntry) -> PathBuf {
        let direct = PathBuf::from(&entry.path);
        if direct.is_absolute() || direct.exists() {
            return direct;
        }
        match &self.base {
            Some(base) => base.join(&entry.path),
            None => direct,
        }
    }

    /// Loads every file of `set` in parallel, keeping manifest order.
    ///
    pub fn load_set(&self, set: &str) -> Result<Vec<PositionData>> {
        self.files_in(set)
            .into_par_iter()
            .map(|e| PositionData::load(self.resolve(e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::position::manifest::{Manifest, ManifestEntry};
    use crate::position::{Canvas, PositionData, TrackedObject};

    fn entry(path: &str, set: &str, fps: f64) -> ManifestEntry {
        ManifestEntry {
            path: path.into(),
            set: set.into(),
            fps,
            tau_limit: 0.0,
        }
    }

    #[test]
    fn sets_are_sorted_and_distinct() {
        let m = Manifest::new(vec![
            entry("a.json", "wood", 30.0),
            entry("b.json", "cork", 15.0),
            entry("c.json", "wood", 60.0),
        ]);
        assert_eq!(m.sets(), vec!["cork".to_string(), "wood".to_string()]);
        assert_eq!(m.files_in("wood").len(), 2);
        assert_eq!(m.set_info("wood").unwrap().fps, 30.0);
        assert!(m.set_info("glass").is_none());
    }

    #[test]
    fn parse_array() {
        let m: Manifest = serde_json::from_str(
            r#"[{"path": "x.json", "set": "hot", "fps": 30, "tau_limit": 12.5}]"#,
        )
        .unwrap();
        assert_eq!(m.entries[0].tau_limit, 12.5);
    }

    #[test]
    fn load_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let data = PositionData::new(
            Canvas::default(),
            vec![TrackedObject::new(vec![1.0, 2.0], vec![3.0, 4.0])],
        );
        data.save(dir.path().join("one.json")).unwrap();
        data.save(dir.path().join("two.json")).unwrap();

        let manifest_path = dir.path().join("manifest.json");
        std::fs::write(
            &manifest_path,
            r#"[{"path": "one.json", "set": "s", "fps": 1, "tau_limit": 0},
                {"path": "two.json", "set": "s", "fps": 1, "tau_limit": 0}]"#,
        )
        .unwrap();

        let m = Manifest::load(&manifest_path).unwrap();
        let loaded = m.load_set("s").unwrap();
        assert_eq!(loaded, vec![data.clone(), data]);
    }
}
