//! Persistence of named layout snapshots, one per algorithm.

use ax25map_core::StationId;
use ax25map_events::LayoutAlgorithm;
use ax25map_graph::Vec2;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILE_SUFFIX: &str = "_positions.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed layout file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLayout {
    pub algorithm: LayoutAlgorithm,
    pub positions: BTreeMap<StationId, Vec2>,
    pub saved_at: DateTime<Utc>,
    pub node_count: usize,
}

impl SavedLayout {
    pub fn new(algorithm: LayoutAlgorithm, positions: BTreeMap<StationId, Vec2>) -> Self {
        Self {
            algorithm,
            node_count: positions.len(),
            positions,
            saved_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> LayoutSummary {
        LayoutSummary {
            algorithm: self.algorithm,
            node_count: self.node_count,
            saved_at: self.saved_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub algorithm: LayoutAlgorithm,
    pub node_count: usize,
    pub saved_at: DateTime<Utc>,
}

/// Where layout snapshots live. `restore` returns `Ok(None)` when nothing
/// was saved for the algorithm; that is not an error.
pub trait LayoutStore: Send + Sync {
    fn save(&self, layout: &SavedLayout) -> Result<(), StoreError>;

    fn restore(&self, algorithm: LayoutAlgorithm) -> Result<Option<SavedLayout>, StoreError>;

    fn list(&self) -> Result<Vec<LayoutSummary>, StoreError>;
}

/// Stores each snapshot as `<dir>/<algorithm>_positions.json`.
#[derive(Debug, Clone)]
pub struct FileLayoutStore {
    dir: PathBuf,
}

impl FileLayoutStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, algorithm: LayoutAlgorithm) -> PathBuf {
        self.dir.join(format!("{}{FILE_SUFFIX}", algorithm.name()))
    }

    fn read(path: &Path) -> Result<SavedLayout, StoreError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl LayoutStore for FileLayoutStore {
    fn save(&self, layout: &SavedLayout) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(layout.algorithm);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(layout)?)?;
        fs::rename(&tmp, &path)?;
        tracing::info!(
            algorithm = %layout.algorithm,
            nodes = layout.node_count,
            "Saved layout to {:?}",
            path
        );
        Ok(())
    }

    fn restore(&self, algorithm: LayoutAlgorithm) -> Result<Option<SavedLayout>, StoreError> {
        match Self::read(&self.path_for(algorithm)) {
            Ok(layout) => Ok(Some(layout)),
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self) -> Result<Vec<LayoutSummary>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_layout = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(FILE_SUFFIX));
            if !is_layout {
                continue;
            }
            match Self::read(&path) {
                Ok(layout) => summaries.push(layout.summary()),
                Err(e) => tracing::warn!("Skipping unreadable layout {:?}: {}", path, e),
            }
        }
        summaries.sort_by_key(|s| s.algorithm.name());
        Ok(summaries)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLayoutStore {
    layouts: Mutex<HashMap<LayoutAlgorithm, SavedLayout>>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn save(&self, layout: &SavedLayout) -> Result<(), StoreError> {
        self.layouts.lock().insert(layout.algorithm, layout.clone());
        Ok(())
    }

    fn restore(&self, algorithm: LayoutAlgorithm) -> Result<Option<SavedLayout>, StoreError> {
        Ok(self.layouts.lock().get(&algorithm).cloned())
    }

    fn list(&self) -> Result<Vec<LayoutSummary>, StoreError> {
        let mut summaries: Vec<_> = self.layouts.lock().values().map(SavedLayout::summary).collect();
        summaries.sort_by_key(|s| s.algorithm.name());
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(algorithm: LayoutAlgorithm) -> SavedLayout {
        let mut positions = BTreeMap::new();
        positions.insert(StationId::new("K6FB"), Vec2::new(100.0, 200.0));
        positions.insert(StationId::new("WOODY"), Vec2::new(300.0, 250.0));
        SavedLayout::new(algorithm, positions)
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryLayoutStore::new();
        assert_eq!(store.restore(LayoutAlgorithm::Hub).unwrap(), None);

        let saved = layout(LayoutAlgorithm::Hub);
        store.save(&saved).unwrap();
        assert_eq!(store.restore(LayoutAlgorithm::Hub).unwrap(), Some(saved));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_file_name_per_algorithm() {
        let store = FileLayoutStore::new("layouts");
        assert_eq!(
            store.path_for(LayoutAlgorithm::ForceDirected),
            PathBuf::from("layouts").join("force-directed_positions.json")
        );
    }

    #[test]
    fn test_node_count_matches_positions() {
        assert_eq!(layout(LayoutAlgorithm::Spring).node_count, 2);
    }
}
