use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::message::Message;
use crate::thread::{CompletionRecord, ParticipantPair};

/// Serialisable history of one conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub pair: ParticipantPair,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub records: Vec<CompletionRecord>,
}

pub trait ThreadStore: Send + Sync {
    fn load(&self, pair: &ParticipantPair) -> Result<Option<ThreadSnapshot>>;

    fn save(&self, snapshot: &ThreadSnapshot) -> Result<()>;

    fn list(&self) -> Result<Vec<ThreadSnapshot>>;
}

/// Stores one pretty-printed JSON file per pair under `<workspace>/threads`.
pub struct JsonThreadStore {
    dir: PathBuf,
}

impl JsonThreadStore {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            dir: workspace.as_ref().join("threads"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, pair: &ParticipantPair) -> PathBuf {
        self.dir.join(format!("{}.json", pair.file_stem()))
    }

    fn read(path: &Path) -> Result<ThreadSnapshot> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read thread from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse thread from {}", path.display()))
    }
}

impl ThreadStore for JsonThreadStore {
    fn load(&self, pair: &ParticipantPair) -> Result<Option<ThreadSnapshot>> {
        let path = self.path_for(pair);
        if !path.exists() {
            return Ok(None);
        }
        let snapshot = Self::read(&path)?;
        if snapshot.pair != *pair {
            anyhow::bail!(
                "Thread file {} belongs to {}, not {}",
                path.display(),
                snapshot.pair,
                pair
            );
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &ThreadSnapshot) -> Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create threads directory at {}", self.dir.display())
        })?;

        let path = self.path_for(&snapshot.pair);
        let content = serde_json::to_string_pretty(snapshot)
            .with_context(|| format!("Failed to serialize thread {}", snapshot.pair))?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write thread to {}", path.display()))
    }

    fn list(&self) -> Result<Vec<ThreadSnapshot>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read threads directory: {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut snapshots = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read(&path) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!("Skipping unreadable thread file: {:#}", e),
            }
        }
        Ok(snapshots)
    }
}
