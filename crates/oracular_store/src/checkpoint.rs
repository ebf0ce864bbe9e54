//! Atomic checkpoint persistence.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use oracular_protocol::{Checkpoint, RawCard};

use crate::merge::{merge_raw_cards, MergeStats};

pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last committed checkpoint.
    ///
    /// A missing file starts the run fresh. So does a structurally invalid
    /// one: the checkpoint is a cache of re-fetchable remote state, so a
    /// corrupt file is worth a warning, not a failed run.
    pub fn load(&self) -> Checkpoint {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no checkpoint found, starting fresh");
                return Checkpoint::default();
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "could not read checkpoint, starting fresh"
                );
                return Checkpoint::default();
            }
        };

        match serde_json::from_slice::<Checkpoint>(&bytes) {
            Ok(checkpoint) => {
                info!(
                    path = %self.path.display(),
                    tags = checkpoint.processed_tags.len(),
                    cards = checkpoint.cards.len(),
                    "loaded checkpoint"
                );
                checkpoint
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "checkpoint is corrupt, starting fresh"
                );
                Checkpoint::default()
            }
        }
    }

    /// Merge one tag's records and durably mark the tag as processed.
    ///
    /// The merged cards and the processed-tag marker land in the same atomic
    /// write, so the checkpoint always reflects exactly the union of its
    /// processed tags.
    pub fn commit_tag(
        &self,
        checkpoint: &mut Checkpoint,
        tag: &str,
        records: Vec<RawCard>,
    ) -> Result<MergeStats> {
        let stats = merge_raw_cards(&mut checkpoint.cards, records);
        checkpoint.processed_tags.insert(tag.to_string());
        checkpoint.updated_at = Utc::now();
        self.write(checkpoint)?;
        Ok(stats)
    }

    /// Atomically replace the checkpoint file: serialize to a temp sibling,
    /// then rename over the final path. Never mutates in place.
    fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create checkpoint directory: {}", parent.display())
                })?;
            }
        }

        let temp_path = self.temp_path();
        let json = serde_json::to_vec_pretty(checkpoint).context("Failed to serialize checkpoint")?;

        fs::write(&temp_path, json).with_context(|| {
            format!("Failed to write temp checkpoint: {}", temp_path.display())
        })?;
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} -> {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        debug!(
            path = %self.path.display(),
            tags = checkpoint.processed_tags.len(),
            cards = checkpoint.cards.len(),
            "committed checkpoint"
        );
        Ok(())
    }

    /// Remove the checkpoint after a fully successful run.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared checkpoint");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("Failed to remove checkpoint: {}", self.path.display())
            }),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint".to_string());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracular_protocol::CardPayload;
    use tempfile::tempdir;

    fn raw(tag: &str, id: &str) -> RawCard {
        RawCard {
            tag: tag.to_string(),
            card: CardPayload {
                id: id.to_string(),
                name: format!("card {id}"),
                extra: serde_json::Map::new(),
            },
        }
    }

    #[test]
    fn load_missing_checkpoint_is_empty() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        let checkpoint = store.load();
        assert!(checkpoint.processed_tags.is_empty());
        assert!(checkpoint.cards.is_empty());
    }

    #[test]
    fn commit_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

        let mut checkpoint = store.load();
        store
            .commit_tag(&mut checkpoint, "removal", vec![raw("removal", "a")])
            .unwrap();

        let loaded = store.load();
        assert!(loaded.is_processed("removal"));
        assert!(loaded.cards.contains_key("a"));
        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn commit_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nested/deeper/checkpoint.json"));
        let mut checkpoint = Checkpoint::default();
        store
            .commit_tag(&mut checkpoint, "ramp", vec![raw("ramp", "b")])
            .unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn commit_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        let mut checkpoint = Checkpoint::default();
        store
            .commit_tag(&mut checkpoint, "ramp", vec![raw("ramp", "b")])
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, ["checkpoint.json"]);
    }

    #[test]
    fn corrupt_checkpoint_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        fs::write(&path, r#"{"processed_tags": ["removal", truncated"#).unwrap();

        let store = CheckpointStore::new(&path);
        let checkpoint = store.load();
        assert!(checkpoint.processed_tags.is_empty());
        assert!(checkpoint.cards.is_empty());
    }

    #[test]
    fn successive_commits_accumulate() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

        let mut checkpoint = store.load();
        store
            .commit_tag(&mut checkpoint, "removal", vec![raw("removal", "a"), raw("removal", "b")])
            .unwrap();
        store
            .commit_tag(&mut checkpoint, "ramp", vec![raw("ramp", "b"), raw("ramp", "c")])
            .unwrap();

        let loaded = store.load();
        assert_eq!(loaded.processed_tags.len(), 2);
        assert_eq!(loaded.cards.len(), 3);
        assert_eq!(
            loaded.cards["b"].tags.iter().collect::<Vec<_>>(),
            ["ramp", "removal"]
        );
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        let mut checkpoint = Checkpoint::default();
        store
            .commit_tag(&mut checkpoint, "ramp", vec![raw("ramp", "b")])
            .unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());

        // Clearing an already-missing checkpoint is fine.
        store.clear().unwrap();
    }
}
