//! Pipeline history store.
//!
//! A capped, append-mostly log of pipeline runs over an injected
//! key-value backend. The backend is assumed unreliable: every read and
//! write failure is logged and swallowed, so history is never a source
//! of pipeline-blocking errors.

use crate::error::{PipelineError, Result};
use crate::model::{GenerationPipeline, PipelineStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub const HISTORY_CAP: usize = 50;

const INDEX_KEY: &str = "pipeline:index";

fn entry_key(id: &Uuid) -> String {
    format!("pipeline:{id}")
}

/// Minimal JSON-blob persistence contract.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory backend for tests and offline sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Counts by terminal status across the retained history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
    pub in_progress: usize,
}

pub struct PipelineHistory<S> {
    storage: S,
    cap: usize,
}

impl<S: Storage> PipelineHistory<S> {
    pub fn new(storage: S) -> Self {
        Self::with_cap(storage, HISTORY_CAP)
    }

    pub fn with_cap(storage: S, cap: usize) -> Self {
        Self {
            storage,
            cap: cap.max(1),
        }
    }

    pub fn create_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Upsert by id, evicting the oldest entries past the cap. Failures
    /// are logged and swallowed.
    pub async fn save(&self, pipeline: &GenerationPipeline) {
        let payload = match serde_json::to_string(pipeline) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("history: failed to serialize pipeline {}: {e}", pipeline.id);
                return;
            }
        };
        if let Err(e) = self.storage.set(&entry_key(&pipeline.id), payload).await {
            log::warn!("history: failed to save pipeline {}: {e}", pipeline.id);
            return;
        }

        let mut index = self.load_index().await;
        if !index.contains(&pipeline.id) {
            index.push(pipeline.id);
        }
        while index.len() > self.cap {
            let evicted = index.remove(0);
            if let Err(e) = self.storage.delete(&entry_key(&evicted)).await {
                log::warn!("history: failed to evict pipeline {evicted}: {e}");
            }
        }
        self.store_index(&index).await;
    }

    pub async fn load(&self, id: &Uuid) -> Option<GenerationPipeline> {
        let raw = match self.storage.get(&entry_key(id)).await {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("history: failed to load pipeline {id}: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(pipeline) => Some(pipeline),
            Err(e) => {
                log::warn!("history: corrupt entry for pipeline {id}: {e}");
                None
            }
        }
    }

    /// All retained runs, oldest first.
    pub async fn load_all(&self) -> Vec<GenerationPipeline> {
        let index = self.load_index().await;
        let mut pipelines = Vec::with_capacity(index.len());
        for id in &index {
            if let Some(pipeline) = self.load(id).await {
                pipelines.push(pipeline);
            }
        }
        pipelines
    }

    pub async fn delete(&self, id: &Uuid) {
        if let Err(e) = self.storage.delete(&entry_key(id)).await {
            log::warn!("history: failed to delete pipeline {id}: {e}");
        }
        let mut index = self.load_index().await;
        index.retain(|entry| entry != id);
        self.store_index(&index).await;
    }

    pub async fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats::default();
        for pipeline in self.load_all().await {
            stats.total += 1;
            match pipeline.status {
                PipelineStatus::Complete => stats.complete += 1,
                PipelineStatus::Partial => stats.partial += 1,
                PipelineStatus::Failed => stats.failed += 1,
                PipelineStatus::InProgress => stats.in_progress += 1,
            }
        }
        stats
    }

    async fn load_index(&self) -> Vec<Uuid> {
        match self.storage.get(INDEX_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("history: corrupt index, resetting: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("history: failed to read index: {e}");
                Vec::new()
            }
        }
    }

    async fn store_index(&self, index: &[Uuid]) {
        match serde_json::to_string(index) {
            Ok(payload) => {
                if let Err(e) = self.storage.set(INDEX_KEY, payload).await {
                    log::warn!("history: failed to write index: {e}");
                }
            }
            Err(e) => log::warn!("history: failed to serialize index: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(history: &PipelineHistory<MemoryStorage>, status: PipelineStatus) -> GenerationPipeline {
        let mut pipeline = GenerationPipeline::new(history.create_id(), "a prompt");
        pipeline.status = status;
        pipeline
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let history = PipelineHistory::new(MemoryStorage::default());
        let pipeline = run(&history, PipelineStatus::Complete);
        history.save(&pipeline).await;

        let loaded = history.load(&pipeline.id).await.unwrap();
        assert_eq!(loaded.id, pipeline.id);
        assert_eq!(loaded.status, PipelineStatus::Complete);
    }

    #[tokio::test]
    async fn cap_evicts_oldest_first() {
        let history = PipelineHistory::with_cap(MemoryStorage::default(), 3);
        let mut ids = Vec::new();
        for _ in 0..5 {
            let pipeline = run(&history, PipelineStatus::Complete);
            ids.push(pipeline.id);
            history.save(&pipeline).await;
        }

        let retained = history.load_all().await;
        assert_eq!(retained.len(), 3);
        let retained_ids: Vec<Uuid> = retained.iter().map(|p| p.id).collect();
        assert_eq!(retained_ids, ids[2..].to_vec());
        assert!(history.load(&ids[0]).await.is_none());
        assert!(history.load(&ids[1]).await.is_none());
    }

    #[tokio::test]
    async fn upsert_does_not_duplicate_index_entries() {
        let history = PipelineHistory::with_cap(MemoryStorage::default(), 10);
        let mut pipeline = run(&history, PipelineStatus::InProgress);
        history.save(&pipeline).await;
        pipeline.status = PipelineStatus::Failed;
        history.save(&pipeline).await;

        let retained = history.load_all().await;
        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].status, PipelineStatus::Failed);
    }

    #[tokio::test]
    async fn stats_count_by_terminal_status() {
        let history = PipelineHistory::new(MemoryStorage::default());
        for status in [
            PipelineStatus::Complete,
            PipelineStatus::Complete,
            PipelineStatus::Partial,
            PipelineStatus::Failed,
        ] {
            history.save(&run(&history, status)).await;
        }

        let stats = history.stats().await;
        assert_eq!(
            stats,
            HistoryStats {
                total: 4,
                complete: 2,
                partial: 1,
                failed: 1,
                in_progress: 0,
            }
        );
    }

    #[tokio::test]
    async fn delete_removes_entry_and_index_slot() {
        let history = PipelineHistory::new(MemoryStorage::default());
        let pipeline = run(&history, PipelineStatus::Complete);
        history.save(&pipeline).await;
        history.delete(&pipeline.id).await;

        assert!(history.load(&pipeline.id).await.is_none());
        assert!(history.load_all().await.is_empty());
    }
}
