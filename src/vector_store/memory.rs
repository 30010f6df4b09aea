//! In-memory store with brute-force cosine search.
//!
//! Keeps everything in process memory, which makes it handy for tests and for
//! experimenting with chunking settings without a database.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use super::{
    batch_dimension, batch_model, check_model, cosine_distance, SearchResult, StoredEntry,
    VectorStore,
};
use crate::error::StoreError;

/// In-memory vector store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Vec<StoredEntry>,
    positions: HashMap<Uuid, usize>,
    dimension: Option<usize>,
    model: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension fixed by the first upsert, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: &Uuid) -> Option<&StoredEntry> {
        self.positions.get(id).map(|&idx| &self.entries[idx])
    }
}

impl VectorStore for MemoryStore {
    fn upsert(&mut self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let Some(dims) = batch_dimension(entries)? else {
            return Ok(());
        };
        if let Some(expected) = self.dimension {
            if expected != dims {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: dims,
                });
            }
        }
        let model = batch_model(entries)?;
        check_model(self.model.as_deref(), model)?;
        self.dimension = Some(dims);
        if self.model.is_none() {
            self.model = model.map(str::to_string);
        }
        for entry in entries {
            match self.positions.get(&entry.id) {
                Some(&idx) => self.entries[idx] = entry.clone(),
                None => {
                    self.positions.insert(entry.id, self.entries.len());
                    self.entries.push(entry.clone());
                }
            }
        }
        debug!("upserted {} entries ({} total)", entries.len(), self.entries.len());
        Ok(())
    }

    fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, StoreError> {
        if k == 0 {
            return Err(StoreError::InvalidK);
        }
        let Some(expected) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        let mut scored: Vec<(f32, &StoredEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_distance(query, &entry.embedding), entry))
            .collect();
        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| SearchResult {
                entry: entry.clone(),
                score,
            })
            .collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.len())
    }

    fn embedding_model(&self) -> Result<Option<String>, StoreError> {
        Ok(self.model.clone())
    }

    fn remove_stale(&mut self, source: &str, keep: &[Uuid]) -> Result<usize, StoreError> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.source() != Some(source) || keep.contains(&entry.id));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.positions = self
                .entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| (entry.id, idx))
                .collect();
            debug!("removed {removed} stale entries from {source}");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn entry(name: &str, document: &str, embedding: Vec<f32>) -> StoredEntry {
        StoredEntry {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()),
            embedding,
            document: document.to_string(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn empty_store_returns_no_results() {
        let store = MemoryStore::new();
        assert!(store.similarity_search(&[1.0, 0.0], 5).unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn results_are_ordered_by_distance() {
        let mut store = MemoryStore::new();
        store
            .upsert(&[
                entry("far", "far", vec![0.0, 1.0]),
                entry("near", "near", vec![1.0, 0.1]),
                entry("opposite", "opposite", vec![-1.0, 0.0]),
                entry("mid", "mid", vec![1.0, 1.0]),
            ])
            .unwrap();
        let results = store.similarity_search(&[1.0, 0.0], 10).unwrap();
        let docs: Vec<&str> = results.iter().map(|r| r.entry.document.as_str()).collect();
        assert_eq!(docs, vec!["near", "mid", "far", "opposite"]);
        assert!(results.windows(2).all(|w| w[0].score <= w[1].score));

        let top = store.similarity_search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut store = MemoryStore::new();
        store
            .upsert(&[
                entry("b", "second-name-first-inserted", vec![0.0, 2.0]),
                entry("a", "first-name-second-inserted", vec![0.0, 1.0]),
            ])
            .unwrap();
        let results = store.similarity_search(&[0.0, 1.0], 2).unwrap();
        assert_eq!(results[0].entry.document, "second-name-first-inserted");
        assert_eq!(results[1].entry.document, "first-name-second-inserted");
    }

    #[test]
    fn upsert_replaces_same_id() {
        let mut store = MemoryStore::new();
        store.upsert(&[entry("x", "old", vec![1.0, 0.0])]).unwrap();
        store.upsert(&[entry("other", "other", vec![0.0, 1.0])]).unwrap();
        store.upsert(&[entry("x", "new", vec![0.5, 0.5])]).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, b"x");
        assert_eq!(store.get(&id).unwrap().document, "new");
        // The replaced entry keeps its original slot.
        assert_eq!(store.entries[0].document, "new");
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut store = MemoryStore::new();
        store.upsert(&[entry("x", "x", vec![1.0, 0.0])]).unwrap();
        assert!(matches!(
            store.similarity_search(&[1.0, 0.0, 0.0], 1),
            Err(StoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(matches!(
            store.upsert(&[entry("y", "y", vec![1.0])]),
            Err(StoreError::DimensionMismatch { .. })
        ));
        assert_eq!(store.dimension(), Some(2));
    }

    fn sourced(name: &str, source: &str) -> StoredEntry {
        let mut entry = entry(name, name, vec![1.0, 0.0]);
        entry.metadata.insert("source".into(), Value::from(source));
        entry
    }

    #[test]
    fn remove_stale_only_touches_the_given_source() {
        let mut store = MemoryStore::new();
        store
            .upsert(&[
                sourced("a0", "a.pdf"),
                sourced("b0", "b.pdf"),
                sourced("a1", "a.pdf"),
                sourced("a2", "a.pdf"),
            ])
            .unwrap();
        let keep = [Uuid::new_v5(&Uuid::NAMESPACE_OID, b"a0")];

        assert_eq!(store.remove_stale("a.pdf", &keep).unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);
        let docs: Vec<&str> = store.entries.iter().map(|e| e.document.as_str()).collect();
        assert_eq!(docs, vec!["a0", "b0"]);
        let b0 = Uuid::new_v5(&Uuid::NAMESPACE_OID, b"b0");
        assert_eq!(store.get(&b0).unwrap().document, "b0");
        assert_eq!(store.remove_stale("a.pdf", &keep).unwrap(), 0);
    }

    #[test]
    fn rejects_a_second_embedding_model() {
        let mut store = MemoryStore::new();
        store
            .upsert(&[entry("x", "x", vec![1.0, 0.0]).with_embedding_model("openai/small")])
            .unwrap();
        assert_eq!(store.embedding_model().unwrap().as_deref(), Some("openai/small"));

        let err = store
            .upsert(&[entry("y", "y", vec![0.0, 1.0]).with_embedding_model("google/embedding")])
            .unwrap_err();
        assert!(matches!(err, StoreError::ModelMismatch { .. }));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn zero_k_is_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.similarity_search(&[1.0], 0),
            Err(StoreError::InvalidK)
        ));
    }
}
