//! Append-only analysis history.
//!
//! Every completed analysis lands here as an `AnalysisRecord`. The store
//! assigns ids: they start at 1, strictly increase, and are never reused.
//! Accepted records are never reordered or dropped. Reads return snapshots —
//! an append that completes after a snapshot was taken is not visible in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Errors from the history store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("history capacity exhausted ({capacity} records)")]
    CapacityExhausted { capacity: usize },
}

/// Synthesized decision attached to an analysis record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub summary: String,
    pub timeline: String,
}

/// A follow-up item proposed during analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub title: String,
    pub owner: String,
    pub due_in_days: u32,
}

/// Analysis output before the store has assigned an id.
#[derive(Debug, Clone)]
pub struct AnalysisDraft {
    pub problem: String,
    pub insights: Vec<String>,
    pub decision: Decision,
    pub actions: Vec<ActionItem>,
}

/// One completed analysis, exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: u64,
    pub problem: String,
    pub insights: Vec<String>,
    pub decision: Decision,
    pub actions: Vec<ActionItem>,
    pub created_at: DateTime<Utc>,
}

struct HistoryInner {
    records: Vec<AnalysisRecord>,
    next_id: u64,
}

/// Append-only in-memory record log.
///
/// Interior mutability so a single store can be shared behind `Arc` by the
/// pipeline and read-only collaborators; writers serialize on the lock.
pub struct HistoryStore {
    inner: Mutex<HistoryInner>,
    capacity: Option<usize>,
}

impl HistoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HistoryInner {
                records: Vec::new(),
                next_id: 1,
            }),
            capacity: None,
        }
    }

    /// Create a store that refuses appends beyond `capacity` records.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HistoryInner {
                records: Vec::new(),
                next_id: 1,
            }),
            capacity: Some(capacity),
        }
    }

    /// Append a draft, assigning the next id and the creation timestamp.
    /// Returns the record exactly as stored. On error nothing is stored and
    /// no id is consumed.
    pub fn append(&self, draft: AnalysisDraft) -> Result<AnalysisRecord, StorageError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(capacity) = self.capacity {
            if inner.records.len() >= capacity {
                return Err(StorageError::CapacityExhausted { capacity });
            }
        }

        let record = AnalysisRecord {
            id: inner.next_id,
            problem: draft.problem,
            insights: draft.insights,
            decision: draft.decision,
            actions: draft.actions,
            created_at: Utc::now(),
        };
        inner.next_id += 1;
        inner.records.push(record.clone());
        Ok(record)
    }

    /// Most recently appended record, if any.
    pub fn last(&self) -> Option<AnalysisRecord> {
        self.inner.lock().unwrap().records.last().cloned()
    }

    /// Snapshot of every record appended so far, in insertion order.
    pub fn all(&self) -> Vec<AnalysisRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
