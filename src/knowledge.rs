//! Latest-value-wins fact store.
//!
//! Facts are whole-value replacements keyed by string: a write supersedes any
//! prior value under the same key, and readers never observe a partial write.
//! There is no delete — facts are only ever superseded.

use dashmap::DashMap;
use serde_json::Value;

/// Problem text from the most recently committed analysis.
pub const FACT_LAST_PROBLEM: &str = "last_problem";
/// Number of analyses committed so far.
pub const FACT_ANALYSIS_COUNT: &str = "analysis_count";
/// Record id of the most recently committed analysis.
pub const FACT_LAST_ANALYSIS_ID: &str = "last_analysis_id";

/// Shared key/value map of derived facts.
pub struct KnowledgeStore {
    facts: DashMap<String, Value>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self {
            facts: DashMap::new(),
        }
    }

    /// Store a fact, replacing any previous value under the key.
    pub fn put(&self, key: &str, value: Value) {
        self.facts.insert(key.to_string(), value);
    }

    /// Current value for the key, if one has been stored.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.facts.get(key).map(|entry| entry.value().clone())
    }

    /// Current value for the key, or `default` when absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Number of distinct fact keys.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Keys currently present, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.facts.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}
