use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Runnable;
use crate::history::HistoryStore;
use crate::knowledge::{KnowledgeStore, FACT_LAST_PROBLEM};

/// Dashboard module — assembles a read-only status snapshot over both
/// stores. Rendering is left to whatever consumes the payload.
pub struct DashboardModule {
    history: Arc<HistoryStore>,
    knowledge: Arc<KnowledgeStore>,
}

impl DashboardModule {
    pub fn new(history: Arc<HistoryStore>, knowledge: Arc<KnowledgeStore>) -> Self {
        Self { history, knowledge }
    }
}

#[async_trait]
impl Runnable for DashboardModule {
    fn name(&self) -> &str {
        "dashboard"
    }

    async fn run(&mut self) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let last = self.history.last();

        Ok(json!({
            "history_len": self.history.len(),
            "last_record": last.map(|r| json!({
                "id": r.id,
                "problem": r.problem,
                "insights": r.insights.len(),
            })),
            "fact_count": self.knowledge.len(),
            "last_problem": self.knowledge.get(FACT_LAST_PROBLEM),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ActionItem, AnalysisDraft, Decision};

    fn draft(problem: &str) -> AnalysisDraft {
        AnalysisDraft {
            problem: problem.to_string(),
            insights: vec!["insight".to_string()],
            decision: Decision {
                summary: "summary".to_string(),
                timeline: "3 days".to_string(),
            },
            actions: vec![ActionItem {
                title: "Define constraints".to_string(),
                owner: "Build".to_string(),
                due_in_days: 3,
            }],
        }
    }

    #[tokio::test]
    async fn test_snapshot_of_empty_stores() {
        let history = Arc::new(HistoryStore::new());
        let knowledge = Arc::new(KnowledgeStore::new());
        let mut module = DashboardModule::new(history, knowledge);

        let output = module.run().await.unwrap();
        assert_eq!(output["history_len"], 0);
        assert_eq!(output["fact_count"], 0);
        assert!(output["last_record"].is_null());
        assert!(output["last_problem"].is_null());
    }

    #[tokio::test]
    async fn test_snapshot_reflects_store_contents() {
        let history = Arc::new(HistoryStore::new());
        let knowledge = Arc::new(KnowledgeStore::new());
        history.append(draft("first")).unwrap();
        history.append(draft("second")).unwrap();
        knowledge.put(FACT_LAST_PROBLEM, json!("second"));

        let mut module = DashboardModule::new(Arc::clone(&history), Arc::clone(&knowledge));
        let output = module.run().await.unwrap();

        assert_eq!(output["history_len"], 2);
        assert_eq!(output["last_record"]["id"], 2);
        assert_eq!(output["last_record"]["problem"], "second");
        assert_eq!(output["last_problem"], "second");
    }

    #[tokio::test]
    async fn test_snapshot_is_read_only() {
        let history = Arc::new(HistoryStore::new());
        let knowledge = Arc::new(KnowledgeStore::new());
        let mut module = DashboardModule::new(Arc::clone(&history), Arc::clone(&knowledge));

        module.run().await.unwrap();
        module.run().await.unwrap();

        assert!(history.is_empty());
        assert!(knowledge.is_empty());
    }
}
