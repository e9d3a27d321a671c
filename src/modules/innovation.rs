use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::Runnable;
use crate::knowledge::{KnowledgeStore, FACT_LAST_PROBLEM};

/// Fact key for the most recently framed experiment.
pub const FACT_LAST_EXPERIMENT: &str = "last_experiment";

/// Innovation module — frames the current problem as an experiment and keeps
/// a backlog of everything framed so far.
pub struct InnovationModule {
    knowledge: Arc<KnowledgeStore>,
    experiments: Vec<String>,
}

impl InnovationModule {
    pub fn new(knowledge: Arc<KnowledgeStore>) -> Self {
        Self {
            knowledge,
            experiments: Vec::new(),
        }
    }
}

#[async_trait]
impl Runnable for InnovationModule {
    fn name(&self) -> &str {
        "innovation"
    }

    async fn run(&mut self) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let problem = self
            .knowledge
            .get(FACT_LAST_PROBLEM)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "open exploration".to_string());

        let experiment = format!("experiment-{}: {}", self.experiments.len() + 1, problem);
        self.experiments.push(experiment.clone());
        self.knowledge
            .put(FACT_LAST_EXPERIMENT, json!(experiment.clone()));

        info!(experiment = %experiment, backlog = self.experiments.len(), "experiment framed");

        Ok(json!({
            "status": "success",
            "experiment": experiment,
            "backlog": self.experiments.len(),
        }))
    }
}
