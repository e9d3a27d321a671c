use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::Runnable;
use crate::knowledge::{KnowledgeStore, FACT_LAST_PROBLEM};

/// Keyword feasibility score in [0, 1]. Stand-in scoring: energy-flavored
/// problems are treated as better understood.
pub fn feasibility_score(problem: &str) -> f64 {
    if problem.to_lowercase().contains("energy") {
        0.7
    } else {
        0.5
    }
}

/// Simulation module — runs a baseline what-if scenario over the most
/// recently analyzed problem.
pub struct SimulationModule {
    knowledge: Arc<KnowledgeStore>,
    runs: u64,
}

impl SimulationModule {
    pub fn new(knowledge: Arc<KnowledgeStore>) -> Self {
        Self { knowledge, runs: 0 }
    }
}

#[async_trait]
impl Runnable for SimulationModule {
    fn name(&self) -> &str {
        "simulation"
    }

    async fn run(&mut self) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let problem = self
            .knowledge
            .get(FACT_LAST_PROBLEM)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        self.runs += 1;

        if problem.is_empty() {
            info!(runs = self.runs, "simulation ran without a problem on record");
            return Ok(json!({
                "scenario": "baseline",
                "status": "no_problem",
                "runs": self.runs,
            }));
        }

        let feasibility = feasibility_score(&problem);
        info!(runs = self.runs, feasibility = feasibility, "simulation scenario complete");

        Ok(json!({
            "scenario": "baseline",
            "problem": problem,
            "feasibility": feasibility,
            "recommendation": "Prototype quickly and add verification gates.",
            "runs": self.runs,
        }))
    }
}
