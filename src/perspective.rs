use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::warn;

use crate::history::ActionItem;
use crate::modules::simulation::feasibility_score;

/// Default acceptance floor for the feasibility perspective.
pub const DEFAULT_FEASIBILITY_FLOOR: f64 = 0.6;

/// Read-only view of prior state handed to every evaluator.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub last_problem: Option<String>,
    pub analysis_count: u64,
}

/// What one evaluator contributes to an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveReport {
    pub insights: Vec<String>,
    pub actions: Vec<ActionItem>,
}

/// A single analytical viewpoint over a problem statement.
///
/// Evaluators are side-effect free: the same problem and context always
/// produce the same report, and evaluation never touches the stores.
#[async_trait]
pub trait Perspective: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        problem: &str,
        ctx: &AnalysisContext,
    ) -> Result<PerspectiveReport, Box<dyn std::error::Error + Send + Sync>>;
}

/// Scenario Perspective
/// Baseline what-if pass favoring a fast prototype over upfront design
pub struct ScenarioPerspective;

#[async_trait]
impl Perspective for ScenarioPerspective {
    fn name(&self) -> &str {
        "scenario"
    }

    async fn evaluate(
        &self,
        problem: &str,
        ctx: &AnalysisContext,
    ) -> Result<PerspectiveReport, Box<dyn std::error::Error + Send + Sync>> {
        let mut insights = vec![
            "Baseline scenario favors rapid prototyping over upfront design.".to_string(),
            "Integrate measurement early; plan verification gates.".to_string(),
        ];
        if let Some(last) = &ctx.last_problem {
            if last != problem {
                insights.push(format!(
                    "Prior problem '{}' may share constraints worth reusing.",
                    last
                ));
            }
        }

        Ok(PerspectiveReport {
            insights,
            actions: vec![ActionItem {
                title: "Define constraints".to_string(),
                owner: "Build".to_string(),
                due_in_days: 3,
            }],
        })
    }
}

/// Feasibility Perspective
/// Keyword scoring in [0, 1]; below the floor a verification plan is required
pub struct FeasibilityPerspective {
    pub floor: f64,
}

impl FeasibilityPerspective {
    pub fn new(floor: f64) -> Self {
        Self { floor }
    }
}

impl Default for FeasibilityPerspective {
    fn default() -> Self {
        Self::new(DEFAULT_FEASIBILITY_FLOOR)
    }
}

#[async_trait]
impl Perspective for FeasibilityPerspective {
    fn name(&self) -> &str {
        "feasibility"
    }

    async fn evaluate(
        &self,
        problem: &str,
        _ctx: &AnalysisContext,
    ) -> Result<PerspectiveReport, Box<dyn std::error::Error + Send + Sync>> {
        let score = feasibility_score(problem);
        let mut insights = vec![format!("Feasibility score {:.2} for the stated problem.", score)];
        let mut actions = Vec::new();

        if score < self.floor {
            insights.push(
                "Score below the acceptance floor; verification gates required before build."
                    .to_string(),
            );
            actions.push(ActionItem {
                title: "Verification plan".to_string(),
                owner: "Safety".to_string(),
                due_in_days: 7,
            });
        }

        Ok(PerspectiveReport { insights, actions })
    }
}

/// Research Perspective
/// Frames the problem as an experiment with a literature follow-up
pub struct ResearchPerspective;

#[async_trait]
impl Perspective for ResearchPerspective {
    fn name(&self) -> &str {
        "research"
    }

    async fn evaluate(
        &self,
        problem: &str,
        _ctx: &AnalysisContext,
    ) -> Result<PerspectiveReport, Box<dyn std::error::Error + Send + Sync>> {
        Ok(PerspectiveReport {
            insights: vec![format!(
                "Experiment framed: isolate the dominant constraint in '{}' and test at small scale.",
                problem
            )],
            actions: vec![ActionItem {
                title: "Literature review".to_string(),
                owner: "Research".to_string(),
                due_in_days: 5,
            }],
        })
    }
}

/// Ordered collection of evaluators with concurrent dispatch.
pub struct PerspectiveSet {
    perspectives: Vec<Arc<dyn Perspective>>,
    eval_timeout: Duration,
}

impl PerspectiveSet {
    /// Create an empty set. Each evaluator is cut off after `eval_timeout`
    /// and replaced by a diagnostic insight.
    pub fn new(eval_timeout: Duration) -> Self {
        Self {
            perspectives: Vec::new(),
            eval_timeout,
        }
    }

    /// The three stock evaluators: scenario, feasibility, research.
    pub fn builtin(eval_timeout: Duration) -> Self {
        let mut set = Self::new(eval_timeout);
        set.register(Arc::new(ScenarioPerspective));
        set.register(Arc::new(FeasibilityPerspective::default()));
        set.register(Arc::new(ResearchPerspective));
        set
    }

    /// Add an evaluator at the end of the evaluation order.
    pub fn register(&mut self, perspective: Arc<dyn Perspective>) {
        self.perspectives.push(perspective);
    }

    pub fn names(&self) -> Vec<String> {
        self.perspectives
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.perspectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perspectives.is_empty()
    }

    /// Evaluate every perspective concurrently against the same problem and
    /// context. A failing, hung, or panicking evaluator contributes one
    /// diagnostic insight; the rest are unaffected. Reports come back in
    /// registration order regardless of completion order.
    pub async fn evaluate_all(
        &self,
        problem: &str,
        ctx: &AnalysisContext,
    ) -> Vec<PerspectiveReport> {
        let mut join_set = JoinSet::new();
        for (idx, perspective) in self.perspectives.iter().enumerate() {
            let perspective = Arc::clone(perspective);
            let problem = problem.to_string();
            let ctx = ctx.clone();
            let eval_timeout = self.eval_timeout;
            join_set.spawn(async move {
                let name = perspective.name().to_string();
                let result =
                    tokio::time::timeout(eval_timeout, perspective.evaluate(&problem, &ctx)).await;
                (idx, name, result)
            });
        }

        let mut slots: Vec<Option<PerspectiveReport>> = vec![None; self.perspectives.len()];
        while let Some(joined) = join_set.join_next().await {
            let Ok((idx, name, result)) = joined else {
                // Panicked task; its slot is filled with a diagnostic below
                continue;
            };
            let report = match result {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    warn!(perspective = %name, error = %e, "evaluator failed");
                    diagnostic(&name, &format!("evaluator failed: {}", e))
                }
                Err(_) => {
                    warn!(perspective = %name, timeout = ?self.eval_timeout, "evaluator timed out");
                    diagnostic(&name, &format!("timed out after {:?}", self.eval_timeout))
                }
            };
            slots[idx] = Some(report);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    let name = self.perspectives[idx].name();
                    warn!(perspective = %name, "evaluator aborted");
                    diagnostic(name, "evaluator aborted")
                })
            })
            .collect()
    }
}

fn diagnostic(name: &str, reason: &str) -> PerspectiveReport {
    PerspectiveReport {
        insights: vec![format!("{} perspective unavailable: {}", name, reason)],
        actions: Vec::new(),
    }
}
