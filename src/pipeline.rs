//! Problem analysis pipeline.
//!
//! `analyze` runs four stages: validate, fetch context, evaluate
//! perspectives, persist. Validation failures mutate nothing. Persistence
//! commits the history record and the derived facts together under one
//! guard, so concurrent callers never observe one without the other; if the
//! append is refused, no fact is written either.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::history::{AnalysisDraft, AnalysisRecord, Decision, HistoryStore, StorageError};
use crate::knowledge::{
    KnowledgeStore, FACT_ANALYSIS_COUNT, FACT_LAST_ANALYSIS_ID, FACT_LAST_PROBLEM,
};
use crate::perspective::{AnalysisContext, PerspectiveReport, PerspectiveSet};

/// Errors surfaced to `analyze` callers.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("problem text must not be empty")]
    EmptyProblem,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coordinates perspective evaluation and persistence for one problem at a
/// time per call; calls may overlap freely.
pub struct AnalysisPipeline {
    history: Arc<HistoryStore>,
    knowledge: Arc<KnowledgeStore>,
    perspectives: PerspectiveSet,
    // Serializes stage 4 so record and facts land together.
    // Never held across an await.
    commit: Mutex<()>,
}

impl AnalysisPipeline {
    pub fn new(
        history: Arc<HistoryStore>,
        knowledge: Arc<KnowledgeStore>,
        perspectives: PerspectiveSet,
    ) -> Self {
        Self {
            history,
            knowledge,
            perspectives,
            commit: Mutex::new(()),
        }
    }

    /// Analyze one problem statement end to end. Returns the stored record;
    /// on error neither store has changed on behalf of this call.
    pub async fn analyze(&self, problem: &str) -> Result<AnalysisRecord, AnalysisError> {
        let problem = problem.trim();
        if problem.is_empty() {
            return Err(AnalysisError::EmptyProblem);
        }

        let request_id = Uuid::new_v4();
        info!(request_id = %request_id, problem = %problem, "analysis started");

        // Stage 1: context fetch (read-only)
        let ctx = AnalysisContext {
            last_problem: self
                .knowledge
                .get(FACT_LAST_PROBLEM)
                .and_then(|v| v.as_str().map(str::to_string)),
            analysis_count: self
                .knowledge
                .get(FACT_ANALYSIS_COUNT)
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        };

        // Stage 2: perspective evaluation, concurrent with partial-failure
        // tolerance
        let reports = self.perspectives.evaluate_all(problem, &ctx).await;

        // Stage 3: synthesis
        let draft = synthesize(problem, &reports);

        // Stage 4: persistence. The record is fully built before the guard
        // is taken; a refused append writes nothing.
        let record = {
            let _guard = self.commit.lock().unwrap();
            let record = self.history.append(draft)?;
            let count = self
                .knowledge
                .get(FACT_ANALYSIS_COUNT)
                .and_then(|v| v.as_u64())
                .unwrap_or(0)
                + 1;
            self.knowledge
                .put(FACT_LAST_PROBLEM, Value::String(problem.to_string()));
            self.knowledge.put(FACT_ANALYSIS_COUNT, json!(count));
            self.knowledge.put(FACT_LAST_ANALYSIS_ID, json!(record.id));
            record
        };

        info!(
            request_id = %request_id,
            record_id = record.id,
            insights = record.insights.len(),
            actions = record.actions.len(),
            "analysis stored"
        );
        Ok(record)
    }
}

/// Merge evaluator reports into a draft record. Insights keep evaluator
/// order; actions are deduplicated by (title, owner) with the first
/// occurrence winning; the decision is derived from the merged material.
fn synthesize(problem: &str, reports: &[PerspectiveReport]) -> AnalysisDraft {
    let mut insights = Vec::new();
    let mut actions: Vec<crate::history::ActionItem> = Vec::new();

    for report in reports {
        insights.extend(report.insights.iter().cloned());
        for action in &report.actions {
            let seen = actions
                .iter()
                .any(|a| a.title == action.title && a.owner == action.owner);
            if !seen {
                actions.push(action.clone());
            }
        }
    }

    let summary = if reports.is_empty() {
        "No perspectives registered; decision deferred.".to_string()
    } else {
        format!(
            "Prototype first, then iterate ({} insights from {} perspectives).",
            insights.len(),
            reports.len()
        )
    };
    let timeline = match actions.iter().map(|a| a.due_in_days).max() {
        Some(days) => format!("First checkpoint in {} days.", days),
        None => "No scheduled actions.".to_string(),
    };

    AnalysisDraft {
        problem: problem.to_string(),
        insights,
        decision: Decision { summary, timeline },
        actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ActionItem;
    use crate::perspective::{Perspective, PerspectiveSet};
    use async_trait::async_trait;
    use std::time::Duration;

    fn builtin_pipeline() -> AnalysisPipeline {
        AnalysisPipeline::new(
            Arc::new(HistoryStore::new()),
            Arc::new(KnowledgeStore::new()),
            PerspectiveSet::builtin(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_analyze_appends_one_record() {
        let pipeline = builtin_pipeline();

        let record = pipeline.analyze("reduce launch cost").await.unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.problem, "reduce launch cost");
        assert!(!record.insights.is_empty());
        assert_eq!(pipeline.history.len(), 1);
        assert_eq!(pipeline.history.last().unwrap(), record);
    }

    #[tokio::test]
    async fn test_analyze_writes_derived_facts() {
        let pipeline = builtin_pipeline();
        let record = pipeline.analyze("reduce launch cost").await.unwrap();

        assert_eq!(
            pipeline.knowledge.get(FACT_LAST_PROBLEM),
            Some(json!("reduce launch cost"))
        );
        assert_eq!(pipeline.knowledge.get(FACT_ANALYSIS_COUNT), Some(json!(1)));
        assert_eq!(
            pipeline.knowledge.get(FACT_LAST_ANALYSIS_ID),
            Some(json!(record.id))
        );
    }

    #[tokio::test]
    async fn test_analyze_id_tracks_history_length() {
        let pipeline = builtin_pipeline();

        for expected in 1..=3u64 {
            let record = pipeline.analyze(&format!("problem {}", expected)).await.unwrap();
            assert_eq!(record.id, expected);
            assert_eq!(pipeline.history.len() as u64, expected);
        }
    }

    #[tokio::test]
    async fn test_empty_problem_rejected_without_mutation() {
        let pipeline = builtin_pipeline();

        let result = pipeline.analyze("").await;
        assert!(matches!(result, Err(AnalysisError::EmptyProblem)));

        let result = pipeline.analyze("   \t  ").await;
        assert!(matches!(result, Err(AnalysisError::EmptyProblem)));

        assert!(pipeline.history.is_empty());
        assert!(pipeline.knowledge.is_empty());
    }

    #[tokio::test]
    async fn test_problem_text_is_trimmed() {
        let pipeline = builtin_pipeline();
        let record = pipeline.analyze("  padded problem  ").await.unwrap();

        assert_eq!(record.problem, "padded problem");
        assert_eq!(
            pipeline.knowledge.get(FACT_LAST_PROBLEM),
            Some(json!("padded problem"))
        );
    }

    #[tokio::test]
    async fn test_capacity_failure_leaves_no_partial_state() {
        let pipeline = AnalysisPipeline::new(
            Arc::new(HistoryStore::bounded(1)),
            Arc::new(KnowledgeStore::new()),
            PerspectiveSet::builtin(Duration::from_secs(5)),
        );

        pipeline.analyze("first").await.unwrap();
        let result = pipeline.analyze("second").await;
        assert!(matches!(result, Err(AnalysisError::Storage(_))));

        // Stores still describe the first call only
        assert_eq!(pipeline.history.len(), 1);
        assert_eq!(pipeline.knowledge.get(FACT_LAST_PROBLEM), Some(json!("first")));
        assert_eq!(pipeline.knowledge.get(FACT_ANALYSIS_COUNT), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_second_analysis_sees_first_as_context() {
        let pipeline = builtin_pipeline();

        pipeline.analyze("first problem").await.unwrap();
        let record = pipeline.analyze("second problem").await.unwrap();

        // The scenario evaluator echoes the prior problem from context
        assert!(record
            .insights
            .iter()
            .any(|i| i.contains("first problem")));
    }

    #[tokio::test]
    async fn test_zero_perspectives_still_records_decision() {
        let pipeline = AnalysisPipeline::new(
            Arc::new(HistoryStore::new()),
            Arc::new(KnowledgeStore::new()),
            PerspectiveSet::new(Duration::from_secs(5)),
        );

        let record = pipeline.analyze("anything").await.unwrap();
        assert!(record.insights.is_empty());
        assert!(record.actions.is_empty());
        assert!(record.decision.summary.contains("No perspectives"));
        assert_eq!(pipeline.history.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_analyze_distinct_increasing_ids() {
        let pipeline = Arc::new(builtin_pipeline());
        let mut join_set = tokio::task::JoinSet::new();

        for i in 0..8 {
            let pipeline = Arc::clone(&pipeline);
            join_set.spawn(async move { pipeline.analyze(&format!("problem {}", i)).await });
        }

        let mut ids = Vec::new();
        while let Some(result) = join_set.join_next().await {
            ids.push(result.unwrap().unwrap().id);
        }
        ids.sort_unstable();

        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(pipeline.history.len(), 8);
        assert_eq!(pipeline.knowledge.get(FACT_ANALYSIS_COUNT), Some(json!(8)));
    }

    #[tokio::test]
    async fn test_identical_concurrent_problems_are_not_deduplicated() {
        let pipeline = Arc::new(builtin_pipeline());
        let mut join_set = tokio::task::JoinSet::new();

        for _ in 0..4 {
            let pipeline = Arc::clone(&pipeline);
            join_set.spawn(async move { pipeline.analyze("same problem").await });
        }
        while let Some(result) = join_set.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(pipeline.history.len(), 4);
    }

    // ─── Synthesis ───────────────────────────────────────────────────────

    fn report(insights: &[&str], actions: &[(&str, &str, u32)]) -> PerspectiveReport {
        PerspectiveReport {
            insights: insights.iter().map(|s| s.to_string()).collect(),
            actions: actions
                .iter()
                .map(|(title, owner, due)| ActionItem {
                    title: title.to_string(),
                    owner: owner.to_string(),
                    due_in_days: *due,
                })
                .collect(),
        }
    }

    #[test]
    fn test_synthesize_keeps_insight_order() {
        let reports = vec![report(&["a", "b"], &[]), report(&["c"], &[])];
        let draft = synthesize("p", &reports);
        assert_eq!(draft.insights, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_synthesize_dedups_actions_first_wins() {
        let reports = vec![
            report(&[], &[("Verify", "Safety", 7), ("Build", "Build", 3)]),
            report(&[], &[("Verify", "Safety", 14), ("Verify", "Research", 2)]),
        ];
        let draft = synthesize("p", &reports);

        assert_eq!(draft.actions.len(), 3);
        // First occurrence of (Verify, Safety) wins, keeping due_in_days 7
        assert_eq!(draft.actions[0].due_in_days, 7);
        // Same title under a different owner is a distinct action
        assert_eq!(draft.actions[2].owner, "Research");
    }

    #[test]
    fn test_synthesize_timeline_from_latest_action() {
        let reports = vec![report(&["i"], &[("a", "x", 3), ("b", "y", 9), ("c", "z", 5)])];
        let draft = synthesize("p", &reports);
        assert_eq!(draft.decision.timeline, "First checkpoint in 9 days.");
    }

    #[test]
    fn test_synthesize_without_actions() {
        let reports = vec![report(&["only insight"], &[])];
        let draft = synthesize("p", &reports);
        assert_eq!(draft.decision.timeline, "No scheduled actions.");
        assert!(draft.decision.summary.contains("1 insights"));
    }

    // Evaluator failure handling through the full pipeline

    struct ExplodingPerspective;

    #[async_trait]
    impl Perspective for ExplodingPerspective {
        fn name(&self) -> &str {
            "exploding"
        }

        async fn evaluate(
            &self,
            _problem: &str,
            _ctx: &AnalysisContext,
        ) -> Result<PerspectiveReport, Box<dyn std::error::Error + Send + Sync>> {
            Err("evaluator blew up".into())
        }
    }

    #[tokio::test]
    async fn test_failing_evaluator_yields_diagnostic_record() {
        let mut perspectives = PerspectiveSet::new(Duration::from_secs(5));
        perspectives.register(Arc::new(ExplodingPerspective));
        perspectives.register(Arc::new(crate::perspective::ResearchPerspective));

        let pipeline = AnalysisPipeline::new(
            Arc::new(HistoryStore::new()),
            Arc::new(KnowledgeStore::new()),
            perspectives,
        );

        let record = pipeline.analyze("risky problem").await.unwrap();

        // The failure is an insight, not an error
        assert!(record
            .insights
            .iter()
            .any(|i| i.contains("exploding perspective unavailable")));
        // The healthy evaluator still contributed
        assert!(record.insights.iter().any(|i| i.contains("risky problem")));
        assert_eq!(pipeline.history.len(), 1);
    }
}
