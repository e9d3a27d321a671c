use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod dashboard;
pub mod innovation;
pub mod registry;
pub mod simulation;

pub use registry::{ModuleRegistry, RegistryError};

/// Capability trait every orchestrated module implements.
///
/// `run` is the single entrypoint the registry dispatches. Failure is normal:
/// a module returns its error, the registry records it on the descriptor and
/// reports it in the outcome instead of propagating it.
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Stable module name used for registration and dispatch.
    fn name(&self) -> &str;

    /// Execute one unit of the module's work.
    async fn run(&mut self) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// Functional area a module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleRole {
    Simulation,
    Innovation,
    Dashboard,
    Other,
}

/// Lifecycle state of a module as tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Unregistered,
    Loaded,
    Running,
    Idle,
    Failed,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unregistered => write!(f, "unregistered"),
            Self::Loaded => write!(f, "loaded"),
            Self::Running => write!(f, "running"),
            Self::Idle => write!(f, "idle"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Registry-side view of one registered module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub role: ModuleRole,
    pub state: ModuleState,
    pub last_error: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Result of dispatching one module, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModuleOutcome {
    /// The module ran to completion and returned a payload.
    Idle { output: Value },
    /// The module returned an error or exceeded its time budget.
    Failed { reason: String },
    /// No module is registered under the requested name.
    NotLoaded,
}

impl ModuleOutcome {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of one module within a dispatch sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRunResult {
    pub module: String,
    pub outcome: ModuleOutcome,
}

/// Aggregate result of a dispatch sweep, in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<ModuleRunResult>,
}

impl RunReport {
    /// Outcome for a given module name, if it took part in the sweep.
    pub fn outcome_for(&self, module: &str) -> Option<&ModuleOutcome> {
        self.results
            .iter()
            .find(|r| r.module == module)
            .map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_idle()).count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_failed())
            .count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_module_state_display() {
        assert_eq!(ModuleState::Unregistered.to_string(), "unregistered");
        assert_eq!(ModuleState::Running.to_string(), "running");
        assert_eq!(ModuleState::Failed.to_string(), "failed");
    }

    #[test]
    fn test_outcome_predicates() {
        let idle = ModuleOutcome::Idle {
            output: json!({"ok": true}),
        };
        let failed = ModuleOutcome::Failed {
            reason: "boom".to_string(),
        };

        assert!(idle.is_idle());
        assert!(!idle.is_failed());
        assert!(failed.is_failed());
        assert!(!ModuleOutcome::NotLoaded.is_idle());
        assert!(!ModuleOutcome::NotLoaded.is_failed());
    }

    #[test]
    fn test_outcome_serialization_tags() {
        let failed = ModuleOutcome::Failed {
            reason: "timed out".to_string(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "timed out");

        let not_loaded = serde_json::to_value(ModuleOutcome::NotLoaded).unwrap();
        assert_eq!(not_loaded["outcome"], "not_loaded");
    }

    #[test]
    fn test_run_report_counts_and_lookup() {
        let report = RunReport {
            results: vec![
                ModuleRunResult {
                    module: "sim".to_string(),
                    outcome: ModuleOutcome::Idle { output: json!({}) },
                },
                ModuleRunResult {
                    module: "research".to_string(),
                    outcome: ModuleOutcome::Failed {
                        reason: "bad input".to_string(),
                    },
                },
            ],
        };

        assert_eq!(report.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.outcome_for("sim").unwrap().is_idle());
        assert!(report.outcome_for("absent").is_none());
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport::default();
        assert!(report.is_empty());
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 0);
    }
}
