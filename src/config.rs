use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Unique coordinator identifier
    #[serde(default = "default_coordinator_id")]
    pub coordinator_id: String,

    /// Module dispatch configuration
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Analysis pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Built-in perspective toggles
    #[serde(default)]
    pub perspectives: PerspectivesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Budget for one module run; a module exceeding it is marked failed
    #[serde(default = "default_module_timeout")]
    pub module_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Budget for one perspective evaluator within an analysis
    #[serde(default = "default_evaluator_timeout")]
    pub evaluator_timeout_secs: u64,

    /// Maximum history records; 0 means unbounded
    #[serde(default)]
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerspectivesConfig {
    #[serde(default)]
    pub scenario: Option<PerspectiveToggle>,
    #[serde(default)]
    pub feasibility: Option<PerspectiveToggle>,
    #[serde(default)]
    pub research: Option<PerspectiveToggle>,
}

/// Per-perspective settings; an absent section means enabled with defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerspectiveToggle {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub floor: Option<f64>,
}

fn default_coordinator_id() -> String {
    "maestro-0".to_string()
}

fn default_module_timeout() -> u64 {
    30
}

fn default_evaluator_timeout() -> u64 {
    10
}

fn default_enabled() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            module_timeout_secs: default_module_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            evaluator_timeout_secs: default_evaluator_timeout(),
            history_capacity: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator_id: default_coordinator_id(),
            orchestrator: OrchestratorConfig::default(),
            pipeline: PipelineConfig::default(),
            perspectives: PerspectivesConfig::default(),
        }
    }
}

impl PerspectivesConfig {
    pub fn scenario_enabled(&self) -> bool {
        self.scenario.as_ref().map(|t| t.enabled).unwrap_or(true)
    }

    pub fn feasibility_enabled(&self) -> bool {
        self.feasibility.as_ref().map(|t| t.enabled).unwrap_or(true)
    }

    pub fn research_enabled(&self) -> bool {
        self.research.as_ref().map(|t| t.enabled).unwrap_or(true)
    }

    /// Configured acceptance floor, clamped to [0, 1]. A non-finite value
    /// would make every score comparison false, so it falls back to the
    /// default instead.
    pub fn feasibility_floor(&self) -> f64 {
        match self.feasibility.as_ref().and_then(|t| t.floor) {
            Some(floor) if floor.is_finite() => floor.clamp(0.0, 1.0),
            _ => crate::perspective::DEFAULT_FEASIBILITY_FLOOR,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(coordinator_id = %config.coordinator_id, "configuration loaded");
        Ok(config)
    }

    pub fn module_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestrator.module_timeout_secs)
    }

    pub fn evaluator_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.evaluator_timeout_secs)
    }

    /// History bound from config; 0 maps to unbounded.
    pub fn history_capacity(&self) -> Option<usize> {
        match self.pipeline.history_capacity {
            0 => None,
            n => Some(n),
        }
    }
}
