use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::history::{AnalysisRecord, HistoryStore};
use crate::knowledge::KnowledgeStore;
use crate::modules::dashboard::DashboardModule;
use crate::modules::innovation::InnovationModule;
use crate::modules::simulation::SimulationModule;
use crate::modules::{
    ModuleDescriptor, ModuleOutcome, ModuleRegistry, ModuleRole, ModuleState, RegistryError,
    RunReport, Runnable,
};
use crate::perspective::{
    FeasibilityPerspective, PerspectiveSet, ResearchPerspective, ScenarioPerspective,
};
use crate::pipeline::{AnalysisError, AnalysisPipeline};

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub modules: Vec<ModuleDescriptor>,
    pub history_len: usize,
    pub fact_count: usize,
    pub healthy: bool,
}

/// Top-level coordinator: owns the module registry, the analysis pipeline,
/// and the two shared stores. The whole surface takes `&self`, so one
/// instance can serve many tasks behind an `Arc`.
pub struct Orchestrator {
    registry: Mutex<ModuleRegistry>,
    pipeline: AnalysisPipeline,
    history: Arc<HistoryStore>,
    knowledge: Arc<KnowledgeStore>,
}

impl Orchestrator {
    /// Build a coordinator with the stock perspectives the config enables.
    pub fn new(config: &Config) -> Self {
        let mut perspectives = PerspectiveSet::new(config.evaluator_timeout());
        if config.perspectives.scenario_enabled() {
            perspectives.register(Arc::new(ScenarioPerspective));
        }
        if config.perspectives.feasibility_enabled() {
            perspectives.register(Arc::new(FeasibilityPerspective::new(
                config.perspectives.feasibility_floor(),
            )));
        }
        if config.perspectives.research_enabled() {
            perspectives.register(Arc::new(ResearchPerspective));
        }
        Self::with_perspectives(config, perspectives)
    }

    /// Build a coordinator around caller-supplied perspectives.
    pub fn with_perspectives(config: &Config, perspectives: PerspectiveSet) -> Self {
        let history = match config.history_capacity() {
            Some(capacity) => Arc::new(HistoryStore::bounded(capacity)),
            None => Arc::new(HistoryStore::new()),
        };
        let knowledge = Arc::new(KnowledgeStore::new());
        let pipeline = AnalysisPipeline::new(
            Arc::clone(&history),
            Arc::clone(&knowledge),
            perspectives,
        );

        info!(
            module_timeout_secs = config.orchestrator.module_timeout_secs,
            evaluator_timeout_secs = config.pipeline.evaluator_timeout_secs,
            "orchestrator initialized"
        );

        Self {
            registry: Mutex::new(ModuleRegistry::new(config.module_timeout())),
            pipeline,
            history,
            knowledge,
        }
    }

    /// Register the built-in simulation, innovation, and dashboard modules,
    /// wired to this coordinator's stores.
    pub async fn load_builtin_modules(&self) -> Result<(), RegistryError> {
        let mut registry = self.registry.lock().await;
        registry.load(
            ModuleRole::Simulation,
            Box::new(SimulationModule::new(Arc::clone(&self.knowledge))),
        )?;
        registry.load(
            ModuleRole::Innovation,
            Box::new(InnovationModule::new(Arc::clone(&self.knowledge))),
        )?;
        registry.load(
            ModuleRole::Dashboard,
            Box::new(DashboardModule::new(
                Arc::clone(&self.history),
                Arc::clone(&self.knowledge),
            )),
        )?;
        Ok(())
    }

    /// Register or replace a module.
    pub async fn load(
        &self,
        role: ModuleRole,
        module: Box<dyn Runnable>,
    ) -> Result<(), RegistryError> {
        self.registry.lock().await.load(role, module)
    }

    /// Remove a module's registration; unknown names are a no-op.
    pub async fn unload(&self, name: &str) -> bool {
        self.registry.lock().await.unload(name)
    }

    /// Dispatch one module by name.
    pub async fn run(&self, name: &str) -> ModuleOutcome {
        self.registry.lock().await.run(name).await
    }

    /// Dispatch every registered module in registration order.
    pub async fn run_all(&self) -> RunReport {
        self.registry.lock().await.run_all().await
    }

    /// Analyze one problem statement through the pipeline.
    pub async fn analyze(&self, problem: &str) -> Result<AnalysisRecord, AnalysisError> {
        self.pipeline.analyze(problem).await
    }

    /// Lifecycle state for a module name; `Unregistered` when unknown.
    pub async fn module_state(&self, name: &str) -> ModuleState {
        self.registry.lock().await.state(name)
    }

    /// Shared handle to the analysis history, for read-only collaborators.
    ///
    /// A record and its derived facts are guaranteed consistent only once
    /// the `analyze` call that produced them has returned; a poller racing
    /// an in-flight analysis may see the appended record an instant before
    /// the facts land.
    pub fn history(&self) -> Arc<HistoryStore> {
        Arc::clone(&self.history)
    }

    /// Shared handle to the fact store, for read-only collaborators. The
    /// same consistency window as [`Orchestrator::history`] applies, and
    /// under concurrent analyses `last_problem` is last-writer-wins, so it
    /// need not match the highest record id.
    pub fn knowledge(&self) -> Arc<KnowledgeStore> {
        Arc::clone(&self.knowledge)
    }

    /// Snapshot of module states and store sizes. `healthy` is false while
    /// any module sits in `Failed`.
    pub async fn health(&self) -> HealthReport {
        let modules = self.registry.lock().await.descriptors();
        let healthy = modules.iter().all(|d| d.state != ModuleState::Failed);
        HealthReport {
            modules,
            history_len: self.history.len(),
            fact_count: self.knowledge.len(),
            healthy,
        }
    }
}
