use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::{
    ModuleDescriptor, ModuleOutcome, ModuleRole, ModuleRunResult, ModuleState, RunReport, Runnable,
};

/// Errors from module registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("module name must not be empty")]
    EmptyName,
}

/// Registry that tracks named modules and their lifecycle state.
///
/// One slot per distinct module name. Loading an already-registered name
/// replaces the module in place: the descriptor resets to `Loaded`, any prior
/// failure is cleared, and the original registration position is kept.
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn Runnable>>,
    descriptors: HashMap<String, ModuleDescriptor>,
    order: Vec<String>,
    run_timeout: Duration,
}

impl ModuleRegistry {
    /// Create an empty registry. Each dispatched run is cut off after
    /// `run_timeout` and reported as a failure.
    pub fn new(run_timeout: Duration) -> Self {
        Self {
            modules: HashMap::new(),
            descriptors: HashMap::new(),
            order: Vec::new(),
            run_timeout,
        }
    }

    /// Register a module under its declared role, or replace the module
    /// already registered under the same name.
    pub fn load(
        &mut self,
        role: ModuleRole,
        module: Box<dyn Runnable>,
    ) -> Result<(), RegistryError> {
        let name = module.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let replaced = self.modules.insert(name.clone(), module).is_some();
        if !replaced {
            self.order.push(name.clone());
        }
        self.descriptors.insert(
            name.clone(),
            ModuleDescriptor {
                name: name.clone(),
                role,
                state: ModuleState::Loaded,
                last_error: None,
                loaded_at: Utc::now(),
                last_run_at: None,
            },
        );

        if replaced {
            info!(module = %name, role = ?role, "module reloaded");
        } else {
            info!(module = %name, role = ?role, "module loaded");
        }
        Ok(())
    }

    /// Dispatch one module by name. Unknown names yield `NotLoaded`; module
    /// errors and timeouts yield `Failed` and are recorded on the descriptor.
    /// This never propagates a module's own error.
    pub async fn run(&mut self, name: &str) -> ModuleOutcome {
        if !self.modules.contains_key(name) {
            warn!(module = %name, "module not loaded");
            return ModuleOutcome::NotLoaded;
        }

        if let Some(descriptor) = self.descriptors.get_mut(name) {
            descriptor.state = ModuleState::Running;
        }
        info!(module = %name, "running module");

        let outcome = match self.modules.get_mut(name) {
            Some(module) => match tokio::time::timeout(self.run_timeout, module.run()).await {
                Ok(Ok(output)) => ModuleOutcome::Idle { output },
                Ok(Err(e)) => ModuleOutcome::Failed {
                    reason: e.to_string(),
                },
                Err(_) => ModuleOutcome::Failed {
                    reason: format!("timed out after {:?}", self.run_timeout),
                },
            },
            None => ModuleOutcome::NotLoaded,
        };

        if let Some(descriptor) = self.descriptors.get_mut(name) {
            descriptor.last_run_at = Some(Utc::now());
            match &outcome {
                ModuleOutcome::Idle { .. } => {
                    descriptor.state = ModuleState::Idle;
                    descriptor.last_error = None;
                    info!(module = %name, "module run complete");
                }
                ModuleOutcome::Failed { reason } => {
                    descriptor.state = ModuleState::Failed;
                    descriptor.last_error = Some(reason.clone());
                    warn!(module = %name, error = %reason, "module run failed");
                }
                ModuleOutcome::NotLoaded => {}
            }
        }

        outcome
    }

    /// Dispatch every registered module in registration order, collecting
    /// per-module outcomes. One module's failure never aborts the sweep.
    pub async fn run_all(&mut self) -> RunReport {
        let names = self.order.clone();
        let mut report = RunReport::default();
        for name in names {
            let outcome = self.run(&name).await;
            report.results.push(ModuleRunResult {
                module: name,
                outcome,
            });
        }
        report
    }

    /// Remove a module's registration. Returns whether anything was removed;
    /// unloading an unknown name is not an error.
    pub fn unload(&mut self, name: &str) -> bool {
        let existed = self.modules.remove(name).is_some();
        self.descriptors.remove(name);
        self.order.retain(|n| n != name);
        if existed {
            info!(module = %name, "module unloaded");
        }
        existed
    }

    /// Lifecycle state for a name; `Unregistered` when unknown.
    pub fn state(&self, name: &str) -> ModuleState {
        self.descriptors
            .get(name)
            .map(|d| d.state)
            .unwrap_or(ModuleState::Unregistered)
    }

    /// Descriptor snapshot for a name, if registered.
    pub fn descriptor(&self, name: &str) -> Option<ModuleDescriptor> {
        self.descriptors.get(name).cloned()
    }

    /// Descriptor snapshots for every registered module, in registration order.
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.descriptors.get(name).cloned())
            .collect()
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
