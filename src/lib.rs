pub mod config;
pub mod history;
pub mod knowledge;
pub mod modules;
pub mod orchestrator;
pub mod perspective;
pub mod pipeline;

pub use history::{AnalysisRecord, HistoryStore, StorageError};
pub use knowledge::KnowledgeStore;
pub use modules::{ModuleOutcome, ModuleRegistry, ModuleRole, ModuleState, Runnable};
pub use orchestrator::{HealthReport, Orchestrator};
pub use pipeline::{AnalysisError, AnalysisPipeline};
