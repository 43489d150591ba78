//! Patent search pipeline: lookup, WO discovery, family conversion,
//! office search and merge

pub mod pipeline;
pub mod queries;
pub mod types;

pub use pipeline::SearchOrchestrator;
pub use types::{
    MoleculeInfo, OrchestratorSettings, PatentOrigin, PatentRecord, PatentSearchReport,
    PatentSearchRequest, PhaseSummary,
};
