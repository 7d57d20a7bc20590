//! Question answering pipeline
//!
//! classify -> retrieve -> filter -> summarize -> log. Only validation and
//! retrieval failures reach the caller; every other step degrades.

mod orchestrator;
pub mod plan;
pub mod retrieval;
pub mod summary;

pub use orchestrator::{
    OrchestratorOptions, QueryOrchestrator, QueryOutcome, MAX_CANDIDATES, MAX_RESULTS, QUESTION_REQUIRED,
};
pub use plan::{RetrievalPlan, TimeScope};
pub use retrieval::RetrievalMode;
