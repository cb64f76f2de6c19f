pub mod analyzer;
pub mod generator;
pub mod llm_helper;
pub mod planner;
pub mod verifier;

pub use analyzer::AnalyzerPhase;
pub use generator::GeneratorPhase;
pub use planner::{PlannerPhase, PLAN_FILE};
pub use verifier::{VerifierPhase, LOW_CONFIDENCE_THRESHOLD, REPORT_FILE};
