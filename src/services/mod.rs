pub mod analysis;
pub mod enrichment;
pub mod llm;
pub mod profile;
pub mod recommendations;
pub mod similarity;

pub use analysis::{AnalysisOutcome, AnalysisReport, BookAnalysisOrchestrator};
pub use enrichment::EnrichmentCache;
pub use recommendations::RecommendationEngine;
