pub mod cancel;
pub mod correlation;
pub mod enrichment;
pub mod ingest;
pub mod pipeline;
pub mod pool;
pub mod providers;
pub mod retry;
pub mod similarity;
pub mod text;

pub use cancel::CancellationToken;
pub use enrichment::{EnrichReport, Enricher, SourceOutcome};
pub use pipeline::Pipeline;
