//! High-throughput ingestion pipeline

mod pipeline;
mod validate;

pub use pipeline::{
    BatchLogResult, CreateLogRequest, IngestionPipeline, LogIngestionResult, LogRejection,
};
pub use validate::ValidationIssue;
