//! Combine up to five tabular datasets by union, sequential join or pivot,
//! within row and cell guardrails.

pub mod cli;
pub mod combine;
pub mod config;
pub mod dataset;
pub mod error;
pub mod error_display;
mod excel;
pub mod export;
pub mod guardrail;
pub mod ingest;
pub mod session;
pub mod transfer;
pub mod validate;

pub use cli::{Args, CompressionFormat, FileFormat};
pub use combine::{
    Aggregation, Combined, JoinHow, JoinSpec, JoinStep, Operation, OperationKind, PivotSpec,
    Provenance,
};
pub use config::{AppConfig, ConfigManager};
pub use dataset::{ColumnKind, Dataset, DatasetSummary};
pub use error::{CombineError, IngestError, SizeWarning, ValidationError};
pub use export::{export_dataset, ExportFormat, ExportOptions};
pub use guardrail::Limits;
pub use ingest::ReadOptions;
pub use session::Session;
pub use transfer::{LocalTransfer, TransferError, TransferService, Transferred};

/// Application name used for config and data directories
pub const APP_NAME: &str = "datablend";
