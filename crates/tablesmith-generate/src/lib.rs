//! Multi-table synthetic data generation for tablesmith.
//!
//! This crate turns parsed [`tablesmith_core::TableSpec`]s into datasets,
//! generating parent tables first and sampling foreign-key values from the
//! rows already produced, then hands every dataset to an output sink.

pub mod engine;
pub mod errors;
pub mod faker;
pub mod generators;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod registry;

pub use engine::{TableOutput, generate_table};
pub use errors::{GenerationError, MissingParentData, MissingParentReason, OutputFormatError};
pub use faker::{FakerProvider, ValueProvider};
pub use generators::{GeneratedValue, synthesize};
pub use model::{DateFormat, GenerationContext, GenerationIssue, GenerationReport, TableReport};
pub use output::{DatasetSink, FileSink, NullSink, OutputFormat};
pub use pipeline::{
    GenerationPipeline, PipelineOutcome, SchemaSource, discover_schema_files, load_tables,
};
pub use registry::{DataRegistry, Dataset, ParentColumn, Row};
