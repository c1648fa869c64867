//! Email Domain Stats - Streaming distinct customer counts per email domain
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain types and aggregation separated from input and output concerns
//! - Callers supply any reader, any writer and a diagnostic sink
//! - One streaming pass with memory bounded by distinct (domain, customer) pairs

pub mod aggregator;
pub mod config;
pub mod domain;
pub mod parser;
pub mod pipeline;
pub mod report;

// Re-export main types for convenient access
pub use domain::records::{
    EmailError, EmailParts, MalformedRecord, RecordIssue, ResultRow, RunSummary, SkipReason,
    StatsError, StatsResult,
};

pub use config::{ConfigBuilder, EmailColumn, InputConfig, OutputConfig, StatsConfig};

pub use aggregator::DomainRegister;

pub use parser::{split_email, LineRecord, RecordOutcome, RecordSource};

pub use pipeline::{CollectingSink, DiagnosticSink, Pipeline, PipelineState, TracingSink};

pub use report::{domain_order, OutputFormat, ReportFormatter};

use std::io::{Read, Write};
use std::path::Path;

/// Main entry point for processing customer exports
#[derive(Debug, Clone)]
pub struct StatsProcessor {
    pipeline: Pipeline,
}

impl StatsProcessor {
    /// Create a processor with the given configuration
    pub fn new_with_config(config: StatsConfig) -> StatsResult<Self> {
        Ok(Self {
            pipeline: Pipeline::new(config)?,
        })
    }

    /// Create a processor with default configuration
    pub fn new() -> StatsResult<Self> {
        Self::new_with_config(StatsConfig::default())
    }

    /// Create a processor loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> StatsResult<Self> {
        let config = StatsConfig::load_from_file(path)?;
        Self::new_with_config(config)
    }

    pub fn config(&self) -> &StatsConfig {
        self.pipeline.config()
    }

    /// Process `input` and write results to `output`, logging skipped records
    pub fn process<R: Read, W: Write>(&self, input: R, output: W) -> StatsResult<RunSummary> {
        self.pipeline.run(input, output, &mut TracingSink)
    }

    /// Process `input` and write results to `output`, reporting skipped records to `sink`
    pub fn process_with_sink<R, W, S>(
        &self,
        input: R,
        output: W,
        sink: &mut S,
    ) -> StatsResult<RunSummary>
    where
        R: Read,
        W: Write,
        S: DiagnosticSink + ?Sized,
    {
        self.pipeline.run(input, output, sink)
    }

    /// Aggregate `input` and return ordered rows instead of writing them
    pub fn collect_rows<R: Read, S: DiagnosticSink + ?Sized>(
        &self,
        input: R,
        sink: &mut S,
    ) -> StatsResult<(Vec<ResultRow>, RunSummary)> {
        let (register, summary) = self.pipeline.aggregate(input, sink)?;
        let formatter = ReportFormatter::new(self.config().delimiter_byte());
        Ok((formatter.render(&register), summary))
    }
}

/// Convenience function: process a standard customer export with default settings
pub fn process_data<R: Read, W: Write>(input: R, output: W) -> StatsResult<RunSummary> {
    StatsProcessor::new()?.process(input, output)
}
