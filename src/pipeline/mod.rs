//! Streaming aggregation pipeline
//!
//! Architecture: Domain Services - Pipeline drives records from source to register to output
//! - Single pass, single thread, one record in flight at a time
//! - Skipped records go to an injected DiagnosticSink and never end the run
//! - Only header failures, stream read failures and output failures are returned as errors

use crate::aggregator::DomainRegister;
use crate::config::StatsConfig;
use crate::domain::{RecordIssue, RunSummary, StatsResult};
use crate::parser::{RecordOutcome, RecordSource};
use crate::report::ReportFormatter;
use chrono::Utc;
use std::io::{Read, Write};
use std::time::Instant;

/// Receiver for per-record diagnostics
pub trait DiagnosticSink {
    /// Called once for every skipped record
    fn report(&mut self, issue: &RecordIssue);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&RecordIssue),
{
    fn report(&mut self, issue: &RecordIssue) {
        self(issue)
    }
}

/// Sink that logs each skipped record as a warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, issue: &RecordIssue) {
        tracing::warn!(
            record = issue.record,
            line = issue.line,
            "Skipping record {}: {}",
            issue.record,
            issue.reason
        );
    }
}

/// Sink that keeps every issue in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub issues: Vec<RecordIssue>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, issue: &RecordIssue) {
        self.issues.push(*issue);
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    AwaitingHeader,
    Streaming,
    Drained,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingHeader => "awaiting_header",
            Self::Streaming => "streaming",
            Self::Drained => "drained",
        }
    }
}

/// Drives a record stream through parsing, aggregation and output
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: StatsConfig,
    formatter: ReportFormatter,
}

impl Pipeline {
    /// Create a pipeline for the given configuration, rejecting invalid settings
    pub fn new(config: StatsConfig) -> StatsResult<Self> {
        config.validate()?;
        let formatter = ReportFormatter::new(config.delimiter_byte());
        Ok(Self { config, formatter })
    }

    /// Pipeline for the standard customer export layout
    pub fn with_defaults() -> Self {
        let config = StatsConfig::default();
        let formatter = ReportFormatter::new(config.delimiter_byte());
        Self { config, formatter }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Run the whole pipeline: aggregate `input`, then write ordered results to `output`
    pub fn run<R, W, S>(&self, input: R, output: W, sink: &mut S) -> StatsResult<RunSummary>
    where
        R: Read,
        W: Write,
        S: DiagnosticSink + ?Sized,
    {
        let start_time = Instant::now();
        let (register, mut summary) = self.aggregate(input, sink)?;

        let rows = self
            .formatter
            .write_report(&register, self.config.output.format, output)?;
        tracing::debug!(rows, "Results written");

        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            records = summary.records_read,
            skipped = summary.records_skipped,
            domains = summary.domains,
            "Finished processing input: {} records processed",
            summary.records_read
        );

        Ok(summary)
    }

    /// Aggregate `input` into a register without writing anything
    pub fn aggregate<R, S>(&self, input: R, sink: &mut S) -> StatsResult<(DomainRegister, RunSummary)>
    where
        R: Read,
        S: DiagnosticSink + ?Sized,
    {
        let start_time = Instant::now();
        let mut summary = RunSummary {
            started_at: Utc::now(),
            ..Default::default()
        };
        let mut state = PipelineState::AwaitingHeader;
        tracing::debug!(state = state.as_str(), "Pipeline started");

        let mut source = RecordSource::open(input, &self.config)?;
        let mut register = DomainRegister::new();
        transition(&mut state, PipelineState::Streaming);

        while let Some(outcome) = source.next_record()? {
            match outcome {
                RecordOutcome::Valid(parts) => {
                    register.observe(parts.domain, parts.customer);
                }
                RecordOutcome::Skipped(issue) => {
                    summary.records_skipped += 1;
                    sink.report(&issue);
                }
            }
        }
        transition(&mut state, PipelineState::Drained);

        summary.records_read = source.records_read();
        summary.domains = register.len();
        summary.distinct_customers = register.distinct_pairs();
        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;

        Ok((register, summary))
    }
}

fn transition(state: &mut PipelineState, to: PipelineState) {
    tracing::debug!(from = state.as_str(), to = to.as_str(), "Pipeline state change");
    *state = to;
}
