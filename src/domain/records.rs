//! Core domain models for customer records, domain counts and run outcomes
//!
//! Architecture: Rich Domain Models - records carry their own classification
//! - EmailParts borrows from the record buffer so valid records never allocate on the hot path
//! - RecordIssue is the event handed to diagnostic sinks when a record is skipped
//! - StatsError is reserved for failures that end the whole run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Customer and domain halves of an email field, borrowed from the source record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailParts<'a> {
    /// Text before the `@` (the local-part), verbatim
    pub customer: &'a str,
    /// Text after the `@`, verbatim
    pub domain: &'a str,
}

/// One line of output: a domain and its number of distinct customers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub domain: String,
    pub distinct_customers: usize,
}

impl ResultRow {
    pub fn new(domain: impl Into<String>, distinct_customers: usize) -> Self {
        Self {
            domain: domain.into(),
            distinct_customers,
        }
    }
}

/// Why an email field could not be split into customer and domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    /// Zero or more than one `@`
    #[error("email is malformed")]
    Malformed,
    /// Nothing before the `@`
    #[error("customer is missing from email")]
    MissingCustomer,
    /// Nothing after the `@`
    #[error("domain is missing from email")]
    MissingDomain,
}

/// Why a line could not be split into fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    /// A `"` inside a field that does not start with one
    #[error("bare \" in non-quoted field at column {column}")]
    BareQuote { column: usize },
    /// Text between a closing `"` and the next delimiter
    #[error("unexpected text after closing quote at column {column}")]
    ExtraneousQuote { column: usize },
    /// Line ended inside a quoted field
    #[error("quoted field starting at column {column} is not terminated")]
    UnterminatedQuote { column: usize },
    /// Field count differs from the header
    #[error("wrong number of fields: expected {expected}, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// Reason a data record was left out of the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// The line could not be read as a delimited record
    #[error("malformed record: {error}")]
    Malformed { error: MalformedRecord },

    /// The record is too short to hold the email column
    #[error("record has {fields} field(s), email column {column} is missing")]
    MissingEmailColumn { fields: usize, column: usize },

    /// The email field failed to split
    #[error("{0}")]
    Email(#[from] EmailError),
}

/// Diagnostic event for one skipped record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordIssue {
    /// 1-based index of the data record, header excluded
    pub record: u64,
    /// 1-based line of the input holding the record
    pub line: u64,
    /// What was wrong with it
    pub reason: SkipReason,
}

impl RecordIssue {
    pub fn new(record: u64, line: u64, reason: SkipReason) -> Self {
        Self { record, line, reason }
    }
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {} (line {}): {}", self.record, self.line, self.reason)
    }
}

/// Counters describing a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Data records read after the header, valid or not
    pub records_read: u64,
    /// Records reported to the diagnostic sink and left out
    pub records_skipped: u64,
    /// Distinct domain keys in the output
    pub domains: usize,
    /// Distinct (domain, customer) pairs across all domains
    pub distinct_customers: usize,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Records that made it into the aggregate
    pub fn records_accepted(&self) -> u64 {
        self.records_read - self.records_skipped
    }

    /// Format summary for display
    pub fn format_display(&self) -> String {
        format!(
            "{} records read, {} skipped, {} domain{}, {} distinct customer{} in {:.1}s",
            self.records_read,
            self.records_skipped,
            self.domains,
            if self.domains == 1 { "" } else { "s" },
            self.distinct_customers,
            if self.distinct_customers == 1 { "" } else { "s" },
            self.elapsed_ms as f64 / 1000.0
        )
    }
}

/// Error types that end a run
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// The input held no records at all, not even a header
    #[error("input is empty: no header row found")]
    MissingHeader,

    /// The header row could not be split into fields
    #[error("error reading header row: {error}")]
    Header { error: MalformedRecord },

    /// The underlying stream failed
    #[error("error reading input: {source}")]
    Read {
        #[from]
        source: std::io::Error,
    },

    /// Output could not be written
    #[error("error writing output: {source}")]
    Write { source: csv::Error },

    /// Configuration file could not be loaded, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The configured email column name is not in the header
    #[error("email column '{name}' not found in header")]
    UnknownColumn { name: String },

    /// Rendering results as JSON failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl StatsError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an output error from any writer failure
    pub fn write(source: impl Into<csv::Error>) -> Self {
        Self::Write {
            source: source.into(),
        }
    }
}

/// Result type for run-level operations
pub type StatsResult<T> = Result<T, StatsError>;
