//! Result rendering with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate the register into external formats
//! - Rows are ordered case-insensitively with an exact-byte tie-break, so output is deterministic
//! - CSV output uses the same quoting dialect as the input, one `domain,count` line per domain
//! - JSON output exposes the same rows for programmatic consumers

use crate::aggregator::DomainRegister;
use crate::domain::{ResultRow, StatsError, StatsResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::Write;

/// Supported output formats for result rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `domain,count` lines, no header
    #[default]
    Csv,
    /// Array of `{"domain": .., "distinct_customers": ..}` objects
    Json,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["csv", "json"]
    }
}

/// Total order on domain strings: ASCII case-insensitive first, then exact bytes.
///
/// Case variants such as `A-domain.com` and `a-domain.com` end up adjacent,
/// upper case first.
pub fn domain_order(a: &str, b: &str) -> Ordering {
    let folded_a = a.bytes().map(|byte| byte.to_ascii_lowercase());
    let folded_b = b.bytes().map(|byte| byte.to_ascii_lowercase());

    folded_a.cmp(folded_b).then_with(|| a.cmp(b))
}

/// Converts a finished register into ordered rows and writes them out
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    delimiter: u8,
}

impl ReportFormatter {
    /// Create a formatter writing CSV with the given field separator
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Ordered rows for every domain in the register
    pub fn render(&self, register: &DomainRegister) -> Vec<ResultRow> {
        let mut rows: Vec<ResultRow> = register
            .snapshot()
            .map(|(domain, count)| ResultRow::new(domain, count))
            .collect();

        rows.sort_unstable_by(|a, b| domain_order(&a.domain, &b.domain));
        rows
    }

    /// Render the register and write it in the requested format
    pub fn write_report<W: Write>(
        &self,
        register: &DomainRegister,
        format: OutputFormat,
        writer: W,
    ) -> StatsResult<usize> {
        let rows = self.render(register);
        self.write_rows(&rows, format, writer)?;
        Ok(rows.len())
    }

    /// Write already ordered rows in the requested format
    pub fn write_rows<W: Write>(
        &self,
        rows: &[ResultRow],
        format: OutputFormat,
        writer: W,
    ) -> StatsResult<()> {
        match format {
            OutputFormat::Csv => self.write_csv(rows, writer),
            OutputFormat::Json => write_json(rows, writer),
        }
    }

    fn write_csv<W: Write>(&self, rows: &[ResultRow], writer: W) -> StatsResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        for row in rows {
            writer
                .serialize(row)
                .map_err(|source| StatsError::Write { source })?;
        }

        writer.flush().map_err(StatsError::write)?;
        Ok(())
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(b',')
    }
}

fn write_json<W: Write>(rows: &[ResultRow], mut writer: W) -> StatsResult<()> {
    serde_json::to_writer_pretty(&mut writer, rows).map_err(|e| {
        if e.is_io() {
            StatsError::write(std::io::Error::from(e))
        } else {
            StatsError::serialization(e.to_string())
        }
    })?;
    writer.write_all(b"\n").map_err(StatsError::write)?;
    writer.flush().map_err(StatsError::write)?;
    Ok(())
}
