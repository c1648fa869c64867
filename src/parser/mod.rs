//! Record parsing for customer exports
//!
//! Architecture: Infrastructure Adapter - RecordSource turns a byte stream into classified records
//! - One record per physical line, a line that breaks the quoting rules is skipped on its own
//! - The header row is consumed on open, an empty stream never yields a source
//! - Line and field buffers are reused, memory per record stays constant
//! - Each data record comes back as valid email parts or a skip event, stream failures are errors

pub mod email;
pub mod line;

pub use email::split_email;
pub use line::LineRecord;

use crate::config::{EmailColumn, StatsConfig};
use crate::domain::{
    EmailParts, MalformedRecord, RecordIssue, SkipReason, StatsError, StatsResult,
};
use std::io::{BufRead, BufReader, Read};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Classification of one data record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome<'a> {
    /// Email split cleanly, ready for aggregation
    Valid(EmailParts<'a>),
    /// Record left out, with the reason
    Skipped(RecordIssue),
}

/// Pull-based reader of data records from a delimited text stream
pub struct RecordSource<R: Read> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    record: LineRecord,
    delimiter: u8,
    flexible: bool,
    header_fields: usize,
    email_column: usize,
    line: u64,
    records_read: u64,
}

impl<R: Read> RecordSource<R> {
    /// Open a source, reading and discarding the header row.
    ///
    /// Fails with [`StatsError::MissingHeader`] when the stream holds no records and
    /// [`StatsError::Header`] when the first record cannot be split into fields.
    pub fn open(input: R, config: &StatsConfig) -> StatsResult<Self> {
        config.validate()?;

        let mut source = Self {
            reader: BufReader::new(input),
            buffer: Vec::new(),
            record: LineRecord::new(),
            delimiter: config.delimiter_byte(),
            flexible: config.input.flexible,
            header_fields: 0,
            email_column: 0,
            line: 0,
            records_read: 0,
        };

        if !source.read_line()? {
            return Err(StatsError::MissingHeader);
        }
        if source.buffer.starts_with(UTF8_BOM) {
            source.buffer.drain(..UTF8_BOM.len());
        }
        let header = std::str::from_utf8(&source.buffer).map_err(|_| StatsError::Header {
            error: MalformedRecord::InvalidUtf8,
        })?;
        source
            .record
            .parse(header, source.delimiter)
            .map_err(|error| StatsError::Header { error })?;

        source.header_fields = source.record.len();
        source.email_column = resolve_email_column(&config.input.email_column, &source.record)?;
        if source.email_column >= source.header_fields {
            tracing::warn!(
                "Email column {} is beyond the {} header field(s); rows without it will be skipped",
                source.email_column,
                source.header_fields
            );
        }
        tracing::debug!(
            fields = source.header_fields,
            email_column = source.email_column,
            "Header row read"
        );

        Ok(source)
    }

    /// Read and classify the next data record, `None` at end of stream
    pub fn next_record(&mut self) -> StatsResult<Option<RecordOutcome<'_>>> {
        if !self.read_line()? {
            return Ok(None);
        }
        self.records_read += 1;

        let parsed = match std::str::from_utf8(&self.buffer) {
            Ok(text) => self.record.parse(text, self.delimiter),
            Err(_) => Err(MalformedRecord::InvalidUtf8),
        };
        let checked = parsed.and_then(|()| {
            if self.flexible || self.record.len() == self.header_fields {
                Ok(())
            } else {
                Err(MalformedRecord::FieldCount {
                    expected: self.header_fields,
                    found: self.record.len(),
                })
            }
        });

        match checked {
            Ok(()) => Ok(Some(self.classify())),
            Err(error) => Ok(Some(self.skip(SkipReason::Malformed { error }))),
        }
    }

    /// Data records read so far, header excluded
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Resolved 0-based email column
    pub fn email_column(&self) -> usize {
        self.email_column
    }

    /// Fill the line buffer with the next non-empty line, terminator removed
    fn read_line(&mut self) -> StatsResult<bool> {
        loop {
            self.buffer.clear();
            if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line += 1;

            if self.buffer.last() == Some(&b'\n') {
                self.buffer.pop();
                if self.buffer.last() == Some(&b'\r') {
                    self.buffer.pop();
                }
            }
            if !self.buffer.is_empty() {
                return Ok(true);
            }
        }
    }

    fn skip(&self, reason: SkipReason) -> RecordOutcome<'_> {
        RecordOutcome::Skipped(RecordIssue::new(self.records_read, self.line, reason))
    }

    fn classify(&self) -> RecordOutcome<'_> {
        let Some(email) = self.record.get(self.email_column) else {
            return self.skip(SkipReason::MissingEmailColumn {
                fields: self.record.len(),
                column: self.email_column,
            });
        };

        match split_email(email) {
            Ok(parts) => RecordOutcome::Valid(parts),
            Err(e) => self.skip(e.into()),
        }
    }
}

/// Map the configured email column onto a field index of the header
fn resolve_email_column(column: &EmailColumn, header: &LineRecord) -> StatsResult<usize> {
    match column {
        EmailColumn::Index(index) => Ok(*index),
        EmailColumn::Name(name) => header
            .iter()
            .position(|field| field == name)
            .ok_or_else(|| StatsError::UnknownColumn { name: name.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::domain::EmailError;

    const HEADER: &str = "first_name,last_name,email,gender,ip_address\n";

    fn open(input: &str) -> StatsResult<RecordSource<&[u8]>> {
        RecordSource::open(input.as_bytes(), &StatsConfig::default())
    }

    #[test]
    fn test_empty_stream_has_no_header() {
        assert!(matches!(open(""), Err(StatsError::MissingHeader)));
    }

    #[test]
    fn test_header_only() {
        let mut source = open(HEADER).unwrap();
        assert!(source.next_record().unwrap().is_none());
        assert_eq!(source.records_read(), 0);
    }

    #[test]
    fn test_valid_record() {
        let input = format!("{HEADER}Ann,Lee,ann@example.com,F,10.0.0.1\n");
        let mut source = open(&input).unwrap();

        match source.next_record().unwrap() {
            Some(RecordOutcome::Valid(parts)) => {
                assert_eq!(parts.customer, "ann");
                assert_eq!(parts.domain, "example.com");
            }
            other => panic!("expected valid record, got {other:?}"),
        }
        assert!(source.next_record().unwrap().is_none());
        assert_eq!(source.records_read(), 1);
    }

    #[test]
    fn test_quoted_email_field() {
        let input = format!("{HEADER}\"Lee, Ann\",x,\"a\"\"b@example.com\",F,1\n");
        let mut source = open(&input).unwrap();

        match source.next_record().unwrap() {
            Some(RecordOutcome::Valid(parts)) => {
                assert_eq!(parts.customer, "a\"b");
                assert_eq!(parts.domain, "example.com");
            }
            other => panic!("expected valid record, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_email_is_skipped_with_index() {
        let input = format!("{HEADER}a,b,one@d.com,F,1\na,b,nodomain@,F,1\n");
        let mut source = open(&input).unwrap();

        assert!(matches!(source.next_record().unwrap(), Some(RecordOutcome::Valid(_))));
        match source.next_record().unwrap() {
            Some(RecordOutcome::Skipped(issue)) => {
                assert_eq!(issue.record, 2);
                assert_eq!(issue.line, 3);
                assert_eq!(issue.reason, SkipReason::Email(EmailError::MissingDomain));
            }
            other => panic!("expected skipped record, got {other:?}"),
        }
    }

    #[test]
    fn test_short_row_is_malformed_by_default() {
        let input = format!("{HEADER}a,b,one@d.com,F\na,b,two@d.com,F,1\n");
        let mut source = open(&input).unwrap();

        match source.next_record().unwrap() {
            Some(RecordOutcome::Skipped(issue)) => {
                assert_eq!(issue.record, 1);
                assert_eq!(
                    issue.reason,
                    SkipReason::Malformed {
                        error: MalformedRecord::FieldCount { expected: 5, found: 4 }
                    }
                );
            }
            other => panic!("expected skipped record, got {other:?}"),
        }
        // The stream carries on after the bad row
        assert!(matches!(source.next_record().unwrap(), Some(RecordOutcome::Valid(_))));
        assert_eq!(source.records_read(), 2);
    }

    #[test]
    fn test_flexible_short_row_missing_email_column() {
        let config = ConfigBuilder::new().flexible(true).build().unwrap();
        let input = format!("{HEADER}a,b\na,b,one@d.com,F\n");
        let mut source = RecordSource::open(input.as_bytes(), &config).unwrap();

        match source.next_record().unwrap() {
            Some(RecordOutcome::Skipped(issue)) => {
                assert_eq!(
                    issue.reason,
                    SkipReason::MissingEmailColumn { fields: 2, column: 2 }
                );
            }
            other => panic!("expected skipped record, got {other:?}"),
        }
        // Flexible mode keeps rows that still hold the email column
        assert!(matches!(source.next_record().unwrap(), Some(RecordOutcome::Valid(_))));
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let mut input = HEADER.as_bytes().to_vec();
        input.extend_from_slice(b"a,b,\xff@d.com,F,1\na,b,one@d.com,F,1\n");
        let mut source = RecordSource::open(input.as_slice(), &StatsConfig::default()).unwrap();

        assert_eq!(
            source.next_record().unwrap(),
            Some(RecordOutcome::Skipped(RecordIssue::new(
                1,
                2,
                SkipReason::Malformed {
                    error: MalformedRecord::InvalidUtf8
                }
            )))
        );
        assert!(matches!(source.next_record().unwrap(), Some(RecordOutcome::Valid(_))));
    }

    fn expect_skip(outcome: Option<RecordOutcome<'_>>) -> RecordIssue {
        match outcome {
            Some(RecordOutcome::Skipped(issue)) => issue,
            other => panic!("expected skipped record, got {other:?}"),
        }
    }

    fn expect_domain(outcome: Option<RecordOutcome<'_>>) -> String {
        match outcome {
            Some(RecordOutcome::Valid(parts)) => parts.domain.to_string(),
            other => panic!("expected valid record, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_quote_skips_only_its_line() {
        let input = format!("{HEADER}a,b,x@d.com,F,\"1\na,b,y@e.com,F,1\na,b,z@f.com,F,1\n");
        let mut source = open(&input).unwrap();

        let issue = expect_skip(source.next_record().unwrap());
        assert_eq!(issue.record, 1);
        assert_eq!(issue.line, 2);
        assert_eq!(
            issue.reason,
            SkipReason::Malformed {
                error: MalformedRecord::UnterminatedQuote { column: 15 }
            }
        );

        assert_eq!(expect_domain(source.next_record().unwrap()), "e.com");
        assert_eq!(expect_domain(source.next_record().unwrap()), "f.com");
        assert!(source.next_record().unwrap().is_none());
        assert_eq!(source.records_read(), 3);
    }

    #[test]
    fn test_unterminated_quote_on_last_line() {
        let input = format!("{HEADER}a,b,y@e.com,F,1\n\"a,b,z@f.com,F,1");
        let mut source = open(&input).unwrap();

        assert_eq!(expect_domain(source.next_record().unwrap()), "e.com");
        let issue = expect_skip(source.next_record().unwrap());
        assert_eq!((issue.record, issue.line), (2, 3));
        assert_eq!(
            issue.reason,
            SkipReason::Malformed {
                error: MalformedRecord::UnterminatedQuote { column: 1 }
            }
        );
        assert!(source.next_record().unwrap().is_none());
    }

    #[test]
    fn test_stray_quotes_are_malformed() {
        let input = format!("{HEADER}a,b,o\"ne@d.com,F,1\na,b,\"two@d.com\"x,F,1\na,b,three@d.com,F,1\n");
        let mut source = open(&input).unwrap();

        let issue = expect_skip(source.next_record().unwrap());
        assert_eq!(issue.record, 1);
        assert_eq!(
            issue.reason,
            SkipReason::Malformed {
                error: MalformedRecord::BareQuote { column: 6 }
            }
        );

        let issue = expect_skip(source.next_record().unwrap());
        assert_eq!(issue.record, 2);
        assert_eq!(
            issue.reason,
            SkipReason::Malformed {
                error: MalformedRecord::ExtraneousQuote { column: 16 }
            }
        );

        assert_eq!(expect_domain(source.next_record().unwrap()), "d.com");
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let input = "first_name,last_name,email\r\n\r\na,b,one@d.com\r\n\na,b,bad\r\n";
        let mut source = open(input).unwrap();

        assert_eq!(expect_domain(source.next_record().unwrap()), "d.com");
        let issue = expect_skip(source.next_record().unwrap());
        assert_eq!((issue.record, issue.line), (2, 5));
        assert!(source.next_record().unwrap().is_none());
    }

    #[test]
    fn test_malformed_header_is_fatal() {
        let result = open("first_name,\"email\n");
        assert!(matches!(
            result,
            Err(StatsError::Header {
                error: MalformedRecord::UnterminatedQuote { column: 12 }
            })
        ));

        let result = RecordSource::open(&b"name,\xffmail\n"[..], &StatsConfig::default());
        assert!(matches!(
            result,
            Err(StatsError::Header {
                error: MalformedRecord::InvalidUtf8
            })
        ));
    }

    #[test]
    fn test_bom_is_stripped_from_header() {
        let config = ConfigBuilder::new()
            .email_column(EmailColumn::Name("email".to_string()))
            .build()
            .unwrap();
        let input = "\u{feff}email,name\none@d.com,Ann\n";
        let source = RecordSource::open(input.as_bytes(), &config).unwrap();
        assert_eq!(source.email_column(), 0);
    }

    #[test]
    fn test_named_email_column() {
        let config = ConfigBuilder::new()
            .email_column(EmailColumn::Name("mail".to_string()))
            .delimiter(';')
            .build()
            .unwrap();
        let input = "mail;name\none@d.com;Ann\n";
        let mut source = RecordSource::open(input.as_bytes(), &config).unwrap();
        assert_eq!(source.email_column(), 0);
        assert!(matches!(source.next_record().unwrap(), Some(RecordOutcome::Valid(_))));

        let config = ConfigBuilder::new()
            .email_column(EmailColumn::Name("email".to_string()))
            .build()
            .unwrap();
        let result = RecordSource::open("mail,name\n".as_bytes(), &config);
        assert!(matches!(result, Err(StatsError::UnknownColumn { .. })));
    }
}
