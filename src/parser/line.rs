//! Strict field splitter for one line of delimited text
//!
//! A field is either bare text without any `"`, or wrapped in quotes with embedded
//! quotes doubled. Anything else on the line is reported with its 1-based byte column.

use crate::domain::MalformedRecord;

/// Fields of one line, unescaped into a single reusable buffer
#[derive(Debug, Clone, Default)]
pub struct LineRecord {
    text: String,
    bounds: Vec<(usize, usize)>,
}

impl LineRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `line` on `delimiter`, replacing any fields held from the previous line.
    ///
    /// `line` must not contain its line terminator and `delimiter` must be ASCII.
    pub fn parse(&mut self, line: &str, delimiter: u8) -> Result<(), MalformedRecord> {
        self.text.clear();
        self.bounds.clear();

        let bytes = line.as_bytes();
        let mut pos = 0;
        loop {
            let start = self.text.len();

            if bytes.get(pos) == Some(&b'"') {
                let open = pos;
                pos += 1;
                loop {
                    let Some(offset) = bytes[pos..].iter().position(|&b| b == b'"') else {
                        return Err(MalformedRecord::UnterminatedQuote { column: open + 1 });
                    };
                    self.text.push_str(&line[pos..pos + offset]);
                    pos += offset + 1;
                    if bytes.get(pos) != Some(&b'"') {
                        break;
                    }
                    self.text.push('"');
                    pos += 1;
                }
                self.bounds.push((start, self.text.len()));

                match bytes.get(pos) {
                    None => return Ok(()),
                    Some(&b) if b == delimiter => pos += 1,
                    Some(_) => return Err(MalformedRecord::ExtraneousQuote { column: pos + 1 }),
                }
            } else {
                let end = bytes[pos..]
                    .iter()
                    .position(|&b| b == delimiter)
                    .map_or(bytes.len(), |offset| pos + offset);
                let field = &line[pos..end];
                if let Some(offset) = field.find('"') {
                    return Err(MalformedRecord::BareQuote {
                        column: pos + offset + 1,
                    });
                }
                self.text.push_str(field);
                self.bounds.push((start, self.text.len()));

                if end == bytes.len() {
                    return Ok(());
                }
                pos = end + 1;
            }
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.bounds
            .get(index)
            .map(|&(start, end)| &self.text[start..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.bounds.iter().map(|&(start, end)| &self.text[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(line: &str) -> Result<Vec<String>, MalformedRecord> {
        let mut record = LineRecord::new();
        record.parse(line, b',')?;
        Ok(record.iter().map(str::to_string).collect())
    }

    #[test]
    fn test_plain_fields() {
        assert_eq!(fields("a,b,c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(fields("a,,c,").unwrap(), vec!["a", "", "c", ""]);
        assert_eq!(fields("").unwrap(), vec![""]);
        assert_eq!(fields("\t\tFirstName, x").unwrap(), vec!["\t\tFirstName", " x"]);
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(
            fields("\"Lee, Ann\",\"a\"\"b@x.com\",\"\"").unwrap(),
            vec!["Lee, Ann", "a\"b@x.com", ""]
        );
        assert_eq!(fields("\"\"\"\"").unwrap(), vec!["\""]);
        assert_eq!(fields("\"ünï\",x").unwrap(), vec!["ünï", "x"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            fields("a,b,x@d.com,F,\"1"),
            Err(MalformedRecord::UnterminatedQuote { column: 15 })
        );
        assert_eq!(
            fields("\"a\"\""),
            Err(MalformedRecord::UnterminatedQuote { column: 1 })
        );
    }

    #[test]
    fn test_bare_quote_in_unquoted_field() {
        assert_eq!(
            fields("a,b,o\"ne@d.com,F,1"),
            Err(MalformedRecord::BareQuote { column: 6 })
        );
    }

    #[test]
    fn test_text_after_closing_quote() {
        assert_eq!(
            fields("a,b,\"two@d.com\"x,F,1"),
            Err(MalformedRecord::ExtraneousQuote { column: 16 })
        );
        assert_eq!(
            fields("\"a\" ,b"),
            Err(MalformedRecord::ExtraneousQuote { column: 4 })
        );
    }

    #[test]
    fn test_buffer_is_reused() {
        let mut record = LineRecord::new();
        record.parse("a;\"b;c\"", b';').unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get(1), Some("b;c"));

        record.parse("z", b';').unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get(0), Some("z"));
        assert_eq!(record.get(1), None);

        assert!(record.parse("\"open", b';').is_err());
        record.parse("x;y", b';').unwrap();
        assert_eq!(record.iter().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
