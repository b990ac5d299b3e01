//! Journal entries and their plaintext envelope.
//!
//! An entry is serialized as a small TOML header fenced by `---` lines, followed by the
//! body verbatim:
//!
//! ```text
//! ---
//! created = "2024-03-01T09:15:00.123456789+01:00"
//! last_modified = "2024-03-01T09:15:00.123456789+01:00"
//! ---
//! Dear diary...
//! ```
//!
//! Only the first closing `---` ends the header, so the body may contain anything,
//! including further `---` lines.

use crate::error::{Error, Result};
use chrono::{DateTime, Local, SecondsFormat};
use serde::Deserialize;

/// Line that opens and closes the metadata block
pub const DELIMITER: &str = "---";

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    body: String,
    created: DateTime<Local>,
    last_modified: DateTime<Local>,
}

impl Entry {
    /// New entry, never modified.
    pub fn new(body: impl Into<String>, created: DateTime<Local>) -> Self {
        Self {
            body: body.into(),
            created,
            last_modified: created,
        }
    }

    /// Entry with explicit timestamps. Fails if `last_modified` precedes `created`.
    pub fn with_timestamps(
        body: impl Into<String>,
        created: DateTime<Local>,
        last_modified: DateTime<Local>,
    ) -> Result<Self> {
        if last_modified < created {
            return Err(Error::format(format!(
                "last_modified {} precedes created {}",
                last_modified.to_rfc3339(),
                created.to_rfc3339()
            )));
        }
        Ok(Self {
            body: body.into(),
            created,
            last_modified,
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn created(&self) -> DateTime<Local> {
        self.created
    }

    pub fn last_modified(&self) -> DateTime<Local> {
        self.last_modified
    }
}

#[derive(Deserialize)]
struct Metadata {
    created: DateTime<Local>,
    last_modified: DateTime<Local>,
}

fn timestamp(dt: &DateTime<Local>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Serialize an entry into its envelope.
pub fn encode(entry: &Entry) -> String {
    format!(
        "{delim}\ncreated = \"{}\"\nlast_modified = \"{}\"\n{delim}\n{}",
        timestamp(&entry.created),
        timestamp(&entry.last_modified),
        entry.body,
        delim = DELIMITER,
    )
}

/// Parse an envelope back into an entry.
pub fn decode(text: &str) -> Result<Entry> {
    let mut lines = text.split_inclusive('\n');

    // Byte offset of the body within `text`
    let mut offset = match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => first.len(),
        _ => return Err(Error::format("entry has no metadata block")),
    };

    let mut header = String::new();
    let mut closed = false;
    for line in lines {
        offset += line.len();
        if line.trim_end() == DELIMITER {
            closed = true;
            break;
        }
        header.push_str(line);
    }

    if !closed {
        return Err(Error::format("entry metadata block is not closed"));
    }

    let meta: Metadata = toml::from_str(&header)
        .map_err(|e| Error::format(format!("invalid entry metadata: {}", e)))?;

    Entry::with_timestamps(&text[offset..], meta.created, meta.last_modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000 + secs, 123_456_789).unwrap()
    }

    #[test]
    fn test_roundtrip_bodies() -> Result<()> {
        let bodies = [
            "",
            "a",
            "line one\nline two\n",
            "---\nlooks like a header\n---\n",
            "created = \"not metadata\"\n---",
            "trailing spaces   \n\n\n",
            "windows\r\nline endings\r\n",
        ];

        for body in bodies {
            let entry = Entry::new(body, at(0));
            assert_eq!(decode(&encode(&entry))?, entry, "body {:?}", body);
        }
        Ok(())
    }

    #[test]
    fn test_roundtrip_modified_entry() -> Result<()> {
        let entry = Entry::with_timestamps("edited", at(0), at(3600))?;
        let decoded = decode(&encode(&entry))?;

        assert_eq!(decoded.created(), at(0));
        assert_eq!(decoded.last_modified(), at(3600));
        Ok(())
    }

    #[test]
    fn test_encode_layout() {
        let text = encode(&Entry::new("hello", at(0)));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "---");
        assert!(lines[1].starts_with("created = \""));
        assert!(lines[2].starts_with("last_modified = \""));
        assert_eq!(lines[3], "---");
        assert_eq!(lines[4], "hello");
    }

    #[test]
    fn test_decode_crlf_header() -> Result<()> {
        let entry = Entry::new("body", at(0));
        let text = encode(&entry);
        let (header, body) = text.split_at(text.len() - "body".len());
        let crlf = format!("{}{}", header.replace('\n', "\r\n"), body);

        assert_eq!(decode(&crlf)?, entry);
        Ok(())
    }

    #[test]
    fn test_missing_metadata_block() {
        assert!(matches!(decode("just a body"), Err(Error::Format(_))));
        assert!(matches!(decode(""), Err(Error::Format(_))));
    }

    #[test]
    fn test_unclosed_metadata_block() {
        let text = "---\ncreated = \"2024-01-01T00:00:00+00:00\"\n";
        assert!(matches!(decode(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_unparsable_timestamp() {
        let text = "---\ncreated = \"yesterday\"\nlast_modified = \"today\"\n---\nbody";
        assert!(matches!(decode(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_last_modified_before_created_rejected() {
        let created = at(0);
        let earlier = created - Duration::seconds(1);

        assert!(Entry::with_timestamps("x", created, earlier).is_err());

        let text = format!(
            "---\ncreated = \"{}\"\nlast_modified = \"{}\"\n---\nx",
            created.to_rfc3339(),
            earlier.to_rfc3339()
        );
        assert!(matches!(decode(&text), Err(Error::Format(_))));
    }
}
