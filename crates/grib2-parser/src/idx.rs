//! NCEP `.idx` inventory parsing and byte-range resolution.
//!
//! Each line of an inventory describes one message of the sibling archive:
//!
//! ```text
//! 71:38784123:d=2024050112:REFC:entire atmosphere:3 hour fcst:
//! ```
//!
//! Fields are message number (optionally `N.M` for a submessage), byte offset,
//! reference date, variable, level and forecast descriptor.

use std::fmt;

use tracing::warn;

/// One line of an inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub message: u32,
    pub submessage: Option<u32>,
    pub offset: u64,
    pub reference: String,
    pub variable: String,
    pub level: String,
    pub forecast: String,
}

/// Which inventory entry to fetch: exact variable code, optionally narrowed
/// to an exact level description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    pub variable: String,
    pub level: Option<String>,
}

impl FieldSelector {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            level: None,
        }
    }

    pub fn at_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Composite reflectivity over the entire atmosphere.
    pub fn composite_reflectivity() -> Self {
        Self::new("REFC").at_level("entire atmosphere")
    }

    pub fn matches(&self, entry: &IndexEntry) -> bool {
        entry.variable == self.variable
            && self
                .level
                .as_deref()
                .map_or(true, |level| entry.level == level)
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.level {
            Some(level) => write!(f, "{}:{}", self.variable, level),
            None => write!(f, "{}", self.variable),
        }
    }
}

/// Half-open byte span `[start, end)` of an archive.
///
/// `end == None` means "through end of file", which is what the last entry of
/// an inventory resolves to. A bounded range never ends before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    start: u64,
    end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Result<Self, InvalidRange> {
        if end < start {
            return Err(InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end: Some(end),
        })
    }

    pub fn to_end_of_file(start: u64) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive end, `None` for a read through end of file.
    pub fn end(&self) -> Option<u64> {
        self.end
    }

    /// Number of bytes covered, when the end is known.
    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end - self.start)
    }

    /// True for a bounded range that covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Value for an HTTP `Range` header (inclusive last byte).
    pub fn http_header(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end.saturating_sub(1)),
            None => format!("bytes={}-", self.start),
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, EOF)", self.start),
        }
    }
}

/// Parse a complete inventory. Blank lines are skipped.
pub fn parse_index(text: &str) -> Result<Vec<IndexEntry>, IdxError> {
    let mut entries: Vec<IndexEntry> = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let line_no = n + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let entry = parse_line(line).map_err(|reason| IdxError::Malformed {
            line: line_no,
            reason,
        })?;

        if let Some(prev) = entries.last() {
            if entry.offset < prev.offset {
                return Err(IdxError::Malformed {
                    line: line_no,
                    reason: format!(
                        "offset {} goes backwards from {}",
                        entry.offset, prev.offset
                    ),
                });
            }
        }

        entries.push(entry);
    }

    Ok(entries)
}

fn parse_line(line: &str) -> Result<IndexEntry, String> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < 6 {
        return Err(format!("expected at least 6 fields, found {}", fields.len()));
    }

    let (message, submessage) = match fields[0].split_once('.') {
        Some((m, s)) => (m, Some(s)),
        None => (fields[0], None),
    };
    let message = message
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid message number '{}'", fields[0]))?;
    let submessage = submessage
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid message number '{}'", fields[0]))
        })
        .transpose()?;

    let offset = fields[1]
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid byte offset '{}'", fields[1]))?;

    Ok(IndexEntry {
        message,
        submessage,
        offset,
        reference: fields[2].trim().to_string(),
        variable: fields[3].trim().to_string(),
        level: fields[4].trim().to_string(),
        forecast: fields[5].trim().to_string(),
    })
}

/// Byte range of the first entry matching `selector`.
///
/// The end is the next offset strictly greater than the match's, which skips
/// submessages sharing the same offset. A match with no such successor reads
/// to end of file.
pub fn resolve_range(entries: &[IndexEntry], selector: &FieldSelector) -> Result<ByteRange, IdxError> {
    let mut matches = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| selector.matches(entry));

    let (position, entry) = matches.next().ok_or_else(|| IdxError::NotFound {
        selector: selector.to_string(),
    })?;

    let extra = matches.count();
    if extra > 0 {
        warn!(
            selector = %selector,
            extra_matches = extra,
            "Multiple inventory entries match, using the first"
        );
    }

    let end = entries[position + 1..]
        .iter()
        .map(|next| next.offset)
        .find(|&offset| offset > entry.offset);

    Ok(ByteRange {
        start: entry.offset,
        end,
    })
}

/// Maps inventory text to the byte range of one field.
#[derive(Debug, Clone)]
pub struct IndexResolver {
    selector: FieldSelector,
}

impl IndexResolver {
    pub fn new(selector: FieldSelector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &FieldSelector {
        &self.selector
    }

    pub fn resolve(&self, index_text: &str) -> Result<ByteRange, IdxError> {
        let entries = parse_index(index_text)?;
        resolve_range(&entries, &self.selector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Byte range end {end} precedes start {start}")]
pub struct InvalidRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IdxError {
    #[error("Malformed inventory line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("No inventory entry matches {selector}")]
    NotFound { selector: String },
}
