//! Core data model for URL-based rescoring of document-alignment candidates.
//!
//! This crate defines the types shared by the loader and the rescorer:
//! - `DocumentMap`: dense id -> normalized URL arena, built once per run
//! - `IndexRecord`: one reverse-index line (source id plus candidates)
//! - `Candidate`: a single `id:score[:...]` annotation
//! - `RecordError`: lookup and format failures while reading records

use thiserror::Error;

/// Document identifier, assigned 1-based in URL-source read order.
pub type DocumentId = u64;

/// Errors raised while interpreting an index record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The id is not a key of the document map.
    #[error("Document {0} not found in URL map")]
    UnknownDocument(DocumentId),

    /// The field does not start with an unsigned 64-bit integer id.
    ///
    /// Negative and out-of-range ids land here rather than in
    /// `UnknownDocument`, since no map can hold them.
    #[error("Invalid document id: {0:?}")]
    InvalidId(String),
}

/// Mapping from document id to normalized URL.
///
/// Ids are dense and contiguous, so the map is a plain vector indexed by
/// `id - 1`. Empty URLs are valid entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMap {
    urls: Vec<String>,
}

impl DocumentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a URL and return the id assigned to it.
    pub fn push(&mut self, url: impl Into<String>) -> DocumentId {
        self.urls.push(url.into());
        self.urls.len() as DocumentId
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Get the URL for an id, if present.
    pub fn get(&self, id: DocumentId) -> Option<&str> {
        let index = id.checked_sub(1)?;
        let index = usize::try_from(index).ok()?;
        self.urls.get(index).map(String::as_str)
    }

    /// Get the URL for an id, failing when the id is unknown.
    pub fn lookup(&self, id: DocumentId) -> Result<&str, RecordError> {
        self.get(id).ok_or(RecordError::UnknownDocument(id))
    }

    /// Iterate `(id, url)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (DocumentId, &str)> + '_ {
        self.urls
            .iter()
            .enumerate()
            .map(|(i, url)| (i as DocumentId + 1, url.as_str()))
    }
}

impl FromIterator<String> for DocumentMap {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

/// A candidate annotation from a reverse-index record.
///
/// Only the leading id is interpreted; the rest of the field is carried
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// The field exactly as read
    pub raw: &'a str,
    /// Target document id (text before the first `:`)
    pub id: DocumentId,
}

impl<'a> Candidate<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, RecordError> {
        let id_text = raw.split(':').next().unwrap_or(raw);
        Ok(Self {
            raw,
            id: parse_id(id_text)?,
        })
    }

    /// The original field with one more `:`-separated distance appended.
    pub fn annotate(&self, distance: f64) -> String {
        format!("{}:{}", self.raw, format_distance(distance))
    }
}

/// One reverse-index line: a source document and its ranked candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord<'a> {
    /// The source id field as read
    pub source: &'a str,
    pub source_id: DocumentId,
    /// Candidates in their original order
    pub candidates: Vec<Candidate<'a>>,
}

impl<'a> IndexRecord<'a> {
    /// Parse a tab-separated record.
    ///
    /// Returns `Ok(None)` for records without candidates, which are not
    /// emitted downstream. Surrounding whitespace of the line is ignored.
    pub fn parse(line: &'a str) -> Result<Option<Self>, RecordError> {
        let mut fields = line.trim().split('\t');
        let source = fields.next().unwrap_or_default();
        let rest: Vec<&'a str> = fields.collect();
        if rest.is_empty() {
            return Ok(None);
        }

        let source_id = parse_id(source)?;
        let candidates = rest
            .into_iter()
            .map(Candidate::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            source,
            source_id,
            candidates,
        }))
    }
}

fn parse_id(text: &str) -> Result<DocumentId, RecordError> {
    text.trim()
        .parse()
        .map_err(|_| RecordError::InvalidId(text.to_string()))
}

/// Render a distance the way the downstream tooling expects.
///
/// Shortest round-trip decimal with a fractional part (`0.0`, `0.125`).
/// Values under `1e-4` switch to exponent notation with a signed two-digit
/// exponent (`5e-05`).
pub fn format_distance(value: f64) -> String {
    if value != 0.0 && value.abs() < 1e-4 {
        let rendered = format!("{:e}", value);
        return match rendered.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => rendered,
        };
    }
    format!("{:?}", value)
}
