//! Rescoring of reverse-index candidates by URL similarity.
//!
//! Each record keeps its source id and candidate order; every candidate gets
//! the normalized edit distance between its URL and the source URL appended
//! as one more `:`-separated field. Records without candidates are dropped.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use urlrescore_features::normalized_distance;
use urlrescore_model::{DocumentMap, IndexRecord, RecordError};

pub use urlrescore_model::format_distance;

/// Errors that abort a rescoring run.
#[derive(Debug, Error)]
pub enum RescoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Bad record at line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },
}

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RescoreStats {
    /// Input lines read
    pub records_read: usize,
    /// Lines written
    pub records_emitted: usize,
    /// Lines dropped for having no candidates
    pub records_skipped: usize,
    /// Candidates annotated with a distance
    pub candidates_scored: usize,
}

/// Rescore a single index line.
///
/// Returns `Ok(None)` when the record has no candidates. The returned line
/// carries no trailing newline.
pub fn rescore_line(documents: &DocumentMap, line: &str) -> Result<Option<String>, RecordError> {
    let Some(record) = IndexRecord::parse(line)? else {
        return Ok(None);
    };
    Ok(Some(rescore_record(documents, &record)?))
}

fn rescore_record(documents: &DocumentMap, record: &IndexRecord<'_>) -> Result<String, RecordError> {
    let url_doc = documents.lookup(record.source_id)?;

    let mut fields = Vec::with_capacity(record.candidates.len() + 1);
    fields.push(record.source.to_string());
    for candidate in &record.candidates {
        let url_candidate = documents.lookup(candidate.id)?;
        fields.push(candidate.annotate(normalized_distance(url_doc, url_candidate)));
    }

    Ok(fields.join("\t"))
}

/// Streaming rescorer over a loaded document map.
pub struct Rescorer<'a> {
    documents: &'a DocumentMap,
}

impl<'a> Rescorer<'a> {
    pub fn new(documents: &'a DocumentMap) -> Self {
        Self { documents }
    }

    /// Rescore every record of `input` into `output`, one line at a time.
    ///
    /// Stops at the first bad record. Lines written before the failure are
    /// left in `output`.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<RescoreStats, RescoreError> {
        let mut stats = RescoreStats::default();

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let line_no = index + 1;
            stats.records_read += 1;

            let record = IndexRecord::parse(&line)
                .map_err(|source| RescoreError::Record { line: line_no, source })?;
            let Some(record) = record else {
                debug!(line = line_no, "skipping record without candidates");
                stats.records_skipped += 1;
                continue;
            };

            let rescored = rescore_record(self.documents, &record)
                .map_err(|source| RescoreError::Record { line: line_no, source })?;
            writeln!(output, "{}", rescored)?;
            stats.records_emitted += 1;
            stats.candidates_scored += record.candidates.len();
        }

        output.flush()?;
        info!(
            read = stats.records_read,
            emitted = stats.records_emitted,
            skipped = stats.records_skipped,
            candidates = stats.candidates_scored,
            "rescoring complete"
        );
        Ok(stats)
    }
}
