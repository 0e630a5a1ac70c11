//! Append-only log of assembled reports.
//!
//! One text file; each record is the report's Markdown, a newline, the
//! [`DELIMITER`] line and a final newline. Records are never rewritten or
//! compacted and are addressed only by position.
//!
//! A write that was cut short leaves a fragment with no delimiter. The next
//! append closes it with the [`TORN_MARKER`] line first, so the fragment is
//! skipped on load and never merges into the following record.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const DELIMITER: &str = "<!-- ddr:end-of-report -->";

/// Closes an incomplete record left by an interrupted write.
pub const TORN_MARKER: &str = "<!-- ddr:torn-record -->";

pub struct ReportLog {
    path: PathBuf,
}

impl ReportLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one report in a single write, creating the file and its
    /// parent directories on first use.
    pub fn append(&self, markdown: &str) -> Result<()> {
        if markdown.contains(DELIMITER) || markdown.contains(TORN_MARKER) {
            return Err(Error::CorruptRecord(
                "report text contains a log delimiter".to_string(),
            ));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut record = String::new();
        if has_torn_tail(&mut file)? {
            warn!(path = %self.path.display(), "closing incomplete report log record");
            record.push_str(&format!("\n{}\n", TORN_MARKER));
        }
        record.push_str(&format!("{}\n{}\n", markdown, DELIMITER));
        file.write_all(record.as_bytes())?;
        debug!(path = %self.path.display(), bytes = record.len(), "report appended");
        Ok(())
    }

    /// All records in creation order. A missing file is an empty log.
    pub fn load(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_records(&content))
    }

    pub fn entry(&self, index: usize) -> Result<Option<String>> {
        Ok(self.load()?.into_iter().nth(index))
    }
}

/// True when the file is non-empty and does not end with a full delimiter line.
fn has_torn_tail(file: &mut fs::File) -> std::io::Result<bool> {
    let terminator = format!("\n{}\n", DELIMITER);
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let tail_len = terminator.len() as u64;
    if len < tail_len {
        return Ok(true);
    }
    let mut tail = vec![0u8; terminator.len()];
    file.seek(SeekFrom::Start(len - tail_len))?;
    file.read_exact(&mut tail)?;
    Ok(tail != terminator.as_bytes())
}

fn parse_records(content: &str) -> Vec<String> {
    let terminator = format!("\n{}\n", DELIMITER);
    let torn = format!("\n{}\n", TORN_MARKER);
    let mut records = Vec::new();
    let mut rest = content;
    loop {
        // The previous delimiter line was written without its final newline.
        if let Some(after) = rest.strip_prefix(&torn[1..]) {
            warn!("skipping incomplete report log record");
            rest = after;
            continue;
        }
        let next_record = rest.find(&terminator);
        let next_torn = rest.find(&torn);
        match (next_record, next_torn) {
            (Some(r), Some(t)) if t < r => {
                warn!(bytes = t, "skipping incomplete report log record");
                rest = &rest[t + torn.len()..];
            }
            (Some(r), _) => {
                records.push(rest[..r].to_string());
                rest = &rest[r + terminator.len()..];
            }
            (None, Some(t)) => {
                warn!(bytes = t, "skipping incomplete report log record");
                rest = &rest[t + torn.len()..];
            }
            (None, None) => break,
        }
    }
    if !rest.is_empty() {
        // Torn final write.
        warn!(bytes = rest.len(), "ignoring incomplete trailing report log record");
    }
    records
}
