//! Error taxonomy for the report workflow.
//!
//! Every user action converts its failure into one of these variants at the
//! action boundary; the CLI prints the message and keeps going (or exits
//! non-zero for one-shot commands). Nothing here is retried automatically.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No usable document source or company name, or a malformed argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The web search returned nothing that looks like a PDF.
    #[error("no PDF candidates found for '{company}'")]
    NoCandidatesFound { company: String },

    /// The search collaborator itself failed (network, quota, bad key).
    #[error("web search failed: {0}")]
    SearchFailure(String),

    #[error("download failed for {url}: {reason}")]
    DownloadFailure { url: String, reason: String },

    #[error("document could not be parsed: {0}")]
    UnparseableDocument(String),

    #[error("summarization failed: {0}")]
    SummarizationFailure(String),

    /// The action is not allowed from the session's current state.
    #[error("cannot {action} while session is {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("report log I/O error: {0}")]
    ReportLog(#[from] std::io::Error),

    /// A report whose text would break the log's record framing.
    #[error("report cannot be logged: {0}")]
    CorruptRecord(String),
}

pub type Result<T> = std::result::Result<T, Error>;
