//! Workflow progress reporting.
//!
//! Reports what the report workflow is doing (searching, fetching,
//! extracting, summarizing each section) so long completion calls are not
//! silent. Progress is emitted on **stderr** so stdout stays clean for the
//! Markdown report itself.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    Searching { company: String },
    Fetching { url: String },
    Extracting { bytes: u64 },
    /// Section `n` of `total` (1-based) is being summarized.
    Summarizing { label: String, n: u64, total: u64 },
    Assembled { chars: u64 },
    /// The report was appended to the log as entry `index`.
    Logged { index: u64 },
}

/// Reports workflow progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "ddr  summarizing  2 / 4  財務要約".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Searching { company } => format!("ddr  searching  {}\n", company),
            ProgressEvent::Fetching { url } => format!("ddr  fetching  {}\n", url),
            ProgressEvent::Extracting { bytes } => {
                format!("ddr  extracting  {} bytes\n", format_number(*bytes))
            }
            ProgressEvent::Summarizing { label, n, total } => {
                format!("ddr  summarizing  {} / {}  {}\n", n, total, label)
            }
            ProgressEvent::Assembled { chars } => {
                format!("ddr  assembled  {} chars\n", format_number(*chars))
            }
            ProgressEvent::Logged { index } => format!("ddr  logged  #{}\n", index),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &ProgressEvent) -> serde_json::Value {
        match event {
            ProgressEvent::Searching { company } => serde_json::json!({
                "event": "progress",
                "phase": "searching",
                "company": company
            }),
            ProgressEvent::Fetching { url } => serde_json::json!({
                "event": "progress",
                "phase": "fetching",
                "url": url
            }),
            ProgressEvent::Extracting { bytes } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "bytes": bytes
            }),
            ProgressEvent::Summarizing { label, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "summarizing",
                "section": label,
                "n": n,
                "total": total
            }),
            ProgressEvent::Assembled { chars } => serde_json::json!({
                "event": "progress",
                "phase": "assembled",
                "chars": chars
            }),
            ProgressEvent::Logged { index } => serde_json::json!({
                "event": "progress",
                "phase": "logged",
                "index": index
            }),
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
