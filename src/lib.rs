//! # DD Report
//!
//! Generates a due-diligence style Markdown report about a company from its
//! investor-relations (IR) PDF.
//!
//! The document is either uploaded directly or located through a web search
//! and fetched over HTTP. Its text is extracted page by page, summarized per
//! section by a text-completion model, assembled into Markdown, and appended
//! to a local report log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │ Source       │──▶│ Extract  │──▶│ Summarize  │──▶│ Assemble │
//! │ upload/search│   │ PDF text │   │ per section│   │ Markdown │
//! └──────────────┘   └──────────┘   └────────────┘   └────┬─────┘
//!                                                         │
//!                                   ┌─────────────────────┤
//!                                   ▼                     ▼
//!                             ┌────────────┐        ┌──────────┐
//!                             │ Report log │        │ download │
//!                             │ (append)   │        │ (.md)    │
//!                             └────────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ddr search "Example Corp"                  # list IR PDF candidates
//! ddr report --company "Example Corp" --candidate 1 --topic ESG
//! ddr report --pdf ./ir.pdf --no-financial
//! ddr log list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`search`] | Web search providers |
//! | [`fetch`] | HTTP GET collaborator |
//! | [`source`] | Upload / search-and-fetch document resolution |
//! | [`extract`] | PDF text extraction |
//! | [`completion`] | Text-completion providers |
//! | [`summarize`] | Per-section prompt construction and summarization |
//! | [`report`] | Markdown assembly and file naming |
//! | [`report_log`] | Append-only report log |
//! | [`progress`] | Progress reporting on stderr |
//! | [`session`] | Workflow state machine |

pub mod completion;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod progress;
pub mod report;
pub mod report_log;
pub mod search;
pub mod session;
pub mod source;
pub mod summarize;

#[cfg(test)]
mod testing;
