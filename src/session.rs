//! Session state machine driving one report workflow.
//!
//! A [`Session`] holds everything one user works with: the candidate URLs,
//! the resolved document, its extracted text, the options, the per-section
//! outcomes and the report history loaded from the log. A [`Workflow`]
//! bundles the collaborators and exposes each user action as a method that
//! takes `&mut Session` and either advances the state or leaves it where it
//! was and returns the error.
//!
//! ```text
//! Idle ──search──▶ Sourcing ──▶ CandidatesListed ──select──▶ Extracted
//!   └───upload───────▲                                          │
//!                    (failure stays)          generate ▼        │
//!                                   ReportReady ◀── Summarizing ◀┘
//!                                       │ set_options
//!                                       └──────────▶ Extracted
//! ```
//!
//! Summarization runs strictly in order: business, each extra topic as
//! listed, then financial. A failed section is kept as a placeholder and never
//! aborts its siblings.

use std::fmt;

use tracing::{info, warn};

use crate::completion::Completion;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::TextExtractor;
use crate::fetch::Fetcher;
use crate::models::{
    ExtractedText, ReportOptions, SectionMap, SectionOutcome, SourceDocument, SummaryResult,
};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::report::{self, Report, BUSINESS_HEADING, FINANCIAL_HEADING};
use crate::report_log::ReportLog;
use crate::search::WebSearch;
use crate::source::{self, SourceResolver};
use crate::summarize::Summarizer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Sourcing,
    CandidatesListed,
    Extracted,
    Summarizing,
    ReportReady,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Sourcing => "sourcing",
            SessionState::CandidatesListed => "candidates-listed",
            SessionState::Extracted => "extracted",
            SessionState::Summarizing => "summarizing",
            SessionState::ReportReady => "report-ready",
        };
        f.write_str(name)
    }
}

/// Per-user workflow context. Created by [`Workflow::start_session`].
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    company: String,
    candidates: Vec<String>,
    source: Option<SourceDocument>,
    text: Option<ExtractedText>,
    options: ReportOptions,
    business: Option<SectionOutcome>,
    financial: Option<SectionOutcome>,
    custom: SectionMap,
    report: Option<Report>,
    history: Vec<String>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    /// Name used in the report heading. Does not change the state.
    pub fn set_company(&mut self, company: &str) {
        self.company = company.trim().to_string();
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn source(&self) -> Option<&SourceDocument> {
        self.source.as_ref()
    }

    pub fn text(&self) -> Option<&ExtractedText> {
        self.text.as_ref()
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn business(&self) -> Option<&SectionOutcome> {
        self.business.as_ref()
    }

    pub fn financial(&self) -> Option<&SectionOutcome> {
        self.financial.as_ref()
    }

    pub fn custom(&self) -> &SectionMap {
        &self.custom
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Reports in the log, oldest first, including those generated this session.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Abandon the current workflow. Logged reports are kept.
    pub fn reset(&mut self) {
        let history = std::mem::take(&mut self.history);
        let options = ReportOptions {
            include_financial: self.options.include_financial,
            custom_topics: Vec::new(),
        };
        *self = Session {
            history,
            options,
            ..Session::default()
        };
    }

    fn require(&self, action: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action,
                state: self.state.to_string(),
            })
        }
    }

    fn require_not_summarizing(&self, action: &'static str) -> Result<()> {
        if self.state == SessionState::Summarizing {
            return Err(Error::InvalidTransition {
                action,
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Drop the document and everything derived from it.
    fn clear_source(&mut self) {
        self.source = None;
        self.text = None;
        self.clear_sections();
    }

    fn clear_sections(&mut self) {
        self.business = None;
        self.financial = None;
        self.custom.clear();
        self.report = None;
    }
}

/// External collaborators the workflow drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub search: &'a dyn WebSearch,
    pub fetcher: &'a dyn Fetcher,
    pub extractor: &'a dyn TextExtractor,
    pub completion: &'a dyn Completion,
}

pub struct Workflow<'a> {
    resolver: SourceResolver<'a>,
    extractor: &'a dyn TextExtractor,
    summarizer: Summarizer<'a>,
    log: &'a ReportLog,
    progress: &'a dyn ProgressReporter,
    max_results: usize,
    include_financial: bool,
}

impl<'a> Workflow<'a> {
    pub fn new(
        collaborators: Collaborators<'a>,
        log: &'a ReportLog,
        config: &Config,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            resolver: SourceResolver::new(
                collaborators.search,
                collaborators.fetcher,
                &config.search,
            ),
            extractor: collaborators.extractor,
            summarizer: Summarizer::new(collaborators.completion, &config.completion),
            log,
            progress,
            max_results: config.search.max_results,
            include_financial: config.report.include_financial,
        }
    }

    /// A fresh session with the report log loaded as its history.
    pub fn start_session(&self) -> Result<Session> {
        let history = self.log.load()?;
        info!(reports = history.len(), log = %self.log.path().display(), "session started");
        Ok(Session {
            history,
            options: ReportOptions {
                include_financial: self.include_financial,
                custom_topics: Vec::new(),
            },
            ..Session::default()
        })
    }

    /// Use uploaded bytes as the document. On extraction failure the session
    /// stays in `Sourcing`.
    pub async fn upload_document(&self, session: &mut Session, bytes: Vec<u8>) -> Result<()> {
        session.require_not_summarizing("upload a document")?;
        session.clear_source();
        session.candidates.clear();
        session.state = SessionState::Sourcing;

        let doc = source::resolve_by_upload(bytes)?;
        let text = self.extract(&doc)?;
        self.accept_source(session, doc, text);
        Ok(())
    }

    /// Search for IR PDFs and list them for selection.
    pub async fn search_by_company_name(
        &self,
        session: &mut Session,
        company: &str,
    ) -> Result<Vec<String>> {
        session.require_not_summarizing("search")?;
        if company.trim().is_empty() {
            return Err(Error::InvalidInput("company name is empty".to_string()));
        }
        session.clear_source();
        session.candidates.clear();
        session.set_company(company);
        session.state = SessionState::Sourcing;

        self.progress.report(ProgressEvent::Searching {
            company: session.company.clone(),
        });
        let found = self
            .resolver
            .search_candidates(&session.company, self.max_results)
            .await?;
        if found.is_empty() {
            return Err(Error::NoCandidatesFound {
                company: session.company.clone(),
            });
        }

        session.candidates = found.clone();
        session.state = SessionState::CandidatesListed;
        Ok(found)
    }

    /// Fetch and extract one of the listed candidates. On failure the
    /// candidates stay listed so another can be picked.
    pub async fn select_candidate(&self, session: &mut Session, url: &str) -> Result<()> {
        session.require("select a candidate", &[SessionState::CandidatesListed])?;
        if !session.candidates.iter().any(|c| c == url) {
            return Err(Error::InvalidInput(format!("{} is not a listed candidate", url)));
        }

        self.progress.report(ProgressEvent::Fetching {
            url: url.to_string(),
        });
        let doc = self.resolver.fetch_by_url(url).await?;
        let text = self.extract(&doc)?;
        self.accept_source(session, doc, text);
        Ok(())
    }

    /// Replace the report options. A ready report goes back to `Extracted`
    /// so it can be regenerated from the same text.
    pub fn set_options(&self, session: &mut Session, options: ReportOptions) -> Result<()> {
        session.require_not_summarizing("change options")?;
        session.options = options;
        if session.state == SessionState::ReportReady {
            session.state = SessionState::Extracted;
        }
        Ok(())
    }

    /// Summarize every requested section, assemble the report and append it
    /// to the log.
    pub async fn generate_report(&self, session: &mut Session) -> Result<Report> {
        session.require(
            "generate a report",
            &[SessionState::Extracted, SessionState::ReportReady],
        )?;
        let text = match &session.text {
            Some(text) => text.clone(),
            None => {
                return Err(Error::InvalidTransition {
                    action: "generate a report",
                    state: session.state.to_string(),
                })
            }
        };
        let options = session.options.clone();

        let mut guard = SummarizingGuard::enter(session);

        let total = 1 + options.custom_topics.len() as u64 + u64::from(options.include_financial);
        let mut n = 0;
        let mut step = |label: &str| {
            n += 1;
            self.progress.report(ProgressEvent::Summarizing {
                label: label.to_string(),
                n,
                total,
            });
        };

        step(BUSINESS_HEADING);
        let business = outcome(
            BUSINESS_HEADING,
            self.summarizer.summarize_business(&text, None).await,
        );

        let mut custom = SectionMap::new();
        for topic in &options.custom_topics {
            step(topic.as_str());
            let result = self.summarizer.summarize_custom(&text, topic).await;
            custom.insert(SummaryResult::new(topic.as_str(), outcome(topic, result)));
        }

        let financial = if options.include_financial {
            step(FINANCIAL_HEADING);
            Some(outcome(
                FINANCIAL_HEADING,
                self.summarizer.summarize_financial(&text).await,
            ))
        } else {
            None
        };

        let session = &mut *guard.session;
        let markdown = report::assemble(
            &session.company,
            &business.render(),
            financial.as_ref().map(SectionOutcome::render).as_deref(),
            &custom,
        );
        self.progress.report(ProgressEvent::Assembled {
            chars: markdown.chars().count() as u64,
        });

        session.business = Some(business);
        session.financial = financial;
        session.custom = custom;

        // Dropping the guard on error returns the session to `Extracted`.
        self.log.append(&markdown)?;
        session.history.push(markdown.clone());
        let index = session.history.len() - 1;
        self.progress.report(ProgressEvent::Logged {
            index: index as u64,
        });
        info!(company = %session.company, index, "report generated");

        let report = Report {
            company: session.company.clone(),
            markdown,
        };
        session.report = Some(report.clone());
        guard.finish(SessionState::ReportReady);
        Ok(report)
    }

    /// Suggested filename and Markdown of the ready report.
    pub fn download_report(&self, session: &Session) -> Result<(String, String)> {
        session.require("download a report", &[SessionState::ReportReady])?;
        match &session.report {
            Some(report) => Ok((report.filename(), report.markdown.clone())),
            None => Err(Error::InvalidTransition {
                action: "download a report",
                state: session.state.to_string(),
            }),
        }
    }

    pub fn view_log_entry(&self, session: &Session, index: usize) -> Result<String> {
        session.history.get(index).cloned().ok_or_else(|| {
            Error::InvalidInput(format!(
                "no report #{} in the log ({} entries)",
                index,
                session.history.len()
            ))
        })
    }

    fn extract(&self, doc: &SourceDocument) -> Result<ExtractedText> {
        self.progress.report(ProgressEvent::Extracting {
            bytes: doc.len() as u64,
        });
        let text = self.extractor.extract(doc)?;
        if text.is_empty() {
            warn!(origin = %doc.origin(), "document contains no text");
        }
        Ok(text)
    }

    fn accept_source(&self, session: &mut Session, doc: SourceDocument, text: ExtractedText) {
        info!(origin = %doc.origin(), chars = text.char_count(), "document ready");
        session.clear_source();
        session.source = Some(doc);
        session.text = Some(text);
        session.state = SessionState::Extracted;
    }
}

/// Holds a session in `Summarizing`. Unless finished, dropping it (an error
/// return or a cancelled future) puts the session back in `Extracted` so the
/// text can be summarized again.
struct SummarizingGuard<'s> {
    session: &'s mut Session,
    finished: bool,
}

impl<'s> SummarizingGuard<'s> {
    fn enter(session: &'s mut Session) -> Self {
        session.clear_sections();
        session.state = SessionState::Summarizing;
        Self {
            session,
            finished: false,
        }
    }

    fn finish(mut self, state: SessionState) {
        self.session.state = state;
        self.finished = true;
    }
}

impl Drop for SummarizingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("report generation did not complete, session back to extracted");
            self.session.state = SessionState::Extracted;
        }
    }
}

/// Isolate one section's failure into a placeholder outcome.
fn outcome(label: &str, result: Result<String>) -> SectionOutcome {
    match result {
        Ok(text) => SectionOutcome::Summary(text),
        Err(e) => {
            warn!(section = label, error = %e, "section summarization failed");
            let detail = match e {
                Error::SummarizationFailure(detail) => detail,
                other => other.to_string(),
            };
            SectionOutcome::Failed(detail)
        }
    }
}
