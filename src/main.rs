//! # DD Report CLI (`ddr`)
//!
//! The `ddr` binary drives the report workflow from the command line:
//! locate or load an IR PDF, extract its text, summarize it section by
//! section, print the Markdown report and append it to the report log.
//!
//! ## Usage
//!
//! ```bash
//! ddr --config ./config/ddr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ddr search <company>` | List IR PDF candidates found by web search |
//! | `ddr report` | Generate a report from `--pdf` or `--company` |
//! | `ddr extract <pdf>` | Print the plain text of a PDF |
//! | `ddr log list` | List logged reports |
//! | `ddr log show <index>` | Print one logged report |
//! | `ddr completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! # Search and use the second candidate, with two extra topics
//! ddr report --company "Example Corp" --candidate 2 --topic ESG --topic 海外展開
//!
//! # Summarize a local PDF without the financial section, write to a directory
//! ddr report --pdf ./ir.pdf --company "Example Corp" --no-financial --output ./out/
//! ```

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dd_report::completion::create_completion;
use dd_report::config::{self, Config};
use dd_report::error::Error;
use dd_report::extract::{PdfTextExtractor, TextExtractor};
use dd_report::fetch::HttpFetcher;
use dd_report::models::ReportOptions;
use dd_report::progress::ProgressMode;
use dd_report::report_log::ReportLog;
use dd_report::search::{create_search, DisabledSearch, WebSearch};
use dd_report::session::{Collaborators, Workflow};
use dd_report::source::{self, SourceResolver};

/// DD Report: due-diligence summaries of a company's IR documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ddr.example.toml` for a full example. When the file does
/// not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "ddr",
    about = "DD Report: summarize a company's IR PDF into a Markdown due-diligence report",
    version,
    long_about = "DD Report locates a company's investor-relations PDF (by upload or web search), \
    extracts its text, asks a language model for business, financial and custom-topic summaries, \
    and assembles them into a Markdown report that is appended to a local log."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ddr.toml")]
    config: PathBuf,

    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Progress output on stderr. Defaults to `human` on a terminal, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the web for a company's IR PDFs.
    ///
    /// Prints the PDF candidates, numbered from 1, in the search
    /// provider's ranking order.
    Search {
        /// Company name.
        company: String,

        /// Maximum number of candidates, at least 1 (defaults to `[search].max_results`).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        max: Option<u64>,
    },

    /// Generate a report.
    ///
    /// Uses `--pdf` when given; otherwise searches for `--company` and
    /// fetches the chosen candidate. The report is appended to the log and
    /// printed to stdout unless `--output` is set.
    Report {
        /// Company name for the heading (and the search, without `--pdf`).
        #[arg(long)]
        company: Option<String>,

        /// Local PDF to summarize instead of searching.
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Which search candidate to use, counting from 1.
        #[arg(long, default_value_t = 1)]
        candidate: usize,

        /// Skip the financial section.
        #[arg(long)]
        no_financial: bool,

        /// Extra topic to summarize as its own section. Repeatable.
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Write the report here. A directory gets the suggested filename.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the text extracted from a PDF.
    Extract {
        pdf: PathBuf,
    },

    /// Inspect the report log.
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// List logged reports, oldest first, with their index.
    List,
    /// Print the report at `index` (as shown by `log list`).
    Show { index: usize },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load `path`, or fall back to defaults when it does not exist.
fn load_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        info!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "ddr", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = load_or_default(&cli.config)?;
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Search { company, max } => {
            run_search(&cfg, &company, max).await?;
        }
        Commands::Report {
            company,
            pdf,
            candidate,
            no_financial,
            topics,
            output,
        } => {
            let request = ReportRequest {
                company,
                pdf,
                candidate,
                include_financial: cfg.report.include_financial && !no_financial,
                topics,
                output,
            };
            run_report(&cfg, request, progress.as_ref()).await?;
        }
        Commands::Extract { pdf } => {
            let bytes = std::fs::read(&pdf)
                .with_context(|| format!("Failed to read {}", pdf.display()))?;
            let doc = source::resolve_by_upload(bytes)?;
            let text = PdfTextExtractor.extract(&doc)?;
            println!("{}", text.as_str());
        }
        Commands::Log { action } => {
            let log = ReportLog::new(&cfg.report_log.path);
            match action {
                LogAction::List => {
                    let records = log.load()?;
                    if records.is_empty() {
                        println!("No reports logged.");
                    }
                    for (index, record) in records.iter().enumerate() {
                        let title = record
                            .lines()
                            .find(|l| !l.trim().is_empty())
                            .unwrap_or("(empty)");
                        println!("{:>4}  {}", index, title.trim_start_matches("# "));
                    }
                }
                LogAction::Show { index } => match log.entry(index)? {
                    Some(record) => print!("{}", record),
                    None => bail!("No report #{} in {}", index, log.path().display()),
                },
            }
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

async fn run_search(cfg: &Config, company: &str, max: Option<u64>) -> anyhow::Result<()> {
    let search = create_search(&cfg.search)?;
    let fetcher = HttpFetcher::new(cfg.fetch.timeout())?;
    let resolver = SourceResolver::new(search.as_ref(), &fetcher, &cfg.search);

    let max = max.map_or(cfg.search.max_results, |m| m as usize);
    let candidates = resolver.search_candidates(company, max).await?;
    if candidates.is_empty() {
        return Err(Error::NoCandidatesFound {
            company: company.trim().to_string(),
        }
        .into());
    }
    for (i, url) in candidates.iter().enumerate() {
        println!("{}. {}", i + 1, url);
    }
    Ok(())
}

struct ReportRequest {
    company: Option<String>,
    pdf: Option<PathBuf>,
    candidate: usize,
    include_financial: bool,
    topics: Vec<String>,
    output: Option<PathBuf>,
}

async fn run_report(
    cfg: &Config,
    request: ReportRequest,
    progress: &dyn dd_report::progress::ProgressReporter,
) -> anyhow::Result<()> {
    let company = request.company.as_deref().map(str::trim).unwrap_or("");
    if company.is_empty() && request.pdf.is_none() {
        return Err(Error::InvalidInput(
            "either --company or --pdf is required".to_string(),
        )
        .into());
    }

    // A local PDF never needs the search provider (or its API key).
    let search: Box<dyn WebSearch> = if request.pdf.is_some() || !cfg.search.is_enabled() {
        Box::new(DisabledSearch)
    } else {
        create_search(&cfg.search)?
    };
    let fetcher = HttpFetcher::new(cfg.fetch.timeout())?;
    let completion = create_completion(&cfg.completion)?;
    let log = ReportLog::new(&cfg.report_log.path);

    let workflow = Workflow::new(
        Collaborators {
            search: search.as_ref(),
            fetcher: &fetcher,
            extractor: &PdfTextExtractor,
            completion: completion.as_ref(),
        },
        &log,
        cfg,
        progress,
    );
    let mut session = workflow.start_session()?;

    match &request.pdf {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            workflow.upload_document(&mut session, bytes).await?;
            session.set_company(company);
        }
        None => {
            let candidates = workflow.search_by_company_name(&mut session, company).await?;
            let url = match request.candidate.checked_sub(1).and_then(|i| candidates.get(i)) {
                Some(url) => url,
                None => bail!(
                    "--candidate must be between 1 and {}",
                    candidates.len()
                ),
            };
            info!(%url, "using candidate {}", request.candidate);
            workflow.select_candidate(&mut session, url).await?;
        }
    }

    workflow.set_options(
        &mut session,
        ReportOptions::new(request.include_financial, &request.topics),
    )?;
    workflow.generate_report(&mut session).await?;
    let (filename, markdown) = workflow.download_report(&session)?;

    match request.output {
        Some(path) => {
            let path = if path.is_dir() { path.join(&filename) } else { path };
            std::fs::write(&path, &markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
