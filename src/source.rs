//! Document source resolution.
//!
//! A [`SourceDocument`] comes from one of two places: bytes the user
//! uploaded, or a PDF fetched from a URL the user picked out of a web search.
//! The search collaborator's ranking is authoritative; this module only
//! filters its results down to PDF links.

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::models::{Origin, SourceDocument};
use crate::search::WebSearch;

/// Raw search results examined per query.
pub const SEARCH_BUDGET: usize = 10;

/// Wrap uploaded bytes as a document. Empty uploads are rejected.
pub fn resolve_by_upload(bytes: Vec<u8>) -> Result<SourceDocument> {
    if bytes.is_empty() {
        return Err(Error::InvalidInput("uploaded document is empty".to_string()));
    }
    Ok(SourceDocument::new(bytes, Origin::Uploaded))
}

/// True if `url` is an absolute http(s) URL whose path ends in `.pdf`.
/// Query strings and fragments are ignored.
pub fn is_pdf_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.path().to_ascii_lowercase().ends_with(".pdf")
        }
        Err(_) => false,
    }
}

pub struct SourceResolver<'a> {
    search: &'a dyn WebSearch,
    fetcher: &'a dyn Fetcher,
    qualifier: String,
    domain_suffix: String,
}

impl<'a> SourceResolver<'a> {
    pub fn new(search: &'a dyn WebSearch, fetcher: &'a dyn Fetcher, config: &SearchConfig) -> Self {
        Self {
            search,
            fetcher,
            qualifier: config.qualifier.clone(),
            domain_suffix: config.domain_suffix.clone(),
        }
    }

    /// The query sent to the search collaborator for `company`.
    pub fn query_for(&self, company: &str) -> String {
        let mut query = format!("{} {}", company.trim(), self.qualifier);
        if !self.domain_suffix.is_empty() {
            query.push_str(&format!(" site:{}", self.domain_suffix));
        }
        query
    }

    /// Search for IR PDFs about `company`.
    ///
    /// Examines [`SEARCH_BUDGET`] raw results and keeps, in the order the
    /// collaborator returned them, at most `max_results` distinct PDF URLs.
    /// No match is an empty `Vec`, not an error.
    pub async fn search_candidates(&self, company: &str, max_results: usize) -> Result<Vec<String>> {
        if company.trim().is_empty() {
            return Err(Error::InvalidInput("company name is empty".to_string()));
        }

        let query = self.query_for(company);
        info!(provider = self.search.name(), %query, "searching for IR documents");
        let raw = self.search.search(&query, SEARCH_BUDGET).await?;

        let mut candidates: Vec<String> = Vec::new();
        for url in raw.into_iter().take(SEARCH_BUDGET) {
            if candidates.len() >= max_results {
                break;
            }
            if !is_pdf_url(&url) {
                debug!(%url, "skipping non-PDF result");
                continue;
            }
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        }

        info!(company = company.trim(), found = candidates.len(), "search finished");
        Ok(candidates)
    }

    /// GET `url` once. Anything but a 2xx with a non-empty body is a
    /// [`Error::DownloadFailure`].
    pub async fn fetch_by_url(&self, url: &str) -> Result<SourceDocument> {
        info!(%url, "fetching document");
        let resp = self
            .fetcher
            .get(url)
            .await
            .map_err(|reason| download_failure(url, reason))?;

        if !resp.is_success() {
            return Err(download_failure(url, format!("HTTP status {}", resp.status)));
        }
        if resp.body.is_empty() {
            return Err(download_failure(url, "empty response body".to_string()));
        }

        debug!(%url, bytes = resp.body.len(), "document fetched");
        Ok(SourceDocument::new(resp.body, Origin::Fetched(url.to_string())))
    }
}

fn download_failure(url: &str, reason: String) -> Error {
    warn!(%url, %reason, "download failed");
    Error::DownloadFailure {
        url: url.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpResponse;
    use crate::testing::{StubFetcher, StubSearch};

    fn config() -> SearchConfig {
        SearchConfig::default()
    }

    #[test]
    fn upload_wraps_bytes() {
        let doc = resolve_by_upload(b"%PDF-1.4".to_vec()).unwrap();
        assert_eq!(doc.origin(), &Origin::Uploaded);
        assert_eq!(doc.bytes(), b"%PDF-1.4");
    }

    #[test]
    fn empty_upload_is_invalid_input() {
        let err = resolve_by_upload(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn pdf_url_detection() {
        assert!(is_pdf_url("http://x.co.jp/ir.pdf"));
        assert!(is_pdf_url("https://x.co.jp/IR/Report.PDF"));
        assert!(is_pdf_url("https://x.co.jp/ir.pdf?download=1#page=2"));
        assert!(!is_pdf_url("http://x.co.jp/page.html"));
        assert!(!is_pdf_url("http://x.co.jp/page?file=ir.pdf"));
        assert!(!is_pdf_url("ftp://x.co.jp/ir.pdf"));
        assert!(!is_pdf_url("ir.pdf"));
    }

    #[test]
    fn query_combines_name_qualifier_and_domain() {
        let search = StubSearch::empty();
        let fetcher = StubFetcher::new();
        let resolver = SourceResolver::new(&search, &fetcher, &config());
        assert_eq!(
            resolver.query_for("  ソニー株式会社 "),
            "ソニー株式会社 IR 資料 filetype:pdf site:co.jp"
        );
    }

    #[tokio::test]
    async fn search_keeps_only_pdfs_in_order_capped() {
        let search = StubSearch::new(vec![
            "http://x.co.jp/a.pdf",
            "http://x.co.jp/page.html",
            "http://x.co.jp/b.PDF",
            "http://x.co.jp/c.pdf?v=2",
            "http://x.co.jp/other.htm",
            "http://x.co.jp/d.pdf",
        ]);
        let fetcher = StubFetcher::new();
        let resolver = SourceResolver::new(&search, &fetcher, &config());

        let found = resolver.search_candidates("Example Corp", 3).await.unwrap();
        assert_eq!(
            found,
            vec![
                "http://x.co.jp/a.pdf",
                "http://x.co.jp/b.PDF",
                "http://x.co.jp/c.pdf?v=2"
            ]
        );
        let calls = search.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Example Corp IR 資料 filetype:pdf site:co.jp");
        assert_eq!(calls[0].1, SEARCH_BUDGET);
    }

    #[tokio::test]
    async fn search_examines_only_the_budget() {
        let mut urls: Vec<String> = (0..SEARCH_BUDGET)
            .map(|i| format!("http://x.co.jp/page{}.html", i))
            .collect();
        urls.push("http://x.co.jp/late.pdf".to_string());
        let search = StubSearch::new(urls);
        let fetcher = StubFetcher::new();
        let resolver = SourceResolver::new(&search, &fetcher, &config());

        let found = resolver.search_candidates("Example Corp", 5).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn search_drops_duplicates() {
        let search = StubSearch::new(vec![
            "http://x.co.jp/a.pdf",
            "http://x.co.jp/a.pdf",
            "http://x.co.jp/b.pdf",
        ]);
        let fetcher = StubFetcher::new();
        let resolver = SourceResolver::new(&search, &fetcher, &config());
        let found = resolver.search_candidates("Example Corp", 5).await.unwrap();
        assert_eq!(found, vec!["http://x.co.jp/a.pdf", "http://x.co.jp/b.pdf"]);
    }

    #[tokio::test]
    async fn blank_company_is_invalid_input() {
        let search = StubSearch::new(vec!["http://x.co.jp/a.pdf"]);
        let fetcher = StubFetcher::new();
        let resolver = SourceResolver::new(&search, &fetcher, &config());
        let err = resolver.search_candidates("   ", 5).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(search.calls().is_empty());
    }

    #[tokio::test]
    async fn fetch_success_tags_origin() {
        let search = StubSearch::empty();
        let fetcher = StubFetcher::new().with(
            "http://x.co.jp/ir.pdf",
            Ok(HttpResponse {
                status: 200,
                body: b"%PDF-bytes".to_vec(),
            }),
        );
        let resolver = SourceResolver::new(&search, &fetcher, &config());
        let doc = resolver.fetch_by_url("http://x.co.jp/ir.pdf").await.unwrap();
        assert_eq!(doc.origin().to_string(), "fetched:http://x.co.jp/ir.pdf");
        assert_eq!(doc.bytes(), b"%PDF-bytes");
    }

    #[tokio::test]
    async fn fetch_failures_are_download_failures() {
        let search = StubSearch::empty();
        let fetcher = StubFetcher::new()
            .with(
                "http://x.co.jp/gone.pdf",
                Ok(HttpResponse {
                    status: 404,
                    body: b"not found".to_vec(),
                }),
            )
            .with("http://x.co.jp/down.pdf", Err("connection refused".to_string()))
            .with(
                "http://x.co.jp/empty.pdf",
                Ok(HttpResponse {
                    status: 200,
                    body: Vec::new(),
                }),
            );
        let resolver = SourceResolver::new(&search, &fetcher, &config());

        for url in [
            "http://x.co.jp/gone.pdf",
            "http://x.co.jp/down.pdf",
            "http://x.co.jp/empty.pdf",
            "http://x.co.jp/unknown.pdf",
        ] {
            let err = resolver.fetch_by_url(url).await.unwrap_err();
            match err {
                Error::DownloadFailure { url: failed, .. } => assert_eq!(failed, url),
                other => panic!("unexpected error for {}: {:?}", url, other),
            }
        }
    }
}
