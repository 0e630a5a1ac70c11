//! Web search collaborator.
//!
//! Defines the [`WebSearch`] trait and its providers:
//! - **[`DisabledSearch`]**: always fails; used when no provider is configured.
//! - **[`ExaSearch`]**: `POST https://api.exa.ai/search`.
//! - **[`GoogleSearch`]**: Google Programmable Search (Custom Search JSON API).
//!
//! Providers return result URLs in their own relevance order. Filtering to
//! PDFs and capping the candidate list happens in [`crate::source`].
//!
//! Use [`create_search`] to build the provider named in configuration.

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::fetch::http_client;

const EXA_ENDPOINT: &str = "https://api.exa.ai/search";
const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
/// Custom Search returns at most 10 items per page.
const GOOGLE_PAGE_SIZE: usize = 10;

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Provider identifier, as written in config.
    fn name(&self) -> &str;

    /// Run `query` and return up to `limit` result URLs, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

// ============ Disabled ============

pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>> {
        Err(Error::SearchFailure(
            "web search is disabled; set [search].provider or upload a PDF".to_string(),
        ))
    }
}

// ============ Exa ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    #[serde(rename = "type")]
    search_type: &'a str,
}

#[derive(Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Deserialize)]
struct ExaResult {
    url: String,
}

pub struct ExaSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl ExaSearch {
    pub fn new(config: &SearchConfig, api_key: String) -> reqwest::Result<Self> {
        Self::with_endpoint(config, api_key, EXA_ENDPOINT)
    }

    pub fn with_endpoint(
        config: &SearchConfig,
        api_key: String,
        endpoint: &str,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            api_key,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl WebSearch for ExaSearch {
    fn name(&self) -> &str {
        "exa"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let request = ExaSearchRequest {
            query,
            num_results: limit,
            search_type: "auto",
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::SearchFailure(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::SearchFailure(format!("Exa API error {}: {}", status, body)));
        }

        let data: ExaSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::SearchFailure(format!("invalid Exa response: {}", e)))?;
        debug!(results = data.results.len(), "exa search returned");
        Ok(data.results.into_iter().take(limit).map(|r| r.url).collect())
    }
}

// ============ Google Programmable Search ============

#[derive(Deserialize)]
struct GoogleSearchResponse {
    /// Absent when the query matched nothing.
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Deserialize)]
struct GoogleItem {
    link: String,
}

pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    cx: String,
    endpoint: String,
}

impl GoogleSearch {
    pub fn new(config: &SearchConfig, api_key: String, cx: String) -> reqwest::Result<Self> {
        Self::with_endpoint(config, api_key, cx, GOOGLE_ENDPOINT)
    }

    pub fn with_endpoint(
        config: &SearchConfig,
        api_key: String,
        cx: String,
        endpoint: &str,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            api_key,
            cx,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    fn name(&self) -> &str {
        "google"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let mut links = Vec::with_capacity(limit);

        while links.len() < limit {
            let num = GOOGLE_PAGE_SIZE.min(limit - links.len());
            let num = num.to_string();
            let start = (links.len() + 1).to_string();
            let resp = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("key", self.api_key.as_str()),
                    ("cx", self.cx.as_str()),
                    ("q", query),
                    ("num", num.as_str()),
                    ("start", start.as_str()),
                ])
                .send()
                .await
                .map_err(|e| Error::SearchFailure(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::SearchFailure(format!(
                    "Google search API error {}: {}",
                    status, body
                )));
            }

            let page: GoogleSearchResponse = resp
                .json()
                .await
                .map_err(|e| Error::SearchFailure(format!("invalid Google response: {}", e)))?;
            if page.items.is_empty() {
                break;
            }
            let got = page.items.len();
            links.extend(page.items.into_iter().map(|i| i.link));
            if got < GOOGLE_PAGE_SIZE {
                break;
            }
        }

        links.truncate(limit);
        debug!(results = links.len(), "google search returned");
        Ok(links)
    }
}

/// Create the [`WebSearch`] provider named by `config.provider`.
///
/// # Errors
///
/// Unknown provider names, a missing API key variable, or a missing
/// `google_cx`.
pub fn create_search(config: &SearchConfig) -> anyhow::Result<Box<dyn WebSearch>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledSearch)),
        "exa" => {
            let key = read_key(config, "EXA_API_KEY")?;
            Ok(Box::new(ExaSearch::new(config, key)?))
        }
        "google" => {
            let key = read_key(config, "GOOGLE_API_KEY")?;
            let cx = match config.google_cx.clone() {
                Some(cx) if !cx.is_empty() => cx,
                _ => bail!("search.google_cx required for Google provider"),
            };
            Ok(Box::new(GoogleSearch::new(config, key, cx)?))
        }
        other => bail!("Unknown search provider: {}", other),
    }
}

fn read_key(config: &SearchConfig, default_var: &str) -> anyhow::Result<String> {
    let var = config.api_key_env.as_deref().unwrap_or(default_var);
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => bail!("{} environment variable not set", var),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn disabled_search_fails() {
        let err = DisabledSearch.search("anything", 10).await.unwrap_err();
        assert!(matches!(err, Error::SearchFailure(_)));
    }

    #[tokio::test]
    async fn exa_sends_query_and_returns_urls_in_order() {
        let app = Router::new().route(
            "/search",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["query"], "Example Corp IR");
                assert_eq!(body["numResults"], 10);
                Json(json!({
                    "results": [
                        {"url": "http://x.co.jp/a.pdf", "title": "A"},
                        {"url": "http://x.co.jp/b.html", "title": "B"}
                    ]
                }))
            }),
        );
        let base = serve(app).await;
        let search = ExaSearch::with_endpoint(
            &SearchConfig::default(),
            "k".into(),
            &format!("{}/search", base),
        )
        .unwrap();

        let urls = search.search("Example Corp IR", 10).await.unwrap();
        assert_eq!(urls, vec!["http://x.co.jp/a.pdf", "http://x.co.jp/b.html"]);
    }

    #[tokio::test]
    async fn exa_http_error_is_search_failure() {
        let app = Router::new().route(
            "/search",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let base = serve(app).await;
        let search = ExaSearch::with_endpoint(
            &SearchConfig::default(),
            "k".into(),
            &format!("{}/search", base),
        )
        .unwrap();

        let err = search.search("q", 10).await.unwrap_err();
        match err {
            Error::SearchFailure(msg) => assert!(msg.contains("401")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn google_reads_items_and_handles_no_results() {
        let app = Router::new().route(
            "/customsearch",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("cx").map(String::as_str), Some("cx-1"));
                if params.get("q").map(String::as_str) == Some("nothing") {
                    return Json(json!({ "kind": "customsearch#search" }));
                }
                Json(json!({
                    "items": [
                        {"link": "http://x.co.jp/ir.pdf"},
                        {"link": "http://x.co.jp/page.html"}
                    ]
                }))
            }),
        );
        let base = serve(app).await;
        let search = GoogleSearch::with_endpoint(
            &SearchConfig::default(),
            "k".into(),
            "cx-1".into(),
            &format!("{}/customsearch", base),
        )
        .unwrap();

        let urls = search.search("Example Corp", 10).await.unwrap();
        assert_eq!(urls, vec!["http://x.co.jp/ir.pdf", "http://x.co.jp/page.html"]);

        let none = search.search("nothing", 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn create_search_defaults_to_disabled() {
        let provider = create_search(&SearchConfig::default()).unwrap();
        assert_eq!(provider.name(), "disabled");
    }

    #[test]
    fn create_search_requires_key() {
        let config = SearchConfig {
            provider: "exa".into(),
            api_key_env: Some("DDR_TEST_KEY_THAT_IS_NEVER_SET".into()),
            ..SearchConfig::default()
        };
        let err = create_search(&config).err().unwrap();
        assert!(err.to_string().contains("DDR_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
