//! HTTP fetch collaborator.
//!
//! A single GET per call, no retries. The fetcher reports whatever status
//! the server returned; deciding what counts as success is the resolver's job.

use async_trait::async_trait;
use std::time::Duration;

/// Status and body of one GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET. `Err` carries a transport-level failure description.
    async fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// [`Fetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let resp = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Build a client with an optional whole-request timeout.
pub(crate) fn http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!("ddr/", env!("CARGO_PKG_VERSION")));
    if let Some(t) = timeout {
        builder = builder.timeout(t);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn returns_status_and_body() {
        let app = Router::new()
            .route("/ir.pdf", get(|| async { b"%PDF-1.4 body".to_vec() }))
            .route("/missing.pdf", get(|| async { StatusCode::NOT_FOUND }));
        let base = serve(app).await;
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(5))).unwrap();

        let ok = fetcher.get(&format!("{}/ir.pdf", base)).await.unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.body, b"%PDF-1.4 body");

        let missing = fetcher.get(&format!("{}/missing.pdf", base)).await.unwrap();
        assert_eq!(missing.status, 404);
        assert!(!missing.is_success());
    }

    #[tokio::test]
    async fn connection_refused_is_err() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(5))).unwrap();
        let result = fetcher
            .get(&format!("http://127.0.0.1:{}/ir.pdf", port))
            .await;
        assert!(result.is_err());
    }
}
