//! HTTP retrieval: GET with content-type classification, HEAD liveness
//! pings, and favicon byte fetches.
//!
//! Transport failures (DNS, connect, TLS, timeout) are reported as
//! `CrawlResult { status_code: 0, error: Some(..), .. }` rather than
//! propagated as a `Result::Err` — the orchestrator distinguishes a
//! transport failure from an HTTP error purely by `status_code == 0`,
//! so `fetch` itself never fails.

use std::time::Duration;

use base64::Engine;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use url::Url;

use voidcrawler_core::CrawlResult;

/// A browser-typical `Accept` header; some sites serve different
/// content (or refuse the request) to clients that send nothing here.
const ACCEPT_HEADER: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

pub struct Fetcher {
    client: Client,
    ping_client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(Policy::limited(5))
            .build()?;

        let ping_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(5))
            .redirect(Policy::limited(3))
            .build()?;

        Ok(Self { client, ping_client })
    }

    /// Issue a GET, classify the response, and run the HTML parser over
    /// HTML bodies. Statuses `< 500` are treated as ordinary results;
    /// `>= 500` still produces a `CrawlResult`, not an error — the
    /// orchestrator decides liveness from `status_code`, not from this
    /// method returning `Err`.
    pub async fn fetch(&self, url: &str) -> CrawlResult {
        let response = match self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url, error = %e, "transport failure");
                return CrawlResult {
                    url: url.to_string(),
                    status_code: 0,
                    error: Some(classify_transport_error(&e)),
                    ..Default::default()
                };
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            return CrawlResult {
                url: url.to_string(),
                status_code: status,
                error: Some(format!("Not HTML: {content_type}")),
                ..Default::default()
            };
        }

        let final_url = Url::parse(response.url().as_str()).unwrap_or_else(|_| {
            Url::parse(url).unwrap_or_else(|_| Url::parse("https://invalid.invalid").unwrap())
        });

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return CrawlResult {
                    url: url.to_string(),
                    status_code: 0,
                    error: Some(format!("failed reading body: {e}")),
                    ..Default::default()
                };
            }
        };

        let parsed = voidcrawler_parser::parse(&body, &final_url);

        CrawlResult {
            url: url.to_string(),
            status_code: status,
            title: parsed.title,
            description: parsed.description,
            favicon: parsed.favicon,
            og_image: parsed.og_image,
            links: parsed.links,
            error: None,
        }
    }

    /// A lightweight liveness check: HEAD, 5s timeout, up to 3
    /// redirects. Never propagates an error — any transport failure is
    /// just `ok = false`.
    pub async fn ping(&self, url: &str) -> PingResult {
        match self.ping_client.head(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                PingResult {
                    ok: is_alive_status(status),
                    status_code: status.as_u16(),
                }
            }
            Err(_) => PingResult { ok: false, status_code: 0 },
        }
    }

    /// Fetch a favicon's raw bytes and re-encode as a `data:` URI.
    /// Returns `None` on any failure (missing icon, transport error,
    /// non-2xx status) — never propagated as an error.
    pub async fn fetch_favicon(&self, url: &str) -> Option<String> {
        let resp = self.client.get(url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/x-icon")
            .to_string();
        let bytes = resp.bytes().await.ok()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Some(format!("data:{content_type};base64,{encoded}"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PingResult {
    pub ok: bool,
    pub status_code: u16,
}

fn is_alive_status(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}

fn is_html_content_type(content_type: &str) -> bool {
    let ct = content_type.split(';').next().unwrap_or("").trim().to_lowercase();
    ct == "text/html" || ct.starts_with("application/xhtml")
}

fn classify_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new("VoidBrowser/1.0 (Web Crawler)", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetch_parses_html_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><head><title>Hi</title></head><body><a href=\"/x\">x</a></body></html>")
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let result = fetcher().fetch(&server.uri()).await;
        assert_eq!(result.status_code, 200);
        assert_eq!(result.title.as_deref(), Some("Hi"));
        assert!(result.error.is_none());
        assert_eq!(result.links.len(), 1);
    }

    #[tokio::test]
    async fn fetch_rejects_non_html_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .insert_header("content-type", "application/json"),
            )
            .mount(&server)
            .await;

        let result = fetcher().fetch(&format!("{}/data.json", server.uri())).await;
        assert_eq!(result.status_code, 200);
        assert!(result.error.as_deref().unwrap().starts_with("Not HTML:"));
        assert!(result.links.is_empty());
    }

    #[tokio::test]
    async fn fetch_reports_http_error_status_without_failing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("<html><body>nope</body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let result = fetcher().fetch(&format!("{}/missing", server.uri())).await;
        assert_eq!(result.status_code, 404);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn fetch_classifies_transport_failure_as_status_zero() {
        let result = fetcher().fetch("http://127.0.0.1:1").await;
        assert_eq!(result.status_code, 0);
        assert!(result.error.is_some());
        assert!(result.is_transport_failure());
    }

    #[tokio::test]
    async fn ping_reports_ok_for_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = fetcher().ping(&server.uri()).await;
        assert!(result.ok);
        assert_eq!(result.status_code, 200);
    }

    #[tokio::test]
    async fn ping_never_fails_on_transport_error() {
        let result = fetcher().ping("http://127.0.0.1:1").await;
        assert!(!result.ok);
        assert_eq!(result.status_code, 0);
    }
}
