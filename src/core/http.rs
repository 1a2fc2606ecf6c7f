//! Outbound HTTP, behind a small trait so the pipelines can run against fakes.

use crate::error::{GmError, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH};
use std::io::Read;
use tracing::debug;

/// User agent attached to every request, `gm/<version>`.
pub const USER_AGENT: &str = concat!("gm/", env!("CARGO_PKG_VERSION"));

/// Status line and declared size returned by a `HEAD` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub status: u16,
    pub content_length: Option<u64>,
}

/// Streaming `GET` response.
pub struct Body {
    pub status: u16,
    pub content_length: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

impl Body {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Reads the whole body as UTF-8 text.
    pub fn into_string(mut self) -> std::io::Result<String> {
        let mut text = String::new();
        self.reader.read_to_string(&mut text)?;
        Ok(text)
    }
}

pub trait Transport {
    fn head(&self, url: &str) -> Result<Probe>;
    fn get(&self, url: &str) -> Result<Body>;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(None)
            .build()?;
        Ok(Self { client, token })
    }

    fn authorize(&self, url: &str, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) if url.starts_with("https://api.github.com/") => request
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(ACCEPT, "application/vnd.github+json"),
            _ => request,
        }
    }
}

// a HEAD response has no body, so reqwest's own length accessor reports nothing useful
fn declared_length(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

impl Transport for HttpClient {
    fn head(&self, url: &str) -> Result<Probe> {
        debug!(url, "HEAD");
        let response = self.authorize(url, self.client.head(url)).send()?;
        Ok(Probe {
            status: response.status().as_u16(),
            content_length: declared_length(response.headers()),
        })
    }

    fn get(&self, url: &str) -> Result<Body> {
        debug!(url, "GET");
        let response = self.authorize(url, self.client.get(url)).send()?;
        Ok(Body {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            reader: Box::new(response),
        })
    }
}

/// Fetches `url` and returns its body trimmed of surrounding whitespace.
pub fn fetch_text<T: Transport + ?Sized>(transport: &T, url: &str) -> Result<String> {
    let body = transport.get(url)?;
    if !body.is_success() {
        return Err(GmError::download_failed(url, format!("HTTP {}", body.status)));
    }
    Ok(body.into_string()?.trim().to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Clone)]
    pub struct Route {
        pub status: u16,
        pub body: Vec<u8>,
        pub content_length: Option<u64>,
    }

    /// In-memory transport serving canned responses and recording every request.
    #[derive(Default)]
    pub struct FakeTransport {
        routes: HashMap<String, Route>,
        head_lengths: HashMap<String, Option<u64>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            let body = body.into();
            let len = body.len() as u64;
            self.routes.insert(
                url.to_string(),
                Route {
                    status: 200,
                    body,
                    content_length: Some(len),
                },
            );
            self
        }

        pub fn route(mut self, url: &str, route: Route) -> Self {
            self.routes.insert(url.to_string(), route);
            self
        }

        /// Makes `HEAD url` declare `length` regardless of the body served by `GET`.
        pub fn head_length(mut self, url: &str, length: Option<u64>) -> Self {
            self.head_lengths.insert(url.to_string(), length);
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn lookup(&self, method: &str, url: &str) -> Route {
            self.requests
                .lock()
                .unwrap()
                .push(format!("{method} {url}"));
            self.routes.get(url).cloned().unwrap_or(Route {
                status: 404,
                body: Vec::new(),
                content_length: Some(0),
            })
        }
    }

    impl Transport for FakeTransport {
        fn head(&self, url: &str) -> Result<Probe> {
            let route = self.lookup("HEAD", url);
            Ok(Probe {
                status: route.status,
                content_length: self
                    .head_lengths
                    .get(url)
                    .copied()
                    .unwrap_or(route.content_length),
            })
        }

        fn get(&self, url: &str) -> Result<Body> {
            let route = self.lookup("GET", url);
            Ok(Body {
                status: route.status,
                content_length: route.content_length,
                reader: Box::new(Cursor::new(route.body)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_agent_carries_version() {
        assert_eq!(USER_AGENT, format!("gm/{}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_fetch_text_trims() {
        let transport = FakeTransport::new().serve("https://example.test/v", "go1.22.3\n");
        assert_eq!(
            fetch_text(&transport, "https://example.test/v").unwrap(),
            "go1.22.3"
        );
    }

    #[test]
    fn test_fetch_text_rejects_error_status() {
        let transport = FakeTransport::new();
        let err = fetch_text(&transport, "https://example.test/missing").unwrap_err();
        assert!(matches!(err, GmError::DownloadFailed { .. }));
    }

    #[test]
    fn test_declared_length_reads_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(declared_length(&headers), None);

        headers.insert(CONTENT_LENGTH, "not-a-number".parse().unwrap());
        assert_eq!(declared_length(&headers), None);

        headers.insert(CONTENT_LENGTH, "68157440".parse().unwrap());
        assert_eq!(declared_length(&headers), Some(68_157_440));
    }

    #[test]
    fn test_head_length_overrides_served_body() {
        let url = "https://example.test/go.tar.gz";
        let transport = FakeTransport::new()
            .serve(url, b"short".to_vec())
            .head_length(url, Some(10));

        assert_eq!(transport.head(url).unwrap().content_length, Some(10));
        assert_eq!(transport.get(url).unwrap().content_length, Some(5));
    }
}
