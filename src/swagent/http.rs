use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};

/// A request as seen by the agent. Bodies are never cached, so they aren't carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url }
    }

    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Not a valid URL: {url}"))?;
        Ok(Self::get(url))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, content_type: content_type.map(str::to_string), body: body.into() }
    }

    /// 2xx
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Status: {}\n\
             Content-Type: {}\n\
             Length: {} bytes",
            self.status,
            self.content_type.as_deref().unwrap_or("(none)"),
            self.body.len()
        )
    }
}

/// The network as seen by the agent.
///
/// A non-2xx status is still `Ok`; `Err` means the request never produced a
/// response (offline, refused, timed out, aborted).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// [`Fetcher`] backed by a shared reqwest client. Timeouts are whatever the
/// client was built with.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        log::trace!("[HttpFetcher::fetch] {} {}", request.method, request.url);

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", request.url))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Could not read body from {}", request.url))?
            .to_vec();

        Ok(Response { status, content_type, body })
    }
}
