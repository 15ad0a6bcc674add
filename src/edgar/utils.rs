use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use reqwest::{redirect, Client, StatusCode};
use std::borrow::Cow;
use url::Url;

use crate::error::{IngestError, Result};

const ACCEPT_XML: &str = "application/xml, text/xml, */*;q=0.9";
const SEC_REFERER: &str = "https://www.sec.gov/";

/// Raw response from a [`DocumentSource`].
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Fetched {
            status: StatusCode::OK.as_u16(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Anything that can hand back the body and status for a URL.
#[async_trait]
pub trait DocumentSource {
    /// Transport failures are returned as [`IngestError::FetchFailed`];
    /// HTTP error statuses are returned as a [`Fetched`] with that status.
    async fn fetch(&self, url: &Url) -> Result<Fetched>;
}

/// Fetch `url` and return its body as text, treating any non-200 response
/// as [`IngestError::FetchFailed`].
pub async fn fetch_text<S>(source: &S, url: &Url) -> Result<String>
where
    S: DocumentSource + Sync + ?Sized,
{
    log::debug!("Fetching URL: {}", url);
    let fetched = source.fetch(url).await?;
    log::debug!("Response status: {} ({} bytes)", fetched.status, fetched.body.len());

    if !fetched.is_success() {
        return Err(IngestError::FetchFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", fetched.status),
        });
    }
    Ok(fetched.text().into_owned())
}

/// HTTP transport for EDGAR archives.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// `user_agent` must identify the caller with contact details; EDGAR
    /// blocks anonymous automated traffic.
    pub fn new(user_agent: &str) -> std::result::Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_XML));
        headers.insert(REFERER, HeaderValue::from_static(SEC_REFERER));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(redirect::Policy::limited(10))
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, url: &Url) -> Result<Fetched> {
        let failed = |e: reqwest::Error| IngestError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url.as_str()).send().await.map_err(failed)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(failed)?;

        Ok(Fetched {
            status,
            body: body.to_vec(),
        })
    }
}
