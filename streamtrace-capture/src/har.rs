// HTTP Archive (HAR 1.2) model and loading

use crate::error::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Har {
    pub log: HarLog,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarLog {
    #[serde(default)]
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarEntry {
    pub request: HarRequest,
    pub response: HarResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarRequest {
    #[serde(default)]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarResponse {
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub content: HarContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    #[serde(default)]
    pub mime_type: String,
    pub text: Option<String>,
    pub encoding: Option<String>,
    /// Body stored next to the HAR document inside a recording archive
    #[serde(rename = "_file")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Where the response body of a captured exchange lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRef {
    /// Opaque identifier resolved through a [`crate::BodySource`]
    Archived(String),
    /// Body embedded in the HAR document itself
    Inline(Vec<u8>),
    Missing,
}

/// One recorded request/response pair, in capture order
#[derive(Debug, Clone)]
pub struct CapturedExchange {
    pub url: String,
    pub method: String,
    pub status: i32,
    pub request_headers: Vec<Header>,
    pub response_headers: Vec<Header>,
    pub mime_type: Option<String>,
    pub body: BodyRef,
}

impl CapturedExchange {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            status: 200,
            request_headers: Vec::new(),
            response_headers: Vec::new(),
            mime_type: None,
            body: BodyRef::Missing,
        }
    }

    pub fn with_request_header(mut self, name: &str, value: &str) -> Self {
        self.request_headers.push(Header::new(name, value));
        self
    }

    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response_headers.push(Header::new(name, value));
        self
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn with_body(mut self, body: BodyRef) -> Self {
        self.body = body;
        self
    }

    /// First request header with the given name, compared case-insensitively
    pub fn request_header(&self, name: &str) -> Option<&str> {
        find_header(&self.request_headers, name)
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        find_header(&self.response_headers, name)
    }
}

fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

impl TryFrom<HarEntry> for CapturedExchange {
    type Error = crate::error::CaptureError;

    fn try_from(entry: HarEntry) -> Result<Self> {
        let HarEntry { request, response } = entry;
        let content = response.content;

        let body = if let Some(file) = content.file {
            BodyRef::Archived(file)
        } else if let Some(text) = content.text {
            if content.encoding.as_deref() == Some("base64") {
                BodyRef::Inline(STANDARD.decode(text.trim())?)
            } else {
                BodyRef::Inline(text.into_bytes())
            }
        } else {
            BodyRef::Missing
        };

        let mime_type = Some(content.mime_type).filter(|m| !m.is_empty());

        Ok(Self {
            url: request.url,
            method: request.method,
            status: response.status,
            request_headers: request.headers,
            response_headers: response.headers,
            mime_type,
            body,
        })
    }
}

/// Parse a HAR document held in memory
pub fn parse_har(bytes: &[u8]) -> Result<Vec<CapturedExchange>> {
    let har: Har = serde_json::from_slice(bytes)?;
    debug!("Parsed HAR with {} entries", har.log.entries.len());

    har.log
        .entries
        .into_iter()
        .map(CapturedExchange::try_from)
        .collect()
}

/// Read and parse a plain `.har` file
pub fn load_har(path: &Path) -> Result<Vec<CapturedExchange>> {
    let bytes = fs::read(path)?;
    parse_har(&bytes)
}
