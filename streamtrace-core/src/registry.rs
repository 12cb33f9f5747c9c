// Ordered set of resolvable exchanges built from a raw capture

use crate::error::{ResolveError, Result};
use crate::model::Exchange;
use crate::tokenize::{MIN_TOKEN_LEN, tokenize_url};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use streamtrace_capture::{BodyRef, BodySource, CapturedExchange, Header};
use tracing::{debug, info, warn};
use url::Url;

static MEDIA_MIME_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:audio|video)/[a-z0-9.+-]+|application/(?:vnd\.apple\.mpegurl|x-mpegurl|dash\+xml))$",
    )
    .unwrap()
});

static STATIC_ASSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:css|woff2?|ttf|otf|eot|png|jpe?g|gif|webp|svg|ico|wasm)$").unwrap()
});

/// Request headers that are transport boilerplate rather than site-specific data
const BOILERPLATE_HEADERS: &[&str] = &[
    "accept",
    "accept-encoding",
    "accept-language",
    "cache-control",
    "connection",
    "content-length",
    "content-type",
    "cookie",
    "dnt",
    "host",
    "origin",
    "priority",
    "range",
    "referer",
    "upgrade-insecure-requests",
    "user-agent",
];

const IGNORED_HEADER_PREFIXES: &[&str] = &["sec-", ":", "if-"];

/// Options for building a registry
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Drop stylesheets, fonts, images and wasm modules
    pub skip_static_assets: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            skip_static_assets: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    exchanges: Vec<Exchange>,
    target: usize,
}

impl Registry {
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Exchange>, usize) {
        (self.exchanges, self.target)
    }
}

/// Whether the exchange looks like the media resource being traced
pub fn is_media_exchange(exchange: &CapturedExchange) -> bool {
    if exchange
        .request_header("sec-fetch-dest")
        .is_some_and(|dest| dest == "video")
    {
        return true;
    }

    let mime_type = exchange
        .mime_type
        .as_deref()
        .or_else(|| exchange.response_header("content-type"))
        .unwrap_or_default();
    let essence = mime_type.split(';').next().unwrap_or_default().trim();

    MEDIA_MIME_TYPE.is_match(essence)
}

/// Capture positions of every media exchange, in order
pub fn media_exchanges(captured: &[CapturedExchange]) -> Vec<usize> {
    captured
        .iter()
        .enumerate()
        .filter(|(_, exchange)| is_media_exchange(exchange))
        .map(|(pos, _)| pos)
        .collect()
}

pub fn find_target(captured: &[CapturedExchange]) -> Option<usize> {
    captured.iter().position(is_media_exchange)
}

pub fn is_static_asset(url: &Url) -> bool {
    STATIC_ASSET.is_match(url.path())
}

/// Header values that may carry identifiers: everything except pseudo,
/// security, conditional and boilerplate headers.
pub fn request_signals(headers: &[Header]) -> BTreeSet<String> {
    headers
        .iter()
        .filter(|header| {
            let name = header.name.to_lowercase();
            !IGNORED_HEADER_PREFIXES
                .iter()
                .any(|prefix| name.starts_with(prefix))
                && !BOILERPLATE_HEADERS.contains(&name.as_str())
        })
        .map(|header| header.value.clone())
        .filter(|value| value.chars().count() >= MIN_TOKEN_LEN)
        .collect()
}

pub fn response_signals(headers: &[Header]) -> BTreeSet<String> {
    headers
        .iter()
        .map(|header| header.value.clone())
        .filter(|value| value.chars().count() >= MIN_TOKEN_LEN)
        .collect()
}

fn resolve_body<'a, B>(body: &'a BodyRef, bodies: &'a B) -> Option<&'a [u8]>
where
    B: BodySource + ?Sized,
{
    match body {
        BodyRef::Archived(id) => bodies.body(id),
        BodyRef::Inline(bytes) => Some(bytes.as_slice()),
        BodyRef::Missing => None,
    }
}

/// Build the registry. The capture is cut after the first media exchange,
/// which becomes the last registered exchange and the target.
pub fn build_registry<B>(
    captured: &[CapturedExchange],
    bodies: &B,
    options: &RegistryOptions,
) -> Result<Registry>
where
    B: BodySource + ?Sized,
{
    if captured.is_empty() {
        return Err(ResolveError::EmptyCapture);
    }

    let target_pos = find_target(captured).ok_or(ResolveError::TargetNotFound)?;
    let entries = &captured[..=target_pos];
    let mut exchanges = Vec::with_capacity(entries.len());

    for (pos, entry) in entries.iter().enumerate() {
        let is_target = pos == target_pos;

        let body = resolve_body(&entry.body, bodies);
        if body.is_none() && !is_target {
            debug!("Skipping {} (no resolvable body)", entry.url);
            continue;
        }

        let url = match Url::parse(&entry.url) {
            Ok(url) => url,
            Err(source) if is_target => {
                return Err(ResolveError::InvalidUrl {
                    url: entry.url.clone(),
                    source,
                });
            }
            Err(e) => {
                warn!("Skipping malformed URL {}: {}", entry.url, e);
                continue;
            }
        };

        if options.skip_static_assets && !is_target && is_static_asset(&url) {
            debug!("Skipping static asset {}", entry.url);
            continue;
        }

        exchanges.push(Exchange {
            index: exchanges.len(),
            url: entry.url.clone(),
            body: body.map(<[u8]>::to_vec).unwrap_or_default(),
            tokens: tokenize_url(&url),
            request_signals: request_signals(&entry.request_headers),
            response_signals: response_signals(&entry.response_headers),
        });
    }

    let target = exchanges.len() - 1;
    info!(
        "Registered {} of {} captured exchanges, target {}",
        exchanges.len(),
        captured.len(),
        exchanges[target].url
    );

    Ok(Registry { exchanges, target })
}
