// Evidence matching between a dependent exchange and an earlier candidate source

use crate::model::{Edge, Exchange};
use crate::tokenize::MIN_TOKEN_LEN;
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use memchr::memmem;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::collections::BTreeSet;

/// base64url that writes unpadded and reads either way
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The forms an item may take on its way between exchanges: verbatim,
/// percent-decoded, base64url-encoded and base64url-decoded.
pub fn match_forms(item: &str) -> [Option<Cow<'_, [u8]>>; 4] {
    let percent_decoded = match Cow::<[u8]>::from(percent_decode_str(item)) {
        Cow::Owned(bytes) => Some(Cow::Owned(bytes)),
        Cow::Borrowed(_) => None,
    };

    let encoded = Some(Cow::Owned(BASE64_URL.encode(item).into_bytes()));

    let decoded = BASE64_URL
        .decode(item)
        .ok()
        .filter(|bytes| is_printable_text(bytes))
        .map(Cow::Owned);

    [
        Some(Cow::Borrowed(item.as_bytes())),
        percent_decoded,
        encoded,
        decoded,
    ]
}

/// Decoded garbage is rarely valid text; only keep results that are:
/// UTF-8, at least `MIN_TOKEN_LEN` bytes, no control characters.
fn is_printable_text(bytes: &[u8]) -> bool {
    bytes.len() >= MIN_TOKEN_LEN
        && std::str::from_utf8(bytes).is_ok_and(|text| !text.chars().any(char::is_control))
}

pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && memmem::find(haystack, needle).is_some()
}

/// Whether `source` exposes `form` in its URL tokens, its response headers
/// or its response body.
fn surfaces_contain(source: &Exchange, form: &[u8]) -> bool {
    if let Ok(text) = std::str::from_utf8(form)
        && (source.tokens.contains(text) || source.response_signals.contains(text))
    {
        return true;
    }
    contains_bytes(&source.body, form)
}

/// Whether `source` supplies `item` in any of its forms
pub fn supplies(source: &Exchange, item: &str) -> bool {
    match_forms(item)
        .iter()
        .flatten()
        .any(|form| surfaces_contain(source, form))
}

/// Match an earlier exchange against the needed set of a dependent one.
///
/// With `direct_urls`, a body that quotes the dependent URL verbatim explains
/// all of it. Otherwise the edge carries the needed items the source
/// supplies; `None` when there are none.
pub fn match_exchange(
    source: &Exchange,
    dependent: &Exchange,
    needed: &BTreeSet<String>,
    direct_urls: bool,
) -> Option<Edge> {
    if direct_urls && contains_bytes(&source.body, dependent.url.as_bytes()) {
        return Some(Edge::direct(needed.clone()));
    }

    let provides: BTreeSet<String> = needed
        .iter()
        .filter(|item| supplies(source, item))
        .cloned()
        .collect();

    (!provides.is_empty()).then(|| Edge::new(provides))
}
