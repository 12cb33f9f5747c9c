// URL decomposition into matching evidence

use percent_encoding::percent_decode_str;
use std::collections::BTreeSet;
use url::Url;

/// Tokens and signals shorter than this carry no identifying information.
pub const MIN_TOKEN_LEN: usize = 2;

/// Split a URL into its significant substrings: every path segment, the host,
/// the decoded fragment and every query-parameter value.
pub fn tokenize_url(url: &Url) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    if let Some(segments) = url.path_segments() {
        tokens.extend(segments.map(str::to_string));
    }
    if let Some(host) = url.host_str() {
        tokens.insert(host.to_string());
    }
    if let Some(fragment) = url.fragment() {
        tokens.insert(percent_decode_str(fragment).decode_utf8_lossy().into_owned());
    }
    tokens.extend(url.query_pairs().map(|(_, value)| value.into_owned()));

    tokens.retain(|token| token.chars().count() >= MIN_TOKEN_LEN);
    tokens
}
