//! URL inspection: domain extraction and search-query recognition.

use url::Url;

use crate::error::{Result, TimelineError};

// ── Search engines ────────────────────────────────────────────────────────────

/// A search engine whose result pages carry the query in a URL parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchEngine {
    /// Lowercase host name.
    pub host: &'static str,
    /// Query-string parameter holding the search terms.
    pub param: &'static str,
    /// Every page on this host is a search page, regardless of path.
    pub search_only: bool,
}

/// Known search engine hosts.
pub static SEARCH_ENGINES: &[SearchEngine] = &[
    SearchEngine { host: "www.google.com", param: "q", search_only: false },
    SearchEngine { host: "google.com", param: "q", search_only: false },
    SearchEngine { host: "www.bing.com", param: "q", search_only: false },
    SearchEngine { host: "bing.com", param: "q", search_only: false },
    SearchEngine { host: "duckduckgo.com", param: "q", search_only: true },
    SearchEngine { host: "www.duckduckgo.com", param: "q", search_only: true },
    SearchEngine { host: "search.brave.com", param: "q", search_only: false },
    SearchEngine { host: "search.yahoo.com", param: "p", search_only: false },
    SearchEngine { host: "yahoo.com", param: "p", search_only: false },
];

/// Look up the engine registered for `host` (already lowercase).
pub fn search_engine_for(host: &str) -> Option<&'static SearchEngine> {
    SEARCH_ENGINES.iter().find(|e| e.host == host)
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse an absolute URL.
pub fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| TimelineError::UrlParse {
        url: raw.to_string(),
        source,
    })
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Lowercase network location of `raw`: the authority exactly as written
/// (Unicode hosts stay Unicode, ports are kept verbatim) without userinfo.
///
/// Empty for URLs without an authority such as `about:blank`,
/// `file:///notes.txt` or scheme-less text. Only an unbalanced IPv6 bracket
/// is a parse failure.
pub fn network_location(raw: &str) -> Result<String> {
    let rest = match raw.split_once(':') {
        Some((scheme, rest)) if is_scheme(scheme) => rest,
        _ => raw,
    };
    let Some(after_slashes) = rest.strip_prefix("//") else {
        return Ok(String::new());
    };
    let end = after_slashes
        .find(['/', '?', '#'])
        .unwrap_or(after_slashes.len());
    let authority = &after_slashes[..end];
    if authority.contains('[') != authority.contains(']') {
        return Err(TimelineError::UrlParse {
            url: raw.to_string(),
            source: url::ParseError::InvalidIpv6Address,
        });
    }
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);
    Ok(host_port.to_lowercase())
}

/// Search terms carried by `raw`, if it is a recognised search page.
///
/// The engine is looked up by network location; the first non-blank value
/// of its parameter wins.
pub fn search_query(raw: &str) -> Result<Option<String>> {
    let location = network_location(raw)?;
    let Some(engine) = search_engine_for(&location) else {
        return Ok(None);
    };
    let url = parse_url(raw)?;
    if !engine.search_only && !url.path().to_lowercase().contains("search") {
        return Ok(None);
    }
    Ok(url
        .query_pairs()
        .filter(|(key, _)| key == engine.param)
        .map(|(_, value)| value.into_owned())
        .find(|value| !value.is_empty()))
}

/// Domain of `raw`, or an empty string when it cannot be parsed.
pub fn extract_domain(raw: &str) -> String {
    network_location(raw).unwrap_or_default()
}

/// Search query of `raw`, or `None` when it is unparsable or not a search.
pub fn extract_search_query(raw: &str) -> Option<String> {
    search_query(raw).ok().flatten()
}
