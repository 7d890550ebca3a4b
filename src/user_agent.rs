//! Browser-like request identity shared by catalog and image traffic.
//!
//! The catalog and image host reject obvious tool user agents, so every
//! request presents the same desktop-browser header set. Image requests add
//! Referer/Origin derived from the configured referer.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT,
};

/// Desktop browser User-Agent presented on every request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const ACCEPT_JSON: &str = "application/json, text/plain, */*";
const ACCEPT_IMAGE: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9,ru;q=0.8";

/// Default headers installed on the shared client.
#[must_use]
pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
    );
    headers
}

/// Per-request headers for image downloads.
#[must_use]
pub(crate) fn image_headers(referer: &HeaderValue, origin: &HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_IMAGE));
    headers.insert(REFERER, referer.clone());
    headers.insert(ORIGIN, origin.clone());
    headers
}
