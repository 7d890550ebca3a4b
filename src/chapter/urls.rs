//! Image URL derivation from manifest page paths.

use url::Url;

/// Extension used when a URL carries none.
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Turns a manifest page path into an absolute URL.
///
/// - `//host/p.jpg` becomes `https://host/p.jpg`
/// - `http(s)://...` is kept
/// - anything else is joined onto `image_host`
///
/// Returns `None` for blank paths and results that do not parse.
#[must_use]
pub fn derive_image_url(path: &str, image_host: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    let candidate = if path.starts_with("//") {
        format!("https:{path}")
    } else if has_http_scheme(path) {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            image_host.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };

    Url::parse(&candidate).ok().map(String::from)
}

/// Lower-cased extension of the URL's last path segment, or `jpg`.
#[must_use]
pub fn image_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let segment = parsed.path_segments()?.next_back()?.to_string();
            let (_, ext) = segment.rsplit_once('.')?;
            let valid = (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
}

/// Positional page file name: `001.jpg`, `002.png`, ...
#[must_use]
pub fn page_file_name(index: usize, extension: &str) -> String {
    format!("{:03}.{extension}", index + 1)
}

fn has_http_scheme(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
