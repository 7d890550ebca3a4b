//! Catalog response models and tolerant JSON field access.
//!
//! Catalog responses are loosely typed: numbers sometimes arrive as strings,
//! payloads are sometimes wrapped in `{"data": ...}`, and optional fields go
//! missing. Parsing here never fails; absent fields become empty values and
//! the orchestrator decides what is fatal.

use serde_json::Value;

/// One `{number, volume}` pair from the chapter listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChapterListing {
    /// Chapter number (may be fractional).
    pub number: f64,
    /// Containing volume.
    pub volume: u32,
}

/// One chapter's resolved facts, parsed from a manifest response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterManifest {
    /// Requested chapter number.
    pub number: f64,
    /// Volume the manifest was fetched under.
    pub volume: u32,
    /// Display name; may be empty.
    pub name: String,
    /// Image source paths in page order (entries without a path are dropped).
    pub pages: Vec<String>,
    /// Contributor (team) names.
    pub contributors: Vec<String>,
    /// Number of page entries in the response, including ones without a path.
    pub page_count: usize,
    /// Opaque remote identifier.
    pub id: Option<String>,
    /// Chapter number the response claims for itself, when present.
    pub reported_number: Option<f64>,
}

impl ChapterManifest {
    /// Parses a manifest response fetched for `number` at `volume`.
    #[must_use]
    pub fn from_response(number: f64, volume: u32, body: &Value) -> Self {
        let body = unwrap_data(body);

        let entries = body
            .get("pages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let pages = entries.iter().filter_map(page_path).collect();

        let contributors = body
            .get("teams")
            .and_then(Value::as_array)
            .map(|teams| {
                teams
                    .iter()
                    .filter_map(|team| string_field(team, "name"))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            number,
            volume,
            name: string_field(body, "name").unwrap_or_default(),
            pages,
            contributors,
            page_count: entries.len(),
            id: body.get("id").and_then(scalar_to_string),
            reported_number: body.get("number").and_then(as_f64),
        }
    }

    /// Whether the response's own chapter number contradicts the requested one.
    ///
    /// A response with no chapter number never contradicts.
    #[must_use]
    pub fn contradicts_request(&self) -> bool {
        self.reported_number
            .is_some_and(|reported| !chapter_numbers_equal(reported, self.number))
    }

    /// Display name, falling back to `Chapter {number}`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            format!("Chapter {}", format_chapter_number(self.number))
        } else {
            trimmed.to_string()
        }
    }
}

/// Parses the chapter listing endpoint, skipping malformed entries.
#[must_use]
pub fn parse_chapter_listing(body: &Value) -> Vec<ChapterListing> {
    let Some(entries) = unwrap_data(body).as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            Some(ChapterListing {
                number: entry.get("number").and_then(as_f64)?,
                volume: entry.get("volume").and_then(as_volume)?,
            })
        })
        .collect()
}

/// Series display title from metadata, trying the usual name fields in order.
#[must_use]
pub fn series_title(metadata: &Value) -> Option<String> {
    let metadata = unwrap_data(metadata);
    ["eng_name", "name", "rus_name", "title"]
        .into_iter()
        .find_map(|key| string_field(metadata, key))
}

/// Returns the `data` member of a wrapped response, or the value itself.
#[must_use]
pub fn unwrap_data(body: &Value) -> &Value {
    match body.get("data") {
        Some(inner) if inner.is_object() || inner.is_array() => inner,
        _ => body,
    }
}

/// Reads a JSON number or numeric string as `f64`.
#[must_use]
pub fn as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Reads a JSON number or numeric string as a volume number.
#[must_use]
pub fn as_volume(value: &Value) -> Option<u32> {
    let number = as_f64(value)?;
    if number < 0.0 || number.fract() != 0.0 || number > f64::from(u32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let volume = number as u32;
    Some(volume)
}

/// Float equality for chapter numbers, with `-0.0 == 0.0`.
#[must_use]
pub fn chapter_numbers_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Canonical text form: `54` for whole numbers, `12.5` otherwise.
#[must_use]
pub fn format_chapter_number(number: f64) -> String {
    if number == 0.0 {
        return "0".to_string();
    }
    format!("{number}")
}

/// Canonical form with the integer part zero-padded to `width` digits.
#[must_use]
pub fn pad_chapter_number(number: f64, width: usize) -> String {
    let text = format_chapter_number(number);
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    match digits.split_once('.') {
        Some((int_part, frac_part)) => format!("{sign}{int_part:0>width$}.{frac_part}"),
        None => format!("{sign}{digits:0>width$}"),
    }
}

fn page_path(entry: &Value) -> Option<String> {
    let raw = match entry {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => ["url", "image"]
            .into_iter()
            .find_map(|key| entry.get(key).and_then(Value::as_str)),
        _ => None,
    }?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    let text = value.get(key)?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_manifest_parses_wrapped_response() {
        let body = json!({
            "data": {
                "id": 2_001_554,
                "number": "54",
                "name": "Festival",
                "pages": [
                    {"url": "//img.example/a.jpg"},
                    {"image": "/manga/b.png"},
                    {"url": ""},
                    "https://cdn.example/c.webp"
                ],
                "teams": [{"name": "Team A"}, {"name": ""}, {"id": 5}]
            }
        });
        let manifest = ChapterManifest::from_response(54.0, 6, &body);
        assert_eq!(manifest.name, "Festival");
        assert_eq!(manifest.page_count, 4);
        assert_eq!(
            manifest.pages,
            vec![
                "//img.example/a.jpg",
                "/manga/b.png",
                "https://cdn.example/c.webp"
            ]
        );
        assert_eq!(manifest.contributors, vec!["Team A"]);
        assert_eq!(manifest.id.as_deref(), Some("2001554"));
        assert_eq!(manifest.reported_number, Some(54.0));
        assert!(!manifest.contradicts_request());
    }

    #[test]
    fn test_manifest_tolerates_missing_fields() {
        let manifest = ChapterManifest::from_response(3.0, 1, &json!({}));
        assert_eq!(manifest.page_count, 0);
        assert!(manifest.pages.is_empty());
        assert!(manifest.contributors.is_empty());
        assert_eq!(manifest.id, None);
        assert_eq!(manifest.display_name(), "Chapter 3");
        assert!(!manifest.contradicts_request());
    }

    #[test]
    fn test_manifest_detects_contradicting_number() {
        let manifest = ChapterManifest::from_response(12.0, 2, &json!({"number": 11}));
        assert!(manifest.contradicts_request());
    }

    #[test]
    fn test_listing_skips_malformed_entries() {
        let body = json!({"data": [
            {"number": "1", "volume": "1"},
            {"number": 12.5, "volume": 2},
            {"number": "x", "volume": 2},
            {"number": 13},
            {"number": 14, "volume": "1.5"}
        ]});
        let listing = parse_chapter_listing(&body);
        assert_eq!(
            listing,
            vec![
                ChapterListing {
                    number: 1.0,
                    volume: 1
                },
                ChapterListing {
                    number: 12.5,
                    volume: 2
                },
            ]
        );
    }

    #[test]
    fn test_listing_of_non_array_is_empty() {
        assert!(parse_chapter_listing(&json!({"data": "nope"})).is_empty());
    }

    #[test]
    fn test_series_title_field_order() {
        let meta = json!({"data": {"rus_name": "Р", "eng_name": "Kaoru Hana", "name": "Kaoru"}});
        assert_eq!(series_title(&meta).as_deref(), Some("Kaoru Hana"));
        assert_eq!(
            series_title(&json!({"title": "Only Title"})).as_deref(),
            Some("Only Title")
        );
        assert_eq!(series_title(&json!({"name": "  "})), None);
    }

    #[test]
    fn test_chapter_number_formatting() {
        assert_eq!(format_chapter_number(54.0), "54");
        assert_eq!(format_chapter_number(12.5), "12.5");
        assert_eq!(format_chapter_number(-0.0), "0");
        assert_eq!(pad_chapter_number(7.0, 3), "007");
        assert_eq!(pad_chapter_number(12.5, 3), "012.5");
        assert_eq!(pad_chapter_number(1234.0, 3), "1234");
    }

    #[test]
    fn test_chapter_numbers_equal_normalizes() {
        assert!(chapter_numbers_equal(12.5, 12.5));
        assert!(chapter_numbers_equal(0.0, -0.0));
        assert!(!chapter_numbers_equal(12.0, 12.5));
        assert!(chapter_numbers_equal(as_f64(&json!("12.50")).unwrap(), 12.5));
    }
}
