//! Per-archive metadata: the JSON record and the ComicInfo.xml sidecar.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{ChapterManifest, format_chapter_number};

/// Entry name of the JSON metadata record.
pub const METADATA_ENTRY: &str = "metadata.json";

/// Entry name of the comic-metadata sidecar.
pub const COMIC_INFO_ENTRY: &str = "ComicInfo.xml";

/// Machine-readable description of one archived chapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveMetadata {
    pub series: String,
    pub chapter: f64,
    pub volume: u32,
    pub name: String,
    pub chapter_id: Option<String>,
    pub contributors: Vec<String>,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
}

impl ArchiveMetadata {
    /// Describes `manifest` archived with `page_count` staged images.
    #[must_use]
    pub fn new(
        series: &str,
        manifest: &ChapterManifest,
        page_count: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            series: series.to_string(),
            chapter: manifest.number,
            volume: manifest.volume,
            name: manifest.display_name(),
            chapter_id: manifest.id.clone(),
            contributors: manifest.contributors.clone(),
            page_count,
            created_at,
        }
    }

    /// Renders the ComicInfo.xml document.
    #[must_use]
    pub fn comic_info_xml(&self) -> String {
        let number = format_chapter_number(self.chapter);
        let mut lines = vec![
            r#"<?xml version="1.0" encoding="utf-8"?>"#.to_string(),
            r#"<ComicInfo xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">"#.to_string(),
            format!("  <Title>{}</Title>", xml_escape(&self.name)),
            format!("  <Series>{}</Series>", xml_escape(&self.series)),
            format!("  <Number>{}</Number>", xml_escape(&number)),
            format!("  <Volume>{}</Volume>", self.volume),
            format!("  <PageCount>{}</PageCount>", self.page_count),
            format!(
                "  <Summary>{}</Summary>",
                xml_escape(&format!("{}, volume {}, chapter {number}", self.series, self.volume))
            ),
        ];
        if !self.contributors.is_empty() {
            lines.push(format!(
                "  <Translator>{}</Translator>",
                xml_escape(&self.contributors.join(", "))
            ));
        }
        lines.push(format!(
            "  <Notes>Generated by {} {}</Notes>",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ));
        lines.push("</ComicInfo>".to_string());
        lines.join("\n")
    }
}

/// Escapes XML special characters.
#[must_use]
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn sample() -> ArchiveMetadata {
        let manifest = ChapterManifest::from_response(
            54.0,
            6,
            &json!({"id": 77, "name": "Tom & Jerry", "teams": [{"name": "A"}, {"name": "B"}], "pages": ["a"]}),
        );
        let created = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        ArchiveMetadata::new("Kaoru <Hana>", &manifest, 3, created)
    }

    #[test]
    fn test_metadata_record_fields() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["series"], "Kaoru <Hana>");
        assert_eq!(value["chapter"], 54.0);
        assert_eq!(value["volume"], 6);
        assert_eq!(value["name"], "Tom & Jerry");
        assert_eq!(value["chapter_id"], "77");
        assert_eq!(value["contributors"], json!(["A", "B"]));
        assert_eq!(value["page_count"], 3);
        assert_eq!(value["created_at"], "2026-01-02T03:04:05Z");
    }

    #[test]
    fn test_comic_info_escapes_and_lists_fields() {
        let xml = sample().comic_info_xml();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Title>Tom &amp; Jerry</Title>"));
        assert!(xml.contains("<Series>Kaoru &lt;Hana&gt;</Series>"));
        assert!(xml.contains("<Number>54</Number>"));
        assert!(xml.contains("<Volume>6</Volume>"));
        assert!(xml.contains("<PageCount>3</PageCount>"));
        assert!(xml.contains("<Summary>"));
        assert!(xml.contains("<Translator>A, B</Translator>"));
        assert!(xml.contains("<Notes>Generated by chapter-downloader"));
        assert!(xml.ends_with("</ComicInfo>"));
    }

    #[test]
    fn test_comic_info_omits_empty_translator() {
        let mut metadata = sample();
        metadata.contributors.clear();
        assert!(!metadata.comic_info_xml().contains("<Translator>"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"a<b>&"c"'"#), "a&lt;b&gt;&amp;&quot;c&quot;&apos;");
    }
}
