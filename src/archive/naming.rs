//! Filesystem-safe names for archives and their directories.

use crate::catalog::pad_chapter_number;

/// Maximum length of an archive file name, extension included.
pub const MAX_FILE_NAME_CHARS: usize = 200;

/// Archive extension.
pub const ARCHIVE_EXTENSION: &str = "cbz";

/// Replaces path-hostile characters with `_` and trims trailing dots and spaces.
///
/// Returns `_` when nothing printable remains.
#[must_use]
pub fn sanitize_component(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Archive file name: `{chapter:03}ch - {name} - vol{volume:02}.cbz`.
///
/// The stem is cut so the whole name stays within [`MAX_FILE_NAME_CHARS`].
#[must_use]
pub fn archive_file_name(chapter: f64, name: &str, volume: u32) -> String {
    let stem = format!(
        "{}ch - {} - vol{volume:02}",
        pad_chapter_number(chapter, 3),
        name.trim()
    );
    let stem = sanitize_component(&stem);
    let budget = MAX_FILE_NAME_CHARS - ARCHIVE_EXTENSION.len() - 1;
    let stem: String = stem.chars().take(budget).collect();
    format!("{}.{ARCHIVE_EXTENSION}", stem.trim_end())
}

/// Sub-directory used when grouping archives by volume.
#[must_use]
pub fn volume_dir_name(volume: u32) -> String {
    format!("Volume {volume:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_file_name_format() {
        assert_eq!(
            archive_file_name(54.0, "Festival", 6),
            "054ch - Festival - vol06.cbz"
        );
        assert_eq!(
            archive_file_name(12.5, "Half", 2),
            "012.5ch - Half - vol02.cbz"
        );
        assert_eq!(
            archive_file_name(1234.0, "Big", 123),
            "1234ch - Big - vol123.cbz"
        );
    }

    #[test]
    fn test_path_hostile_characters_replaced() {
        assert_eq!(
            archive_file_name(3.0, "Who? Me: <yes>/no", 1),
            "003ch - Who_ Me_ _yes__no - vol01.cbz"
        );
        assert_eq!(sanitize_component("a\\b|c*d\"e"), "a_b_c_d_e");
        assert_eq!(sanitize_component("tab\there"), "tab_here");
    }

    #[test]
    fn test_long_names_truncated_to_limit() {
        let name = "x".repeat(500);
        let file = archive_file_name(1.0, &name, 1);
        assert_eq!(file.chars().count(), MAX_FILE_NAME_CHARS);
        assert!(file.ends_with(".cbz"));
        assert!(file.starts_with("001ch - xxx"));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let name = "ж".repeat(300);
        let file = archive_file_name(1.0, &name, 1);
        assert_eq!(file.chars().count(), MAX_FILE_NAME_CHARS);
    }

    #[test]
    fn test_sanitize_component_edge_cases() {
        assert_eq!(sanitize_component("   "), "_");
        assert_eq!(sanitize_component(".."), "_");
        assert_eq!(sanitize_component("Title. "), "Title");
        assert_eq!(sanitize_component("Kaoru Hana"), "Kaoru Hana");
    }

    #[test]
    fn test_volume_dir_name() {
        assert_eq!(volume_dir_name(3), "Volume 03");
        assert_eq!(volume_dir_name(12), "Volume 12");
    }
}
