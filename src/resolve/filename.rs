//! Display filename derivation for converted files.
//!
//! The service stores results as `<id>_<original name>`; the id prefix is
//! dropped and the extension remapped to what the conversion produces.

/// Extension of bundles the service returns for multi-page image output.
const ARCHIVE_EXTENSION: &str = ".zip";

/// Stem used when the path has no usable final segment.
const FALLBACK_STEM: &str = "converted";

/// Derives the human filename for a stored result path.
///
/// `output_extension` includes the leading dot (`.jpg`).
#[must_use]
pub fn derive_filename(path: &str, output_extension: &str) -> String {
    let segment = final_segment(path);
    if segment.is_empty() {
        return format!("{FALLBACK_STEM}{output_extension}");
    }
    apply_output_extension(strip_id_prefix(&segment), output_extension)
}

/// Last `/`-segment without query or fragment, percent-decoded.
fn final_segment(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let last = path[..end].rsplit('/').next().unwrap_or_default();
    urlencoding::decode(last).map_or_else(|_| last.to_string(), std::borrow::Cow::into_owned)
}

/// Drops everything up to and including the first `_`.
///
/// Kept verbatim: names without `_`, names whose only `_` is the leading
/// character, and names the strip would empty.
pub(crate) fn strip_id_prefix(name: &str) -> &str {
    let Some((_, rest)) = name.split_once('_') else {
        return name;
    };
    if rest.is_empty() || (name.starts_with('_') && !rest.contains('_')) {
        return name;
    }
    rest
}

fn apply_output_extension(name: &str, output_extension: &str) -> String {
    match extension_start(name) {
        Some(dot) => {
            let current = &name[dot..];
            if current.eq_ignore_ascii_case(output_extension)
                || current.eq_ignore_ascii_case(ARCHIVE_EXTENSION)
            {
                name.to_string()
            } else {
                format!("{}{output_extension}", &name[..dot])
            }
        }
        None => format!("{name}{output_extension}"),
    }
}

/// Byte index of the extension dot, ignoring a leading dot (`.hidden`).
fn extension_start(name: &str) -> Option<usize> {
    name.rfind('.').filter(|&dot| dot > 0 && dot + 1 < name.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_filename_strips_id_and_remaps_extension() {
        assert_eq!(derive_filename("converted_files/42_report.pdf", ".jpg"), "report.jpg");
    }

    #[test]
    fn test_derive_filename_keeps_matching_extension() {
        assert_eq!(derive_filename("/media/out/7_x.html", ".html"), "x.html");
        assert_eq!(derive_filename("/media/out/7_SCAN.PDF", ".pdf"), "SCAN.PDF");
    }

    #[test]
    fn test_derive_filename_only_first_underscore_is_stripped() {
        assert_eq!(
            derive_filename("/media/9_my_big_report.pdf", ".docx"),
            "my_big_report.docx"
        );
    }

    #[test]
    fn test_derive_filename_without_underscore_is_verbatim() {
        assert_eq!(derive_filename("/media/report.html", ".html"), "report.html");
    }

    #[test]
    fn test_derive_filename_leading_underscore_only_is_verbatim() {
        assert_eq!(derive_filename("/media/_report.pdf", ".pdf"), "_report.pdf");
        assert_eq!(derive_filename("/media/_a_b.pdf", ".pdf"), "a_b.pdf");
    }

    #[test]
    fn test_derive_filename_empty_strip_is_verbatim() {
        assert_eq!(derive_filename("/media/abc_", ".pdf"), "abc_.pdf");
    }

    #[test]
    fn test_derive_filename_appends_missing_extension() {
        assert_eq!(derive_filename("/media/3_notes", ".docx"), "notes.docx");
    }

    #[test]
    fn test_derive_filename_keeps_archive_bundle() {
        assert_eq!(derive_filename("/media/5_pages.zip", ".jpg"), "pages.zip");
    }

    #[test]
    fn test_derive_filename_ignores_query_and_decodes() {
        assert_eq!(
            derive_filename("/media/12_my%20file.pdf?sig=abc#top", ".png"),
            "my file.png"
        );
    }

    #[test]
    fn test_derive_filename_empty_segment_falls_back() {
        assert_eq!(derive_filename("/media/out/", ".webp"), "converted.webp");
        assert_eq!(derive_filename("", ".pdf"), "converted.pdf");
    }

    #[test]
    fn test_extension_start_ignores_leading_dot() {
        assert_eq!(extension_start(".hidden"), None);
        assert_eq!(extension_start("name."), None);
        assert_eq!(extension_start("a.b.pdf"), Some(3));
    }
}
