//! Post-processing: deterministic cleanup of extracted text.
//!
//! Two passes, applied at different points:
//!
//! * [`clean_ocr_text`] runs on every OCR result before pages are
//!   concatenated. Tesseract ends each page with a form feed and may emit
//!   CRLF on some builds; neither belongs in flat prose.
//! * [`strip_xml_invalid`] runs on the body just before it is written. XML 1.0
//!   cannot represent most C0 control characters, so they are dropped rather
//!   than producing a document Word refuses to open.
//!
//! Word and plain-text extractions are not touched by the first pass: they
//! are returned verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one page of OCR output.
///
/// 1. Drop form feeds (tesseract's page terminator)
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Remove invisible Unicode (zero-width spaces, BOM)
pub fn clean_ocr_text(input: &str) -> String {
    let s = strip_form_feeds(input);
    let s = normalise_line_endings(&s);
    remove_invisible_chars(&s)
}

/// Remove characters that cannot appear in an XML 1.0 document and
/// normalise line endings so every break survives as a `\n`.
pub fn strip_xml_invalid(input: &str) -> String {
    let s = normalise_line_endings(input);
    RE_XML_INVALID.replace_all(&s, "").into_owned()
}

// ── Rule 1: Strip form feeds ─────────────────────────────────────────────────

fn strip_form_feeds(input: &str) -> String {
    input.replace('\x0c', "")
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode ─────────────────────────────────────────

static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}]").unwrap());

fn remove_invisible_chars(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, "").into_owned()
}

// ── XML 1.0 character range ──────────────────────────────────────────────────

// Everything below U+0020 except TAB and LF (CR is already normalised), plus
// the two non-characters U+FFFE / U+FFFF.
static RE_XML_INVALID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\u{FFFE}\u{FFFF}]").unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_feed_page_terminator_removed() {
        assert_eq!(clean_ocr_text("Bonjour\n\x0c"), "Bonjour\n");
    }

    #[test]
    fn crlf_normalised() {
        assert_eq!(clean_ocr_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(clean_ocr_text("\u{FEFF}mot\u{200B}clé"), "motclé");
    }

    #[test]
    fn accents_and_layout_whitespace_survive() {
        let s = "Été\n\n\tçà  et là";
        assert_eq!(clean_ocr_text(s), s);
        assert_eq!(strip_xml_invalid(s), s);
    }

    #[test]
    fn control_characters_dropped_for_xml() {
        assert_eq!(strip_xml_invalid("a\x00b\x07c\x1bd\x0ce"), "abcde");
    }

    #[test]
    fn xml_cleanup_keeps_tabs_and_newlines() {
        assert_eq!(strip_xml_invalid("a\tb\r\nc"), "a\tb\nc");
    }
}
