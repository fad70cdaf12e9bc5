//! Structured text reading: Word and plain-text inputs, no OCR.
//!
//! Both readers return the text exactly as stored. An empty document yields
//! an empty string and is not a failure; OCR is never attempted for these
//! kinds even when they contain no text.

use crate::error::ExtractionFailure;
use crate::pipeline::docx;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Word input: body paragraphs in document order joined by `\n`, empty
/// paragraphs kept as empty lines.
pub async fn read_docx(path: &Path) -> Result<String, ExtractionFailure> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExtractionFailure::StructuredRead {
            detail: format!("could not read {}: {e}", path.display()),
        })?;

    // Inflate + XML walk is CPU-bound; keep it off the async workers.
    let paragraphs = tokio::task::spawn_blocking(move || docx::read_paragraphs(Cursor::new(bytes)))
        .await
        .map_err(|e| ExtractionFailure::StructuredRead {
            detail: format!("docx task panicked: {e}"),
        })?
        .map_err(|e| ExtractionFailure::StructuredRead {
            detail: e.to_string(),
        })?;

    debug!(
        "Read {} paragraphs from {}",
        paragraphs.len(),
        path.display()
    );
    Ok(paragraphs.join("\n"))
}

/// Plain-text input: the bytes decoded as UTF-8, verbatim.
pub async fn read_plain_text(path: &Path) -> Result<String, ExtractionFailure> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExtractionFailure::StructuredRead {
            detail: format!("could not read {}: {e}", path.display()),
        })?;

    String::from_utf8(bytes).map_err(|e| ExtractionFailure::StructuredRead {
        detail: format!("{} is not valid UTF-8: {}", path.display(), e.utf8_error()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::docx::Paragraph;

    #[tokio::test]
    async fn docx_paragraphs_joined_with_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.docx");
        let bytes = docx::build_package(&[
            Paragraph { style: None, text: "Hello" },
            Paragraph { style: None, text: "" },
            Paragraph { style: None, text: "World" },
        ])
        .unwrap();
        std::fs::write(&path, bytes).unwrap();

        assert_eq!(read_docx(&path).await.unwrap(), "Hello\n\nWorld");
    }

    #[tokio::test]
    async fn corrupt_docx_is_a_structured_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"PK\x03\x04 truncated").unwrap();

        let err = read_docx(&path).await.unwrap_err();
        assert_eq!(err.kind(), "structured_read");
    }

    #[tokio::test]
    async fn plain_text_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "line1\nline2").unwrap();

        assert_eq!(read_plain_text(&path).await.unwrap(), "line1\nline2");
    }

    #[tokio::test]
    async fn plain_text_keeps_crlf_and_trailing_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dos.txt");
        std::fs::write(&path, "a\r\nb  \n").unwrap();

        assert_eq!(read_plain_text(&path).await.unwrap(), "a\r\nb  \n");
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_structured_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        std::fs::write(&path, b"caf\xe9").unwrap();

        let err = read_plain_text(&path).await.unwrap_err();
        assert!(err.to_string().contains("UTF-8"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_file_is_a_structured_read_failure() {
        let err = read_plain_text(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionFailure::StructuredRead { .. }));
    }
}
