//! Output: persist extracted text as a Word document.
//!
//! Every output has the same shape: one `Title` paragraph reading
//! [`HEADING`], then one body paragraph holding the text. Newlines in the
//! text become line breaks inside that paragraph, not new paragraphs.
//!
//! Writes are atomic. The package is written to a temp file in the target
//! directory and renamed over the destination, so a reader never sees a
//! half-written document and an existing file is replaced whole or not at all.

use crate::config::HEADING;
use crate::error::WriteError;
use crate::pipeline::docx::{self, Paragraph};
use crate::pipeline::postprocess::strip_xml_invalid;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes extraction results to `.docx` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultWriter;

impl ResultWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `text` to `output_path`, replacing any existing file.
    pub async fn write(&self, text: &str, output_path: &Path) -> Result<(), WriteError> {
        let body = strip_xml_invalid(text);
        let path = output_path.to_path_buf();

        tokio::task::spawn_blocking(move || write_blocking(&body, &path))
            .await
            .map_err(|e| WriteError::Package {
                path: output_path.to_path_buf(),
                detail: format!("write task panicked: {e}"),
            })??;

        info!("Wrote {}", output_path.display());
        Ok(())
    }
}

fn write_blocking(body: &str, path: &Path) -> Result<(), WriteError> {
    let bytes = docx::build_package(&[
        Paragraph {
            style: Some("Title"),
            text: HEADING,
        },
        Paragraph {
            style: None,
            text: body,
        },
    ])
    .map_err(|e| WriteError::Package {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    debug!("Built {} byte package for {}", bytes.len(), path.display());

    let dir = parent_dir(path);
    std::fs::create_dir_all(&dir).map_err(|source| WriteError::Directory {
        path: dir.clone(),
        source,
    })?;

    let io_err = |source: std::io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Same directory as the target so the rename never crosses filesystems.
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
    tmp.write_all(&bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn read_back(path: &Path) -> Vec<String> {
        docx::read_paragraphs(File::open(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn heading_then_single_body_paragraph() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a_extracted_text.docx");

        ResultWriter::new().write("one\ntwo", &out).await.unwrap();
        assert_eq!(read_back(&out), vec!["Extracted Text", "one\ntwo"]);
    }

    #[tokio::test]
    async fn body_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("r_extracted_text.docx");
        let text = "Épreuve n°2 : « déjà vu »\n\tcolonne\tsuivante\n\nfin  ";

        ResultWriter::new().write(text, &out).await.unwrap();
        assert_eq!(read_back(&out)[1], text);
    }

    #[tokio::test]
    async fn empty_text_still_writes_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("blank_extracted_text.docx");

        ResultWriter::new().write("", &out).await.unwrap();
        assert_eq!(read_back(&out), vec!["Extracted Text", ""]);
    }

    #[tokio::test]
    async fn existing_output_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o_extracted_text.docx");
        std::fs::write(&out, b"stale").unwrap();

        ResultWriter::new().write("fresh", &out).await.unwrap();
        assert_eq!(read_back(&out)[1], "fresh");
    }

    #[tokio::test]
    async fn missing_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/deeper/x_extracted_text.docx");

        ResultWriter::new().write("x", &out).await.unwrap();
        assert!(out.is_file());
    }

    #[tokio::test]
    async fn control_characters_do_not_break_the_package() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("c_extracted_text.docx");

        ResultWriter::new().write("a\x00b\x1bc", &out).await.unwrap();
        assert_eq!(read_back(&out)[1], "abc");
    }

    #[tokio::test]
    async fn unwritable_target_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("taken_extracted_text.docx");
        // A non-empty directory at the target path cannot be replaced by a file.
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("keep"), b"x").unwrap();

        let err = ResultWriter::new().write("x", &out).await.unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }), "got: {err}");
        // No temp files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
