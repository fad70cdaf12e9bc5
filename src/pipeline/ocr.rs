//! OCR: run the recognition engine over one raster image.
//!
//! The engine is tesseract, driven as a child process. The page is PNG-encoded
//! in memory and piped to `tesseract stdin stdout`, so nothing is written to
//! disk and there is no temp-file cleanup to get wrong.
//!
//! The process is spawned with `kill_on_drop`, which is what makes the
//! dispatcher's timeout effective: dropping the timed-out future kills the
//! engine instead of leaving it running in the background.

use crate::config::ExtractionConfig;
use crate::error::OcrError;
use crate::pipeline::encode::encode_png;
use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Recognises text in a single raster image.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Return the text found in `image`, reading it as `language`.
    ///
    /// `dpi` is the resolution the image was rendered at, when known. Decoded
    /// photos and scans pass `None` and the engine estimates it.
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        dpi: Option<u32>,
    ) -> Result<String, OcrError>;
}

/// [`Recognizer`] backed by the tesseract command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractRecognizer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
        }
    }

    /// Command-line arguments for one recognition call.
    fn args(&self, language: &str, dpi: Option<u32>) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            language.to_string(),
        ];
        if let Some(ref dir) = self.tessdata_dir {
            args.push("--tessdata-dir".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }
        if let Some(dpi) = dpi {
            args.push("--dpi".to_string());
            args.push(dpi.to_string());
        }
        args
    }

    /// Check that the engine can be started, returning its version banner.
    pub async fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|source| OcrError::EngineUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr)
        } else {
            String::from_utf8_lossy(&output.stdout)
        };
        Ok(banner.lines().next().unwrap_or_default().trim().to_string())
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        dpi: Option<u32>,
    ) -> Result<String, OcrError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.binary)
            .args(self.args(language, dpi))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OcrError::EngineUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        // Feed stdin concurrently with draining stdout so a large page cannot
        // deadlock on a full pipe. Dropping `stdin` closes it.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Io(std::io::Error::other("engine stdin unavailable")))?;
        let feeder = tokio::spawn(async move { stdin.write_all(&png).await });

        let output = child.wait_with_output().await?;
        let fed = feeder
            .await
            .map_err(|e| OcrError::Io(std::io::Error::other(e.to_string())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("tesseract failed: {}", stderr);
            return Err(OcrError::EngineFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }
        fed?;

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract returned {} chars", text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_include_language() {
        let r = TesseractRecognizer::new(&ExtractionConfig::default());
        assert_eq!(r.args("fra", None), vec!["stdin", "stdout", "-l", "fra"]);
    }

    #[test]
    fn args_include_tessdata_dir_when_configured() {
        let config = ExtractionConfig::builder()
            .tessdata_dir("/opt/tessdata")
            .build()
            .unwrap();
        let r = TesseractRecognizer::new(&config);
        let args = r.args("eng", None);
        assert_eq!(&args[4..], &["--tessdata-dir", "/opt/tessdata"]);
    }

    #[test]
    fn args_carry_known_resolution() {
        let config = ExtractionConfig::builder()
            .tessdata_dir("/opt/tessdata")
            .build()
            .unwrap();
        let r = TesseractRecognizer::new(&config);
        let args = r.args("fra", Some(300));
        assert_eq!(&args[6..], &["--dpi", "300"]);
        assert!(!r.args("fra", None).contains(&"--dpi".to_string()));
    }

    #[tokio::test]
    async fn missing_engine_is_reported_as_unavailable() {
        let config = ExtractionConfig::builder()
            .tesseract_path("/definitely/not/a/tesseract")
            .build()
            .unwrap();
        let r = TesseractRecognizer::new(&config);
        let err = r
            .recognize(&DynamicImage::new_luma8(4, 4), "fra", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable { .. }), "got: {err}");
    }
}
