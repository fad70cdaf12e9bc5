//! Format dispatch: one [`InputDocument`] in, one [`Extraction`] out.
//!
//! | kind            | strategy                                           |
//! |-----------------|----------------------------------------------------|
//! | pdf             | rasterise → OCR each page in order → concatenate   |
//! | docx            | paragraph text, joined by `\n`                     |
//! | txt             | UTF-8 bytes, verbatim                              |
//! | jpg, jpeg, png  | decode → OCR as page 1                             |
//!
//! [`ExtractionDispatcher::extract`] never returns an error. Every failure
//! below it is folded into [`Extraction::failures`] and the text for the
//! affected scope (page or document) is left empty.

use crate::config::ExtractionConfig;
use crate::error::{ExtractionFailure, OcrError};
use crate::output::Extraction;
use crate::pipeline::input::{DocumentKind, InputDocument};
use crate::pipeline::ocr::{Recognizer, TesseractRecognizer};
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::pipeline::structured;
use image::{DynamicImage, ImageReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Routes inputs to the extraction strategy for their kind.
///
/// Cheap to clone; engines are shared behind `Arc`.
#[derive(Clone)]
pub struct ExtractionDispatcher {
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn Recognizer>,
    language: String,
    ocr_timeout: Duration,
}

impl ExtractionDispatcher {
    /// Dispatcher backed by pdfium and tesseract, as configured.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_engines(
            Arc::new(PdfiumRasterizer::new(config)),
            Arc::new(TesseractRecognizer::new(config)),
            config,
        )
    }

    /// Dispatcher over caller-supplied engines.
    pub fn with_engines(
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Arc<dyn Recognizer>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            language: config.ocr_language.clone(),
            ocr_timeout: Duration::from_secs(config.ocr_timeout_secs),
        }
    }

    /// Extract the text of one input.
    pub async fn extract(&self, doc: &InputDocument) -> Extraction {
        debug!("Dispatching {} as {:?}", doc.path().display(), doc.kind());

        let extraction = match doc.kind() {
            DocumentKind::Pdf => self.extract_pdf(doc.path()).await,
            DocumentKind::Docx => from_structured(structured::read_docx(doc.path()).await),
            DocumentKind::Text => from_structured(structured::read_plain_text(doc.path()).await),
            DocumentKind::Jpeg | DocumentKind::Png => self.extract_image(doc.path()).await,
        };

        for failure in &extraction.failures {
            warn!("{}: {}", doc.name(), failure);
        }
        extraction
    }

    async fn extract_pdf(&self, path: &Path) -> Extraction {
        let mut pages = match self.rasterizer.rasterize(path).await {
            Ok(pages) => pages,
            Err(failure) => {
                return Extraction {
                    text: String::new(),
                    pages: 0,
                    failures: vec![failure],
                }
            }
        };

        let total = pages.total();
        info!("Recognising {} pages of {}", total, path.display());

        let mut text = String::new();
        let mut failures = Vec::new();

        // Each page is dropped once recognised, before the next is pulled.
        while let Some(rendered) = pages.next().await {
            let page = match rendered {
                Ok(page) => page,
                Err(failure) => {
                    failures.push(failure);
                    continue;
                }
            };
            let page_num = page.page_num();
            match self.recognize(&page.image, Some(page.dpi)).await {
                Ok(page_text) => {
                    debug!("Page {}/{}: {} chars", page_num, total, page_text.len());
                    text.push_str(&page_text);
                }
                Err(e) => failures.push(ExtractionFailure::Recognition {
                    page: page_num,
                    detail: e.to_string(),
                }),
            }
        }

        Extraction {
            text,
            pages: total,
            failures,
        }
    }

    async fn extract_image(&self, path: &Path) -> Extraction {
        let owned = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || decode_image(&owned))
            .await
            .map_err(|e| format!("decode task panicked: {e}"))
            .and_then(|decoded| decoded);

        let image = match decoded {
            Ok(image) => image,
            Err(detail) => {
                return Extraction {
                    text: String::new(),
                    pages: 0,
                    failures: vec![ExtractionFailure::ImageDecode { detail }],
                }
            }
        };

        match self.recognize(&image, None).await {
            Ok(text) => Extraction {
                text,
                pages: 1,
                failures: Vec::new(),
            },
            Err(e) => Extraction {
                text: String::new(),
                pages: 1,
                failures: vec![ExtractionFailure::Recognition {
                    page: 1,
                    detail: e.to_string(),
                }],
            },
        }
    }

    /// One bounded OCR call, cleaned of engine artefacts.
    async fn recognize(&self, image: &DynamicImage, dpi: Option<u32>) -> Result<String, OcrError> {
        let call = self.recognizer.recognize(image, &self.language, dpi);
        match tokio::time::timeout(self.ocr_timeout, call).await {
            Ok(result) => result.map(|raw| clean_ocr_text(&raw)),
            Err(_) => Err(OcrError::Timeout {
                secs: self.ocr_timeout.as_secs(),
            }),
        }
    }
}

/// Decode a raster by its content; the extension only picked the route here.
fn decode_image(path: &Path) -> Result<DynamicImage, String> {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| e.to_string())?
        .decode()
        .map_err(|e| e.to_string())
}

fn from_structured(result: Result<String, ExtractionFailure>) -> Extraction {
    match result {
        Ok(text) => Extraction {
            text,
            pages: 0,
            failures: Vec::new(),
        },
        Err(failure) => Extraction {
            text: String::new(),
            pages: 0,
            failures: vec![failure],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::{PageImage, RenderedPages};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Renders a fixed number of blank pages whose width encodes the index.
    struct FakePages(usize);

    #[async_trait]
    impl PageRasterizer for FakePages {
        async fn rasterize(&self, _path: &Path) -> Result<RenderedPages, ExtractionFailure> {
            Ok(RenderedPages::from_pages(
                (0..self.0).map(|index| blank_page(index, 300)).collect(),
            ))
        }
    }

    fn blank_page(index: usize, dpi: u32) -> PageImage {
        PageImage {
            index,
            image: DynamicImage::new_luma8(index as u32 + 1, 1),
            dpi,
        }
    }

    /// Three pages whose second one cannot be rendered.
    struct TornPdf;

    #[async_trait]
    impl PageRasterizer for TornPdf {
        async fn rasterize(&self, _path: &Path) -> Result<RenderedPages, ExtractionFailure> {
            let (tx, pages) = RenderedPages::channel(3);
            tokio::spawn(async move {
                let _ = tx.send(Ok(blank_page(0, 300))).await;
                let _ = tx
                    .send(Err(ExtractionFailure::Rasterization {
                        detail: "page 2: bad content stream".into(),
                    }))
                    .await;
                let _ = tx.send(Ok(blank_page(2, 300))).await;
            });
            Ok(pages)
        }
    }

    struct BrokenPdf;

    #[async_trait]
    impl PageRasterizer for BrokenPdf {
        async fn rasterize(&self, _path: &Path) -> Result<RenderedPages, ExtractionFailure> {
            Err(ExtractionFailure::Rasterization {
                detail: "not a PDF".into(),
            })
        }
    }

    /// Reads "page N" back from the image width; fails on the listed pages.
    struct WidthReader {
        fail_on: Vec<u32>,
        languages: Mutex<Vec<String>>,
        resolutions: Mutex<Vec<Option<u32>>>,
    }

    impl WidthReader {
        fn new(fail_on: Vec<u32>) -> Self {
            Self {
                fail_on,
                languages: Mutex::new(Vec::new()),
                resolutions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Recognizer for WidthReader {
        async fn recognize(
            &self,
            image: &DynamicImage,
            language: &str,
            dpi: Option<u32>,
        ) -> Result<String, OcrError> {
            self.languages.lock().unwrap().push(language.to_string());
            self.resolutions.lock().unwrap().push(dpi);
            let page = image.width();
            if self.fail_on.contains(&page) {
                return Err(OcrError::EngineFailed {
                    code: 1,
                    stderr: "boom".into(),
                });
            }
            Ok(format!("page {page}\n\x0c"))
        }
    }

    struct Stalled;

    #[async_trait]
    impl Recognizer for Stalled {
        async fn recognize(
            &self,
            _image: &DynamicImage,
            _language: &str,
            _dpi: Option<u32>,
        ) -> Result<String, OcrError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn dispatcher(r: impl PageRasterizer + 'static, o: impl Recognizer + 'static) -> ExtractionDispatcher {
        ExtractionDispatcher::with_engines(Arc::new(r), Arc::new(o), &ExtractionConfig::default())
    }

    #[tokio::test]
    async fn pdf_pages_concatenate_in_order_without_separator() {
        let d = dispatcher(FakePages(3), WidthReader::new(vec![]));
        let doc = InputDocument::new("scan.pdf").unwrap();
        let out = d.extract(&doc).await;
        assert_eq!(out.text, "page 1\npage 2\npage 3\n");
        assert_eq!(out.pages, 3);
        assert!(!out.is_degraded());
    }

    #[tokio::test]
    async fn failed_page_contributes_empty_text() {
        let d = dispatcher(FakePages(3), WidthReader::new(vec![2]));
        let out = d.extract(&InputDocument::new("scan.pdf").unwrap()).await;
        assert_eq!(out.text, "page 1\npage 3\n");
        assert_eq!(out.failures.len(), 1);
        assert!(matches!(
            out.failures[0],
            ExtractionFailure::Recognition { page: 2, .. }
        ));
    }

    #[tokio::test]
    async fn unrenderable_page_is_skipped_and_the_rest_recognised() {
        let d = dispatcher(TornPdf, WidthReader::new(vec![]));
        let out = d.extract(&InputDocument::new("torn.pdf").unwrap()).await;
        assert_eq!(out.text, "page 1\npage 3\n");
        assert_eq!(out.pages, 3);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].kind(), "rasterization");
        assert!(out.failures[0].to_string().contains("page 2"));
    }

    #[tokio::test]
    async fn page_resolution_reaches_the_engine_but_image_resolution_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        DynamicImage::new_luma8(1, 1).save(&path).unwrap();

        let reader = Arc::new(WidthReader::new(vec![]));
        let d = ExtractionDispatcher::with_engines(
            Arc::new(FakePages(2)),
            reader.clone(),
            &ExtractionConfig::default(),
        );
        d.extract(&InputDocument::new("scan.pdf").unwrap()).await;
        d.extract(&InputDocument::new(&path).unwrap()).await;
        assert_eq!(
            *reader.resolutions.lock().unwrap(),
            vec![Some(300), Some(300), None]
        );
    }

    #[tokio::test]
    async fn rasterization_failure_yields_empty_text() {
        let d = dispatcher(BrokenPdf, WidthReader::new(vec![]));
        let out = d.extract(&InputDocument::new("broken.pdf").unwrap()).await;
        assert_eq!(out.text, "");
        assert_eq!(out.pages, 0);
        assert_eq!(out.failures[0].kind(), "rasterization");
    }

    #[tokio::test]
    async fn zero_page_pdf_is_empty_but_not_degraded() {
        let d = dispatcher(FakePages(0), WidthReader::new(vec![]));
        let out = d.extract(&InputDocument::new("blank.pdf").unwrap()).await;
        assert_eq!(out.text, "");
        assert!(!out.is_degraded());
    }

    #[tokio::test]
    async fn configured_language_reaches_the_engine() {
        let reader = Arc::new(WidthReader::new(vec![]));
        let config = ExtractionConfig::builder().ocr_language("eng").build().unwrap();
        let d = ExtractionDispatcher::with_engines(Arc::new(FakePages(2)), reader.clone(), &config);
        d.extract(&InputDocument::new("scan.pdf").unwrap()).await;
        assert_eq!(*reader.languages.lock().unwrap(), vec!["eng", "eng"]);
    }

    #[tokio::test]
    async fn ocr_timeout_is_a_recognition_failure() {
        let config = ExtractionConfig::builder().ocr_timeout_secs(1).build().unwrap();
        let d = ExtractionDispatcher::with_engines(Arc::new(FakePages(1)), Arc::new(Stalled), &config);

        let out = d.extract(&InputDocument::new("slow.pdf").unwrap()).await;
        assert_eq!(out.text, "");
        assert!(out.failures[0].to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn image_is_recognised_as_page_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PHOTO.PNG");
        DynamicImage::new_luma8(1, 1).save(&path).unwrap();

        let d = dispatcher(FakePages(0), WidthReader::new(vec![]));
        let out = d.extract(&InputDocument::new(&path).unwrap()).await;
        assert_eq!(out.text, "page 1\n");
        assert_eq!(out.pages, 1);
    }

    #[tokio::test]
    async fn image_format_is_sniffed_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("export.png");
        DynamicImage::new_luma8(7, 3).save(&png).unwrap();
        // PNG bytes under a JPEG name, as phone and web exports often are.
        let path = dir.path().join("photo.jpg");
        std::fs::rename(&png, &path).unwrap();

        let d = dispatcher(FakePages(0), WidthReader::new(vec![]));
        let out = d.extract(&InputDocument::new(&path).unwrap()).await;
        assert!(!out.is_degraded(), "{:?}", out.failures);
        assert_eq!(out.text, "page 7\n");
        assert_eq!(out.pages, 1);
    }

    #[tokio::test]
    async fn undecodable_image_is_an_image_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let d = dispatcher(FakePages(0), WidthReader::new(vec![]));
        let out = d.extract(&InputDocument::new(&path).unwrap()).await;
        assert_eq!(out.text, "");
        assert_eq!(out.failures[0].kind(), "image_decode");
    }

    #[tokio::test]
    async fn text_input_bypasses_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.TXT");
        std::fs::write(&path, "line1\nline2").unwrap();

        let reader = Arc::new(WidthReader::new(vec![]));
        let d = ExtractionDispatcher::with_engines(
            Arc::new(FakePages(0)),
            reader.clone(),
            &ExtractionConfig::default(),
        );
        let out = d.extract(&InputDocument::new(&path).unwrap()).await;
        assert_eq!(out.text, "line1\nline2");
        assert!(reader.languages.lock().unwrap().is_empty());
    }
}
