//! PDF rasterisation: render pages to `DynamicImage`s via pdfium, one at a time.
//!
//! pdfium uses thread-local state internally and is not safe to call from
//! async contexts, so rendering runs on a `spawn_blocking` thread that hands
//! pages over a bounded channel. The renderer stays at most
//! [`PAGE_BUFFER`] pages ahead of OCR, so peak memory is a couple of rasters
//! regardless of page count.
//!
//! `render_timeout_secs` bounds opening the document and then each wait for
//! the next page. When it elapses the receiver is dropped, which stops the
//! render thread at its next send.
//!
//! Pages are rendered at `dpi / 72` scale (PDF user space is 72 units per
//! inch), with `max_rendered_pixels` capping either edge, and converted to
//! 8-bit grayscale for the OCR engine.

use crate::config::ExtractionConfig;
use crate::error::{DocTextError, ExtractionFailure};
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Pages the renderer may hold ahead of the consumer.
pub const PAGE_BUFFER: usize = 2;

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 0-based position in the source PDF.
    pub index: usize,
    pub image: DynamicImage,
    pub dpi: u32,
}

impl PageImage {
    /// 1-based page number, as used in logs and failures.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// Result for one page: the raster, or why that page could not be rendered.
pub type PageResult = Result<PageImage, ExtractionFailure>;

/// Sending half handed to a rendering producer.
pub type PageSender = mpsc::Sender<PageResult>;

/// An ordered stream of rendered pages for one document.
///
/// Yields exactly one item per page in ascending order unless the producer
/// stalls past the page timeout or stops early; either case yields one
/// final [`ExtractionFailure::Rasterization`] and ends the stream.
#[derive(Debug)]
pub struct RenderedPages {
    total: usize,
    delivered: usize,
    receiver: Option<mpsc::Receiver<PageResult>>,
    page_timeout: Option<Duration>,
}

impl RenderedPages {
    /// A stream of `total` pages fed through the returned sender.
    pub fn channel(total: usize) -> (PageSender, Self) {
        let (tx, rx) = mpsc::channel(PAGE_BUFFER);
        (
            tx,
            Self {
                total,
                delivered: 0,
                receiver: Some(rx),
                page_timeout: None,
            },
        )
    }

    /// A stream over pages that are already in memory.
    pub fn from_pages(pages: Vec<PageImage>) -> Self {
        let (tx, rx) = mpsc::channel(pages.len().max(1));
        let total = pages.len();
        for page in pages {
            // Capacity covers every page, so this cannot be full.
            let _ = tx.try_send(Ok(page));
        }
        Self {
            total,
            delivered: 0,
            receiver: Some(rx),
            page_timeout: None,
        }
    }

    /// Bound each wait for the next page.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = Some(timeout);
        self
    }

    /// Page count reported by the document.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The next page, or `None` once the stream is finished.
    pub async fn next(&mut self) -> Option<PageResult> {
        let receiver = self.receiver.as_mut()?;
        let received = match self.page_timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    self.receiver = None;
                    return Some(Err(ExtractionFailure::Rasterization {
                        detail: format!(
                            "page {}: timed out after {}s; remaining pages abandoned",
                            self.delivered + 1,
                            limit.as_secs()
                        ),
                    }));
                }
            },
            None => receiver.recv().await,
        };

        match received {
            Some(page) => {
                self.delivered += 1;
                Some(page)
            }
            None => {
                self.receiver = None;
                (self.delivered < self.total).then(|| {
                    Err(ExtractionFailure::Rasterization {
                        detail: format!(
                            "renderer stopped after {} of {} pages",
                            self.delivered, self.total
                        ),
                    })
                })
            }
        }
    }
}

/// Converts a paged document into an ordered stream of page images.
///
/// Implementations return `Err` for any whole-document failure (the
/// document cannot be opened at all); the dispatcher degrades that to zero
/// pages. Failures of single pages travel inside the stream.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn rasterize(&self, path: &Path) -> Result<RenderedPages, ExtractionFailure>;
}

/// [`PageRasterizer`] backed by the pdfium library.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    library_path: Option<PathBuf>,
    timeout: Duration,
}

impl PdfiumRasterizer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            library_path: config.pdfium_library_path.clone(),
            timeout: Duration::from_secs(config.render_timeout_secs),
        }
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn rasterize(&self, path: &Path) -> Result<RenderedPages, ExtractionFailure> {
        let path = path.to_path_buf();
        let dpi = self.dpi;
        let max_pixels = self.max_pixels;
        let library = self.library_path.clone();
        let (opened_tx, opened_rx) = oneshot::channel();

        // Detached: the thread ends when every page is sent or the receiver is gone.
        tokio::task::spawn_blocking(move || {
            render_pages_blocking(&path, dpi, max_pixels, library.as_deref(), opened_tx)
        });

        match tokio::time::timeout(self.timeout, opened_rx).await {
            Ok(Ok(opened)) => opened.map(|pages| pages.with_page_timeout(self.timeout)),
            Ok(Err(_)) => Err(ExtractionFailure::Rasterization {
                detail: "render task ended before opening the document".into(),
            }),
            Err(_) => Err(ExtractionFailure::Rasterization {
                detail: format!("timed out after {}s", self.timeout.as_secs()),
            }),
        }
    }
}

/// Bind to pdfium: the explicit library when configured, otherwise a copy
/// next to the working directory, otherwise the system library.
pub fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, DocTextError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| DocTextError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
///
/// Reports the opened document (or why it could not be opened) through
/// `opened`, then sends pages one at a time. A page that fails to render is
/// sent as a failure and rendering moves on to the next one.
fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    library_path: Option<&Path>,
    opened: oneshot::Sender<Result<RenderedPages, ExtractionFailure>>,
) {
    let pdfium = match bind_pdfium(library_path) {
        Ok(pdfium) => pdfium,
        Err(e) => {
            let _ = opened.send(Err(ExtractionFailure::Rasterization {
                detail: e.to_string(),
            }));
            return;
        }
    };

    let document = match pdfium.load_pdf_from_file(pdf_path, None) {
        Ok(document) => document,
        Err(e) => {
            let _ = opened.send(Err(ExtractionFailure::Rasterization {
                detail: format!("could not open PDF: {:?}", e),
            }));
            return;
        }
    };

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} ({} pages)", pdf_path.display(), total_pages);

    let (tx, rendered) = RenderedPages::channel(total_pages);
    if opened.send(Ok(rendered)).is_err() {
        debug!("Render of {} abandoned before the first page", pdf_path.display());
        return;
    }

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    for (index, page) in pages.iter().enumerate() {
        let result = match page.render_with_config(&render_config) {
            Ok(bitmap) => {
                let image = DynamicImage::ImageLuma8(bitmap.as_image().into_luma8());
                debug!(
                    "Rendered page {} → {}x{} px",
                    index + 1,
                    image.width(),
                    image.height()
                );
                Ok(PageImage { index, image, dpi })
            }
            Err(e) => {
                warn!("Page {} of {} failed to render: {:?}", index + 1, pdf_path.display(), e);
                Err(ExtractionFailure::Rasterization {
                    detail: format!("page {}: {:?}", index + 1, e),
                })
            }
        };

        // Blocks while the consumer is `PAGE_BUFFER` pages behind.
        if tx.blocking_send(result).is_err() {
            debug!(
                "Render of {} abandoned after {} pages",
                pdf_path.display(),
                index + 1
            );
            return;
        }
    }
}
