//! Text recovery from uploaded files
//!
//! Fallback chain for a remote file:
//! 1. download it and work out what it is (header and magic bytes)
//! 2. PDF: read the text layer page by page
//! 3. PDF with no real text layer (at most `min_text_chars` characters): treat
//!    it as scanned, render every page and OCR it
//! 4. image: OCR it directly
//!
//! Only one extraction runs at a time; a second request is refused while the
//! first is in flight. Progress is reported as 0-100.

pub mod ocr;
pub mod pdf_text;

pub use ocr::{ocr_pages, OcrEngine, PageRenderer, PdftoppmRenderer, TesseractCli};
pub use pdf_text::{extract_pages, join_pages};

use crate::error::{KitError, Result};
use crate::settings;
use crate::utils::ScratchDir;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Largest file the extractor will download (matches the bucket limit)
pub const MAX_DOWNLOAD_BYTES: usize = 52_428_800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    Image,
    Text,
}

impl MediaKind {
    /// Decide from magic bytes first, then from the declared content type.
    pub fn sniff(content_type: Option<&str>, bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(b"%PDF") {
            return Ok(MediaKind::Pdf);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G'])
            || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
            || bytes.starts_with(b"GIF8")
            || (bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
        {
            return Ok(MediaKind::Image);
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match mime.as_str() {
            "application/pdf" => Ok(MediaKind::Pdf),
            m if m.starts_with("image/") => Ok(MediaKind::Image),
            "text/plain" => Ok(MediaKind::Text),
            "" => Err(KitError::UnsupportedMedia("unknown file type".into())),
            other => Err(KitError::UnsupportedMedia(other.to_string())),
        }
    }

    fn image_extension(bytes: &[u8]) -> &'static str {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "jpg"
        } else if bytes.starts_with(b"GIF8") {
            "gif"
        } else if bytes.starts_with(b"RIFF") {
            "webp"
        } else {
            "png"
        }
    }
}

/// Refuses a second extraction while one is running.
#[derive(Default)]
pub struct ExtractionGuard {
    busy: AtomicBool,
}

/// Held for the duration of one extraction; releases the guard on drop.
pub struct ExtractionTicket<'a> {
    guard: &'a ExtractionGuard,
}

impl ExtractionGuard {
    pub fn try_begin(&self) -> Result<ExtractionTicket<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| KitError::ExtractionInFlight)?;
        Ok(ExtractionTicket { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for ExtractionTicket<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

pub struct Extractor {
    engine: Box<dyn OcrEngine + Send + Sync>,
    renderer: Box<dyn PageRenderer + Send + Sync>,
    min_text_chars: usize,
    max_download_bytes: usize,
    guard: ExtractionGuard,
}

impl Extractor {
    pub fn new(
        engine: Box<dyn OcrEngine + Send + Sync>,
        renderer: Box<dyn PageRenderer + Send + Sync>,
        min_text_chars: usize,
    ) -> Self {
        Self {
            engine,
            renderer,
            min_text_chars,
            max_download_bytes: MAX_DOWNLOAD_BYTES,
            guard: ExtractionGuard::default(),
        }
    }

    /// Lower the download cap (defaults to the bucket limit).
    pub fn with_download_limit(mut self, max_bytes: usize) -> Self {
        self.max_download_bytes = max_bytes;
        self
    }

    /// Tesseract + pdftoppm with the configured language and threshold.
    pub fn from_settings() -> Self {
        Self::new(
            Box::new(TesseractCli::new(&settings::get_ocr_language())),
            Box::new(PdftoppmRenderer::default()),
            settings::get_min_text_chars(),
        )
    }

    pub fn guard(&self) -> &ExtractionGuard {
        &self.guard
    }

    /// Download `url` and recover its text.
    pub async fn extract_from_url(
        &self,
        http: &reqwest::Client,
        url: &str,
        progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<String> {
        let _ticket = self.guard.try_begin()?;
        progress(0);

        debug!(url, "Downloading file for extraction");
        let mut response = http.get(url).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let limit = self.max_download_bytes;
        let too_large = || KitError::Validation(format!("File is larger than {} MB", limit / (1024 * 1024)));
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        progress(10);

        self.run(content_type.as_deref(), &bytes, progress)
    }

    /// Recover text from bytes already in memory.
    pub fn extract_from_bytes(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
        progress: &mut dyn FnMut(u8),
    ) -> Result<String> {
        let _ticket = self.guard.try_begin()?;
        progress(0);
        self.run(content_type, bytes, progress)
    }

    fn run(&self, content_type: Option<&str>, bytes: &[u8], progress: &mut dyn FnMut(u8)) -> Result<String> {
        let kind = MediaKind::sniff(content_type, bytes)?;
        debug!(?kind, size = bytes.len(), "Extracting text");

        let text = match kind {
            MediaKind::Text => String::from_utf8_lossy(bytes).trim().to_string(),
            MediaKind::Image => {
                let scratch = ScratchDir::new("casekit-ocr")?;
                let path = scratch
                    .path()
                    .join(format!("image.{}", MediaKind::image_extension(bytes)));
                std::fs::write(&path, bytes)?;
                progress(20);
                self.engine.recognize(&path)?.trim().to_string()
            }
            MediaKind::Pdf => self.run_pdf(bytes, progress)?,
        };

        let chars = text.chars().count();
        if chars == 0 {
            return Err(KitError::EmptyText { chars });
        }
        progress(100);
        info!(?kind, chars, "Extraction finished");
        Ok(text)
    }

    fn run_pdf(&self, bytes: &[u8], progress: &mut dyn FnMut(u8)) -> Result<String> {
        let layer = match extract_pages(bytes) {
            Ok(pages) => join_pages(&pages),
            Err(e) => {
                warn!(error = %e, "Text layer unreadable, trying OCR");
                String::new()
            }
        };
        progress(20);

        let chars = layer.chars().count();
        if chars > self.min_text_chars {
            return Ok(layer);
        }

        info!(chars, threshold = self.min_text_chars, "PDF looks scanned, running OCR");
        let pages = pdf_text::page_count(bytes)?;
        if pages == 0 {
            return Err(KitError::EmptyText { chars });
        }
        ocr_pages(bytes, pages, self.renderer.as_ref(), self.engine.as_ref(), progress, (20, 95))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, MockResponse};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    /// Counts calls and answers with a fixed text.
    struct CountingOcr {
        calls: Arc<AtomicUsize>,
        text: &'static str,
    }

    impl OcrEngine for CountingOcr {
        fn recognize(&self, image: &Path) -> Result<String> {
            assert!(image.exists());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.to_string())
        }
    }

    struct TouchRenderer;

    impl PageRenderer for TouchRenderer {
        fn render_page(&self, _pdf: &Path, page: usize, out_dir: &Path) -> Result<PathBuf> {
            let path = out_dir.join(format!("page-{}.png", page));
            std::fs::write(&path, b"png")?;
            Ok(path)
        }
    }

    fn extractor(text: &'static str) -> (Extractor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = CountingOcr {
            calls: calls.clone(),
            text,
        };
        (Extractor::new(Box::new(engine), Box::new(TouchRenderer), 50), calls)
    }

    /// Minimal PDF with one line of Helvetica text per page (empty string = no text).
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let mut operations = Vec::new();
            if !line.is_empty() {
                operations = vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ];
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }
        let count = kids.len() as i64;
        doc.set_object(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            },
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_sniff() {
        assert_eq!(MediaKind::sniff(None, b"%PDF-1.7\n").unwrap(), MediaKind::Pdf);
        assert_eq!(
            MediaKind::sniff(Some("application/octet-stream"), &[0x89, b'P', b'N', b'G', 0x0D]).unwrap(),
            MediaKind::Image
        );
        assert_eq!(MediaKind::sniff(Some("image/jpeg; q=1"), b"??").unwrap(), MediaKind::Image);
        assert_eq!(MediaKind::sniff(Some("text/plain; charset=utf-8"), b"hi").unwrap(), MediaKind::Text);
        assert!(matches!(
            MediaKind::sniff(Some("application/zip"), b"PK\x03\x04"),
            Err(KitError::UnsupportedMedia(_))
        ));
        assert!(MediaKind::sniff(None, b"????").is_err());
    }

    #[test]
    fn test_text_layer_above_threshold_skips_ocr() {
        let (extractor, calls) = extractor("OCR TEXT");
        let pdf = pdf_with_pages(&[
            "The inspector arrived at three in the morning and the fog was thick.",
            "",
        ]);
        let text = extractor.extract_from_bytes(None, &pdf, &mut |_| {}).unwrap();
        assert!(text.starts_with("--- Page 1 ---"));
        assert!(text.contains("inspector"));
        assert!(!text.contains("--- Page 2 ---"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_text_layer_falls_back_to_ocr() {
        let (extractor, calls) = extractor("Recovered by OCR");
        let pdf = pdf_with_pages(&["p. 1", ""]);
        let mut seen = Vec::new();
        let text = extractor.extract_from_bytes(None, &pdf, &mut |p| seen.push(p)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            text,
            "--- Page 1 ---\n\nRecovered by OCR\n\n--- Page 2 ---\n\nRecovered by OCR"
        );
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_image_goes_straight_to_ocr() {
        let (extractor, calls) = extractor("  handwritten note  ");
        let text = extractor
            .extract_from_bytes(Some("image/png"), &[0x89, b'P', b'N', b'G', 0, 0], &mut |_| {})
            .unwrap();
        assert_eq!(text, "handwritten note");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_ocr_result_is_an_error() {
        let (extractor, _) = extractor("   ");
        let err = extractor
            .extract_from_bytes(Some("image/jpeg"), &[0xFF, 0xD8, 0xFF, 0xE0], &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, KitError::EmptyText { chars: 0 }));
    }

    #[test]
    fn test_second_extraction_refused_while_busy() {
        let (extractor, _) = extractor("x");
        let ticket = extractor.guard().try_begin().unwrap();
        let err = extractor
            .extract_from_bytes(Some("text/plain"), b"hello", &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, KitError::ExtractionInFlight));

        drop(ticket);
        assert!(!extractor.guard().is_busy());
        assert_eq!(
            extractor.extract_from_bytes(Some("text/plain"), b"hello", &mut |_| {}).unwrap(),
            "hello"
        );
        assert!(!extractor.guard().is_busy());
    }

    #[tokio::test]
    async fn test_extract_from_url_downloads_then_extracts() {
        let server = serve(vec![MockResponse::bytes(
            200,
            b"Witness statement, taken on the 22nd.".to_vec(),
            "text/plain",
        )]);
        let (extractor, _) = extractor("unused");
        let http = reqwest::Client::new();
        let url = format!("{}/storage/v1/object/public/case-files/c1/statement.txt", server.url);
        let text = extractor.extract_from_url(&http, &url, &mut |_| {}).await.unwrap();
        assert_eq!(text, "Witness statement, taken on the 22nd.");
        assert!(!extractor.guard().is_busy());
    }

    #[tokio::test]
    async fn test_download_over_limit_is_refused() {
        let server = serve(vec![MockResponse::bytes(
            200,
            b"Witness statement, taken on the 22nd.".to_vec(),
            "text/plain",
        )]);
        let (extractor, calls) = extractor("unused");
        let extractor = extractor.with_download_limit(16);
        let http = reqwest::Client::new();
        let err = extractor
            .extract_from_url(&http, &format!("{}/statement.txt", server.url), &mut |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!extractor.guard().is_busy());
    }

    #[tokio::test]
    async fn test_extract_from_url_network_failure() {
        let server = serve(vec![MockResponse::json(404, r#"{"error":"not found"}"#)]);
        let (extractor, _) = extractor("unused");
        let http = reqwest::Client::new();
        let err = extractor
            .extract_from_url(&http, &format!("{}/missing.pdf", server.url), &mut |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Network(_)));
    }
}
