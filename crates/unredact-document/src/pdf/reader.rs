// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: load a file with `lopdf` and extract every page into the
// document model the engine consumes.

use std::path::Path;

use lopdf::{Document as LoDocument, ObjectId};
use tracing::{debug, info, instrument, warn};
use unredact_core::error::Result;
use unredact_core::{Document, Matrix, Page, UnredactError, Warning, WarningKind};

use super::content::{ContentExtractor, ResourceCache};
use super::objects::{self, number};

/// Page size used when no usable `/MediaBox` is found (US Letter).
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// A document model plus the warnings raised while building it.
#[derive(Debug)]
pub struct Extraction {
    pub document: Document,
    pub warnings: Vec<Warning>,
}

/// Loads a PDF and extracts its pages.
///
/// Loading fails for files that do not parse, are encrypted or contain no
/// pages. Everything after that is best-effort: page-local problems become
/// warnings.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: LoDocument,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        // Read first so a missing or unreadable file stays an I/O error.
        let data = std::fs::read(path_ref)?;
        let document = LoDocument::load_mem(&data).map_err(|err| {
            UnredactError::MalformedPdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        let reader = Self::checked(document, Some(path_ref.display().to_string()))?;

        debug!(pages = reader.page_count(), "PDF loaded");
        Ok(reader)
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = LoDocument::load_mem(data).map_err(|err| {
            UnredactError::MalformedPdf(format!("failed to load PDF from memory: {}", err))
        })?;
        let reader = Self::checked(document, None)?;

        debug!(pages = reader.page_count(), "PDF loaded from bytes");
        Ok(reader)
    }

    fn checked(document: LoDocument, source_path: Option<String>) -> Result<Self> {
        if document.is_encrypted() {
            return Err(UnredactError::Encrypted);
        }
        if document.get_pages().is_empty() {
            return Err(UnredactError::NoPages);
        }
        Ok(Self {
            document,
            source_path,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    // -- Extraction -----------------------------------------------------------

    /// Build the document model: every page's paint program plus the shared
    /// font and image arena.
    #[instrument(skip(self), fields(pages = self.page_count()))]
    pub fn extract(&self) -> Result<Extraction> {
        let mut cache = ResourceCache::new();
        let mut pages = Vec::new();
        let mut warnings = Vec::new();

        // lopdf pages are keyed by 1-indexed page number.
        for (page_number, page_id) in self.document.get_pages() {
            let (page, page_warnings) = self.extract_page(&mut cache, page_number, page_id);
            pages.push(page);
            warnings.extend(page_warnings);
        }
        if pages.is_empty() {
            return Err(UnredactError::NoPages);
        }

        let document = Document {
            pages,
            resources: cache.into_arena(),
        };
        info!(
            pages = document.pages.len(),
            fonts = document.resources.font_count(),
            images = document.resources.image_count(),
            warnings = warnings.len(),
            "PDF extracted"
        );
        Ok(Extraction {
            document,
            warnings,
        })
    }

    fn extract_page(
        &self,
        cache: &mut ResourceCache,
        page_number: u32,
        page_id: ObjectId,
    ) -> (Page, Vec<Warning>) {
        let doc = &self.document;
        let [x0, y0, x1, y1] = objects::inherited(doc, page_id, b"MediaBox")
            .and_then(|o| objects::rect(doc, o))
            .filter(|[x0, y0, x1, y1]| x1 != x0 && y1 != y0)
            .unwrap_or(DEFAULT_MEDIA_BOX);
        let page = Page::new(page_number, (x1 - x0).abs(), (y1 - y0).abs());
        let origin = Matrix::translation(-x0.min(x1), -y0.min(y1));

        let mut early = Vec::new();
        if let Some(rotate) = objects::inherited(doc, page_id, b"Rotate").and_then(number)
            && rotate % 360.0 != 0.0
        {
            early.push(Warning::on_page(
                page_number,
                WarningKind::UnsupportedLayout,
                format!("page rotation of {} degrees is not reproduced", rotate),
            ));
        }

        let resources = objects::inherited(doc, page_id, b"Resources").and_then(|o| objects::dict(doc, o));
        let mut extractor = ContentExtractor::new(doc, cache, page, origin);
        match doc.get_page_content(page_id) {
            Ok(content) => extractor.run(&content, resources),
            Err(err) => {
                warn!(page = page_number, %err, "page content unreadable");
                early.push(Warning::on_page(
                    page_number,
                    WarningKind::UnsupportedLayout,
                    format!("page content could not be read: {}", err),
                ));
            }
        }

        let (page, mut warnings) = extractor.finish();
        early.append(&mut warnings);
        (page, early)
    }
}
