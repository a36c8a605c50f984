// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconstruction: replay output instructions onto a drawing backend.
//
// The backend is abstract so the engine can be tested without producing PDF
// bytes; `unredact-document` provides the printpdf implementation.

use image::RgbImage;
use tracing::{debug, instrument};
use unredact_core::error::Result;
use unredact_core::{
    BoundingBox, FillPath, FontDescriptor, ImageId, ImageResource, OpKind, OutputInstruction,
    Raster, ResolvedText, ResourceArena, TextRun, UnredactError,
};

/// Pixels handed to a surface for one image op.
#[derive(Debug, Clone, Copy)]
pub enum ImageData<'a> {
    /// A document resource; the same id may be drawn many times.
    Shared {
        id: ImageId,
        resource: &'a ImageResource,
    },
    /// Pixels produced by transparency repair, drawn once.
    Owned(&'a RgbImage),
}

/// Drawing operations a writer must support. Every retained op becomes
/// exactly one `fill_path`, `draw_text` or `draw_image` call between
/// `begin_page` and `end_page`.
pub trait DrawingSurface {
    fn begin_page(&mut self, number: u32, width: f64, height: f64) -> Result<()>;

    fn fill_path(&mut self, path: &FillPath) -> Result<()>;

    /// `font` is the source descriptor, present when the text was resolved
    /// to an embedded program.
    fn draw_text(
        &mut self,
        run: &TextRun,
        text: &ResolvedText,
        font: Option<&FontDescriptor>,
    ) -> Result<()>;

    fn draw_image(&mut self, bbox: &BoundingBox, image: ImageData<'_>) -> Result<()>;

    fn end_page(&mut self) -> Result<()>;
}

/// Counts of calls issued for one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub paths: usize,
    pub texts: usize,
    pub images: usize,
}

impl EmitStats {
    pub fn total(&self) -> usize {
        self.paths + self.texts + self.images
    }
}

pub struct Reconstructor<'a> {
    resources: &'a ResourceArena,
}

impl<'a> Reconstructor<'a> {
    pub fn new(resources: &'a ResourceArena) -> Self {
        Self { resources }
    }

    /// Replay one page. Fails only when the surface fails or an op refers to
    /// a resource that is not in the arena; the extractor never produces
    /// such ops.
    #[instrument(skip_all, fields(page = page.page_number()))]
    pub fn emit_page<S: DrawingSurface>(
        &self,
        page: &OutputInstruction,
        surface: &mut S,
    ) -> Result<EmitStats> {
        let mut stats = EmitStats::default();
        surface.begin_page(page.page_number(), page.width(), page.height())?;

        for out in page.ops() {
            match &out.op.kind {
                OpKind::FillPath(path) => {
                    surface.fill_path(path)?;
                    stats.paths += 1;
                }
                OpKind::TextRun(run) => {
                    let text = out.text.as_ref().ok_or_else(|| {
                        UnredactError::Output(format!(
                            "text op {} reached the writer without resolved glyphs",
                            out.op.index
                        ))
                    })?;
                    surface.draw_text(run, text, self.resources.font(run.font))?;
                    stats.texts += 1;
                }
                OpKind::Image(placement) => {
                    let data = match &placement.raster {
                        Raster::Resource(id) => ImageData::Shared {
                            id: *id,
                            resource: self.resources.image(*id).ok_or_else(|| {
                                UnredactError::Output(format!("{} is not in the arena", id))
                            })?,
                        },
                        Raster::Composited(pixels) => ImageData::Owned(pixels),
                    };
                    surface.draw_image(&out.op.bbox, data)?;
                    stats.images += 1;
                }
            }
        }

        surface.end_page()?;
        debug!(ops = stats.total(), "page emitted");
        Ok(stats)
    }

    pub fn emit_all<S: DrawingSurface>(
        &self,
        pages: &[OutputInstruction],
        surface: &mut S,
    ) -> Result<Vec<EmitStats>> {
        pages.iter().map(|page| self.emit_page(page, surface)).collect()
    }
}
