// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The per-page pipeline: transparency repair, detection, occlusion
// resolution and font mapping, producing one `OutputInstruction` per page.

use tracing::{debug, info, instrument};
use unredact_core::diagnostics::PageSummary;
use unredact_core::error::Result;
use unredact_core::{
    Document, EngineConfig, OutputInstruction, Page, Report, ResourceArena, UnredactError, Warning,
};

use crate::detector::{RedactionCandidate, RedactionDetector};
use crate::fonts::FontMapper;
use crate::occlusion::OcclusionResolver;
use crate::transparency::TransparencyRepair;

/// Everything produced for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub instruction: OutputInstruction,
    pub summary: PageSummary,
    pub warnings: Vec<Warning>,
}

/// Output of a whole-document run.
#[derive(Debug, Clone)]
pub struct Unredacted {
    pub pages: Vec<OutputInstruction>,
    pub report: Report,
}

/// Holds only immutable configuration, so one instance can serve many
/// documents and threads.
#[derive(Debug, Clone, Default)]
pub struct Unredactor {
    config: EngineConfig,
}

impl Unredactor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process every page in order. Page-local problems end up in the
    /// report; only an empty document is an error.
    #[instrument(skip_all, fields(pages = document.pages.len()))]
    pub fn process(&self, document: &Document) -> Result<Unredacted> {
        if document.pages.is_empty() {
            return Err(UnredactError::NoPages);
        }

        let mut report = Report::new();
        let mut pages = Vec::with_capacity(document.pages.len());
        for page in &document.pages {
            let outcome = self.process_page(page, &document.resources);
            report.extend_warnings(outcome.warnings);
            report.pages.push(outcome.summary);
            pages.push(outcome.instruction);
        }

        info!(
            pages = pages.len(),
            occluders = report.occluders_removed(),
            revealed = report.ops_revealed(),
            warnings = report.warnings.len(),
            "document processed"
        );
        Ok(Unredacted { pages, report })
    }

    #[instrument(skip_all, fields(page = page.number, ops = page.ops.len()))]
    pub fn process_page(&self, page: &Page, resources: &ResourceArena) -> PageOutcome {
        let repaired = TransparencyRepair::new(&self.config).repair(&page.ops, resources);
        let candidates = self.detect(&repaired.ops, resources);
        let mut resolution =
            OcclusionResolver::new(self.config.min_overlap_fraction).resolve(&repaired.ops, &candidates);
        let warnings =
            FontMapper::new(&self.config.fonts).map_page(page.number, &mut resolution.ops, resources);

        let summary = PageSummary {
            page: page.number,
            input_ops: page.ops.len(),
            output_ops: resolution.ops.len(),
            candidates: candidates
                .iter()
                .zip(&resolution.occlusions)
                .map(|(candidate, occlusion)| candidate.summary(occlusion.covered.len()))
                .collect(),
            revealed: resolution.revealed(),
            repaired_images: repaired.pairs_merged,
        };
        debug!(
            candidates = summary.candidates.len(),
            revealed = summary.revealed,
            repaired = summary.repaired_images,
            "page processed"
        );

        PageOutcome {
            instruction: OutputInstruction::new(page.number, page.width, page.height, resolution.ops),
            summary,
            warnings,
        }
    }

    /// Run detection alone, e.g. to check that processed output is clean.
    pub fn detect(
        &self,
        ops: &[unredact_core::DrawOp],
        resources: &ResourceArena,
    ) -> Vec<RedactionCandidate> {
        RedactionDetector::new(&self.config).detect(ops, resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::Reconstructor;
    use crate::reconstruct::tests::Recorder;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use unredact_core::geometry::rectangle;
    use unredact_core::{
        BoundingBox, Color, Disposition, FillPath, FillRule, FontDescriptor, FontId, Glyph,
        ImagePlacement, ImageResource, OpKind, PaintMode, Point, Raster, TextRun, WarningKind,
    };

    fn fill(bbox: BoundingBox, color: Color) -> OpKind {
        OpKind::FillPath(FillPath {
            segments: rectangle(bbox),
            fill_color: color,
            fill_rule: FillRule::NonZero,
            mode: PaintMode::Fill,
            stroke_color: Color::default(),
            line_width: 1.0,
        })
    }

    fn text(word: &str, font: FontId) -> OpKind {
        OpKind::TextRun(TextRun {
            glyphs: word
                .bytes()
                .enumerate()
                .map(|(i, b)| Glyph {
                    code: b as u32,
                    offset: i as f64 * 6.0,
                    break_before: false,
                })
                .collect(),
            origin: Point::new(10.0, 12.0),
            font,
            font_size: 10.0,
            fill_color: Color::default(),
            upright: true,
            invisible: false,
        })
    }

    /// "SECRET" at (10,10)-(60,20) under a black box at (8,8)-(62,22).
    fn redacted_document() -> Document {
        let mut resources = ResourceArena::new();
        let font = resources.add_font(FontDescriptor::named("Helvetica"));
        let mut page = Page::new(1, 612.0, 792.0);
        page.push(BoundingBox::new(10.0, 10.0, 60.0, 20.0), text("SECRET", font));
        let mark = BoundingBox::new(8.0, 8.0, 62.0, 22.0);
        page.push(mark, fill(mark, Color::Rgb(0.0, 0.0, 0.0)));
        Document {
            pages: vec![page],
            resources,
        }
    }

    #[test]
    fn secret_text_is_revealed() {
        let document = redacted_document();
        let result = Unredactor::default().process(&document).unwrap();

        let ops = result.pages[0].ops();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].disposition, Disposition::Revealed);
        assert_eq!(ops[0].text.as_ref().unwrap().text(), "SECRET");
        assert_eq!(result.report.occluders_removed(), 1);
        assert_eq!(result.report.ops_revealed(), 1);
        assert!(result.report.warnings.is_empty());
    }

    #[test]
    fn detection_on_output_finds_nothing() {
        let document = redacted_document();
        let unredactor = Unredactor::default();
        let result = unredactor.process(&document).unwrap();
        let again = unredactor.detect(&result.pages[0].draw_ops(), &document.resources);
        assert!(again.is_empty());
    }

    #[test]
    fn clean_page_passes_through_unchanged() {
        let mut resources = ResourceArena::new();
        let font = resources.add_font(FontDescriptor::named("Courier"));
        // A half-transparent red logo on a clean page.
        let logo = resources.add_image(ImageResource {
            name: "Logo".into(),
            pixels: DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([220, 20, 20]))),
            soft_mask: Some(GrayImage::from_pixel(8, 8, Luma([128]))),
        });
        let mut page = Page::new(1, 200.0, 200.0);
        page.push(BoundingBox::new(0.0, 0.0, 50.0, 50.0), fill(BoundingBox::new(0.0, 0.0, 50.0, 50.0), Color::Gray(0.9)));
        page.push(BoundingBox::new(10.0, 10.0, 40.0, 20.0), text("hello", font));
        page.push(BoundingBox::new(100.0, 100.0, 101.0, 101.0), fill(BoundingBox::new(100.0, 100.0, 101.0, 101.0), Color::Gray(0.0)));
        page.push(
            BoundingBox::new(120.0, 120.0, 180.0, 180.0),
            OpKind::Image(ImagePlacement { raster: Raster::Resource(logo) }),
        );
        let document = Document {
            pages: vec![page.clone()],
            resources,
        };

        let result = Unredactor::default().process(&document).unwrap();
        assert_eq!(result.pages[0].draw_ops(), page.ops);
        assert!(result.pages[0].ops().iter().all(|o| o.disposition == Disposition::Unchanged));
        assert_eq!(result.report.occluders_removed(), 0);
        assert_eq!(result.report.pages[0].repaired_images, 0);
    }

    #[test]
    fn retained_ops_are_a_stable_subsequence() {
        let mut resources = ResourceArena::new();
        let font = resources.add_font(FontDescriptor::named("Helvetica"));
        let mut page = Page::new(1, 300.0, 300.0);
        for i in 0..6 {
            let y = i as f64 * 40.0;
            page.push(BoundingBox::new(10.0, y, 60.0, y + 10.0), text("word", font));
            if i % 2 == 0 {
                let mark = BoundingBox::new(8.0, y - 2.0, 62.0, y + 12.0);
                page.push(mark, fill(mark, Color::Gray(0.0)));
            }
        }
        let document = Document {
            pages: vec![page.clone()],
            resources,
        };

        let result = Unredactor::default().process(&document).unwrap();
        let kept: Vec<usize> = result.pages[0].ops().iter().map(|o| o.op.index).collect();
        assert_eq!(kept.len(), 6);
        assert!(kept.windows(2).all(|w| w[0] < w[1]));
        for out in result.pages[0].ops() {
            assert_eq!(out.op, page.ops[out.op.index]);
        }
    }

    #[test]
    fn transparency_pair_survives_detection() {
        let mut resources = ResourceArena::new();
        let lower = resources.add_image(ImageResource {
            name: "Im0".into(),
            pixels: DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))),
            soft_mask: None,
        });
        let upper = resources.add_image(ImageResource {
            name: "Im1".into(),
            pixels: DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, y| {
                if x == y { Rgb([200, 30, 30]) } else { Rgb([0, 0, 0]) }
            })),
            soft_mask: None,
        });
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let mut page = Page::new(1, 100.0, 100.0);
        page.push(bbox, OpKind::Image(ImagePlacement { raster: Raster::Resource(lower) }));
        page.push(bbox, OpKind::Image(ImagePlacement { raster: Raster::Resource(upper) }));
        let document = Document {
            pages: vec![page],
            resources,
        };

        let result = Unredactor::default().process(&document).unwrap();
        let ops = result.pages[0].ops();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op.index, 1);
        assert!(matches!(
            &ops[0].op.kind,
            OpKind::Image(ImagePlacement { raster: Raster::Composited(_) })
        ));
        assert_eq!(result.report.pages[0].repaired_images, 1);
        assert_eq!(result.report.occluders_removed(), 0);
    }

    #[test]
    fn unknown_font_falls_back_with_warning() {
        let mut resources = ResourceArena::new();
        let font = resources.add_font(FontDescriptor::named("ObscureGrotesk"));
        let mut page = Page::new(2, 100.0, 100.0);
        page.push(BoundingBox::new(0.0, 0.0, 30.0, 10.0), text("abc", font));
        let document = Document {
            pages: vec![page],
            resources,
        };

        let result = Unredactor::default().process(&document).unwrap();
        let warnings: Vec<_> = result.report.warnings_of(WarningKind::FontFallback).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].page, Some(2));
        assert_eq!(result.pages[0].ops()[0].text.as_ref().unwrap().glyph_count, 3);
    }

    #[test]
    fn output_replays_onto_a_surface() {
        let document = redacted_document();
        let result = Unredactor::default().process(&document).unwrap();
        let mut recorder = Recorder::default();
        Reconstructor::new(&document.resources)
            .emit_all(&result.pages, &mut recorder)
            .unwrap();
        assert_eq!(recorder.calls, vec!["begin 1 612x792", "text SECRET", "end"]);
    }

    #[test]
    fn empty_document_is_rejected() {
        let result = Unredactor::default().process(&Document::default());
        assert!(matches!(result, Err(UnredactError::NoPages)));
    }

    #[test]
    fn unredactor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Unredactor>();
    }
}
