// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core document model: pages, draw operations, and the shared resource arena.
//
// Pages and draw operations refer to fonts and images by id only; the arena
// owned by `Document` is the single owner of decoded resources.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::config::StandardFont;
use crate::geometry::{BoundingBox, PathSegment, Point};

/// Handle to a font in [`ResourceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FontId(pub u32);

/// Handle to a raster in [`ResourceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u32);

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font#{}", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

// -- Draw operations -----------------------------------------------------------

/// One character code of a text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// Raw code from the content stream (one byte for simple fonts, two for
    /// Type0 fonts).
    pub code: u32,
    /// Distance along the baseline from the run origin, in points.
    pub offset: f64,
    /// Set when a `TJ` displacement preceded this glyph, so a writer using
    /// its own metrics should restart the cursor here.
    pub break_before: bool,
}

/// Text painted by one show-text operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub glyphs: Vec<Glyph>,
    /// Baseline origin of the first glyph in page space.
    pub origin: Point,
    pub font: FontId,
    /// Effective size in points (`Tf` size scaled by the text and CTM
    /// matrices).
    pub font_size: f64,
    pub fill_color: Color,
    /// False when the text matrix rotates or skews the run.
    pub upright: bool,
    /// Rendering modes 3 and 7: the run is laid out but paints nothing.
    pub invisible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaintMode {
    Fill,
    Stroke,
    FillStroke,
}

/// A painted path outline.
#[derive(Debug, Clone, PartialEq)]
pub struct FillPath {
    pub segments: Vec<PathSegment>,
    pub fill_color: Color,
    pub fill_rule: FillRule,
    pub mode: PaintMode,
    pub stroke_color: Color,
    pub line_width: f64,
}

impl FillPath {
    /// Whether the interior of the path is painted.
    pub fn is_filled(&self) -> bool {
        matches!(self.mode, PaintMode::Fill | PaintMode::FillStroke)
    }
}

/// Pixel source of a placed image.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    /// A decoded XObject owned by the document arena.
    Resource(ImageId),
    /// Pixels produced during processing (transparency repair).
    Composited(Arc<RgbImage>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub raster: Raster,
}

/// The closed set of paint operations.
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    TextRun(TextRun),
    FillPath(FillPath),
    Image(ImagePlacement),
}

impl OpKind {
    pub fn label(&self) -> &'static str {
        match self {
            OpKind::TextRun(_) => "text",
            OpKind::FillPath(_) => "path",
            OpKind::Image(_) => "image",
        }
    }
}

/// A paint operation stamped with its paint order and page-space bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOp {
    /// Position in the page's paint order; 0 is painted first.
    pub index: usize,
    /// Axis-aligned bounds, already narrowed by the active clip.
    pub bbox: BoundingBox,
    pub kind: OpKind,
}

// -- Fonts ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontSubtype {
    Type1,
    TrueType,
    Type0,
    Type3,
    Unknown,
}

/// An embedded font program, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum FontProgram {
    TrueType(Arc<Vec<u8>>),
    Type1(Arc<Vec<u8>>),
    OpenType(Arc<Vec<u8>>),
}

/// Everything the pipeline needs to know about a font referenced by text.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    /// `/BaseFont` as written in the file, including any subset tag.
    pub base_font: String,
    pub subtype: FontSubtype,
    pub program: Option<FontProgram>,
    /// Code → text from the font's ToUnicode CMap.
    pub to_unicode: BTreeMap<u32, String>,
    /// Code → glyph name from `/Encoding /Differences`.
    pub differences: BTreeMap<u32, String>,
    /// Codes are two bytes wide (Type0 / Identity-H).
    pub two_byte: bool,
    /// Advance widths in thousandths of an em.
    pub widths: BTreeMap<u32, f64>,
    pub default_width: f64,
}

impl FontDescriptor {
    /// A bare descriptor for a font known only by name.
    pub fn named(base_font: impl Into<String>) -> Self {
        Self {
            base_font: base_font.into(),
            subtype: FontSubtype::Type1,
            program: None,
            to_unicode: BTreeMap::new(),
            differences: BTreeMap::new(),
            two_byte: false,
            widths: BTreeMap::new(),
            default_width: 500.0,
        }
    }

    /// True when the name carries a six-letter subset tag (`ABCDEF+Name`).
    pub fn is_subset(&self) -> bool {
        subset_tag_len(&self.base_font).is_some()
    }

    /// Base font name with any subset tag removed.
    pub fn family_name(&self) -> &str {
        match subset_tag_len(&self.base_font) {
            Some(len) => &self.base_font[len..],
            None => &self.base_font,
        }
    }

    /// Advance width of `code` in thousandths of an em.
    pub fn width(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }
}

fn subset_tag_len(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    if bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(|b| b.is_ascii_uppercase()) {
        Some(7)
    } else {
        None
    }
}

// -- Images --------------------------------------------------------------------

/// A decoded image XObject.
#[derive(Debug, Clone)]
pub struct ImageResource {
    /// Resource name the image was first seen under (e.g. `Im0`).
    pub name: String,
    pub pixels: DynamicImage,
    /// Decoded `/SMask`, resized to the image dimensions.
    pub soft_mask: Option<GrayImage>,
}

// -- Arena, pages, document ----------------------------------------------------

/// Shared, read-only (once built) storage for fonts and images.
#[derive(Debug, Clone, Default)]
pub struct ResourceArena {
    fonts: Vec<FontDescriptor>,
    images: Vec<ImageResource>,
}

impl ResourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_font(&mut self, font: FontDescriptor) -> FontId {
        self.fonts.push(font);
        FontId((self.fonts.len() - 1) as u32)
    }

    pub fn add_image(&mut self, image: ImageResource) -> ImageId {
        self.images.push(image);
        ImageId((self.images.len() - 1) as u32)
    }

    pub fn font(&self, id: FontId) -> Option<&FontDescriptor> {
        self.fonts.get(id.0 as usize)
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageResource> {
        self.images.get(id.0 as usize)
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// One page of the input, as an ordered paint program.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-indexed page number.
    pub number: u32,
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn new(number: u32, width: f64, height: f64) -> Self {
        Self {
            number,
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Append an op, stamping it with the next paint index.
    pub fn push(&mut self, bbox: BoundingBox, kind: OpKind) -> usize {
        let index = self.ops.len();
        self.ops.push(DrawOp { index, bbox, kind });
        index
    }
}

/// An input document: pages plus the resources they share.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub pages: Vec<Page>,
    pub resources: ResourceArena,
}

// -- Output --------------------------------------------------------------------

/// Why an op appears in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Not involved in any redaction.
    Unchanged,
    /// Was covered by a removed occluder.
    Revealed,
}

/// Font a writer should use for a resolved text run.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedFont {
    /// Reuse the document's embedded program.
    Embedded { font: FontId, fallback: StandardFont },
    Standard(StandardFont),
}

impl ResolvedFont {
    /// The standard font to use when the embedded program is unusable.
    pub fn standard(&self) -> StandardFont {
        match self {
            ResolvedFont::Embedded { fallback, .. } => *fallback,
            ResolvedFont::Standard(font) => *font,
        }
    }
}

/// Contiguous piece of a text run that can be written with one cursor move.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    /// Distance along the baseline from the run origin, in points.
    pub offset: f64,
    pub text: String,
}

/// A text run translated into characters the writer can render.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedText {
    pub font: ResolvedFont,
    pub segments: Vec<TextSegment>,
    /// Glyphs that resolved to real text. Placeholders are not counted, so
    /// this plus the run's unmapped count is the source glyph count.
    pub glyph_count: usize,
}

impl ResolvedText {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// One retained op of the output page.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOp {
    pub op: DrawOp,
    pub disposition: Disposition,
    /// Present for text runs once the font mapper has run.
    pub text: Option<ResolvedText>,
}

/// Final, immutable paint program for one output page.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInstruction {
    page_number: u32,
    width: f64,
    height: f64,
    ops: Vec<OutputOp>,
}

impl OutputInstruction {
    /// Ops are stored in ascending source paint order.
    pub fn new(page_number: u32, width: f64, height: f64, mut ops: Vec<OutputOp>) -> Self {
        ops.sort_by_key(|o| o.op.index);
        Self {
            page_number,
            width,
            height,
            ops,
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn ops(&self) -> &[OutputOp] {
        &self.ops
    }

    /// The retained ops as plain draw ops, e.g. to run detection again.
    pub fn draw_ops(&self) -> Vec<DrawOp> {
        self.ops.iter().map(|o| o.op.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_tag_is_stripped() {
        let font = FontDescriptor::named("ABCDEF+ArialMT");
        assert!(font.is_subset());
        assert_eq!(font.family_name(), "ArialMT");
    }

    #[test]
    fn lowercase_prefix_is_not_a_subset_tag() {
        let font = FontDescriptor::named("abcdef+ArialMT");
        assert!(!font.is_subset());
        assert_eq!(font.family_name(), "abcdef+ArialMT");
    }

    #[test]
    fn page_push_assigns_paint_order() {
        let mut page = Page::new(1, 612.0, 792.0);
        let path = FillPath {
            segments: Vec::new(),
            fill_color: Color::default(),
            fill_rule: FillRule::NonZero,
            mode: PaintMode::Fill,
            stroke_color: Color::default(),
            line_width: 1.0,
        };
        let first = page.push(BoundingBox::default(), OpKind::FillPath(path.clone()));
        let second = page.push(BoundingBox::default(), OpKind::FillPath(path));
        assert_eq!((first, second), (0, 1));
        assert_eq!(page.ops[1].index, 1);
    }

    #[test]
    fn output_instruction_sorts_by_source_index() {
        let op = |index| OutputOp {
            op: DrawOp {
                index,
                bbox: BoundingBox::default(),
                kind: OpKind::Image(ImagePlacement {
                    raster: Raster::Resource(ImageId(0)),
                }),
            },
            disposition: Disposition::Unchanged,
            text: None,
        };
        let out = OutputInstruction::new(1, 10.0, 10.0, vec![op(4), op(1), op(2)]);
        let order: Vec<usize> = out.ops().iter().map(|o| o.op.index).collect();
        assert_eq!(order, vec![1, 2, 4]);
    }
}
