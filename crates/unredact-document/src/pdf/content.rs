// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content stream interpreter. Runs a page's operators against a graphics
// state and emits one `DrawOp` per painting operator, in paint order.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace};
use unredact_core::geometry::segments_bbox;
use unredact_core::{
    BoundingBox, Color, FillPath, FillRule, FontId, Glyph, ImageId, ImagePlacement, Matrix,
    OpKind, Page, PaintMode, PathSegment, Point, Raster, ResourceArena, TextRun, Warning,
    WarningKind,
};

use super::fonts::load_font;
use super::objects::{self, get, get_name, get_number, number, numbers, resolve};
use crate::image::decode_image;

/// Form XObjects nested deeper than this are skipped.
const MAX_FORM_DEPTH: usize = 12;

/// `TJ` displacements at least this large (thousandths of an em) start a
/// new positioned segment.
const BREAK_ADJUSTMENT: f64 = 100.0;

/// Text boxes span from `DESCENT` em below to `ASCENT` em above the baseline.
const DESCENT: f64 = 0.2;
const ASCENT: f64 = 0.8;

/// Fonts and images decoded so far. Shared by every page of a document so
/// each PDF object is decoded at most once.
#[derive(Debug, Default)]
pub struct ResourceCache {
    pub arena: ResourceArena,
    fonts: HashMap<ObjectId, FontId>,
    images: HashMap<ObjectId, Option<ImageId>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_arena(self) -> ResourceArena {
        self.arena
    }
}

/// Current clipping region, tracked as a box.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Clip {
    Unbounded,
    Region(BoundingBox),
    Empty,
}

impl Clip {
    fn intersect(self, region: BoundingBox) -> Clip {
        match self {
            Clip::Unbounded => Clip::Region(region),
            Clip::Region(current) => match overlap(&current, &region) {
                Some(narrowed) => Clip::Region(narrowed),
                None => Clip::Empty,
            },
            Clip::Empty => Clip::Empty,
        }
    }

    fn narrow(&self, bbox: BoundingBox) -> Option<BoundingBox> {
        match self {
            Clip::Unbounded => Some(bbox),
            Clip::Region(region) => overlap(&bbox, region),
            Clip::Empty => None,
        }
    }
}

/// Inclusive intersection, so zero-width rules inside the clip survive.
fn overlap(a: &BoundingBox, b: &BoundingBox) -> Option<BoundingBox> {
    let x0 = a.x0.max(b.x0);
    let y0 = a.y0.max(b.y0);
    let x1 = a.x1.min(b.x1);
    let y1 = a.y1.min(b.y1);
    (x0 <= x1 && y0 <= y1).then_some(BoundingBox { x0, y0, x1, y1 })
}

/// How `sc`/`scn` operands are read for the current color space.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SpaceKind {
    Gray,
    Rgb,
    Cmyk,
    /// Separation/DeviceN: a tint of 1 is full colorant.
    Tint,
    /// Pattern, Indexed, Lab and anything else painted as mid-gray.
    Opaque,
}

impl SpaceKind {
    fn initial(self) -> Color {
        match self {
            SpaceKind::Gray | SpaceKind::Tint => Color::Gray(0.0),
            SpaceKind::Rgb => Color::Rgb(0.0, 0.0, 0.0),
            SpaceKind::Cmyk => Color::Cmyk(0.0, 0.0, 0.0, 1.0),
            SpaceKind::Opaque => Color::Gray(0.5),
        }
    }

    fn color(self, operands: &[Object], previous: Color) -> Color {
        if operands.iter().any(|o| matches!(o, Object::Name(_))) {
            return Color::Gray(0.5);
        }
        let components: Vec<f32> = operands.iter().filter_map(number).map(|v| v as f32).collect();
        match self {
            SpaceKind::Opaque => Color::Gray(0.5),
            SpaceKind::Tint => components
                .iter()
                .copied()
                .reduce(f32::max)
                .map(|t| Color::Gray((1.0 - t).clamp(0.0, 1.0)))
                .unwrap_or(previous),
            _ => Color::from_components(&components).unwrap_or(previous),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    font: Option<FontId>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz` as a fraction.
    scale: f64,
    leading: f64,
    rise: f64,
    render_mode: i64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Color,
    stroke: Color,
    fill_space: SpaceKind,
    stroke_space: SpaceKind,
    line_width: f64,
    clip: Clip,
    text: TextState,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill: Color::default(),
            stroke: Color::default(),
            fill_space: SpaceKind::Gray,
            stroke_space: SpaceKind::Gray,
            line_width: 1.0,
            clip: Clip::Unbounded,
            text: TextState::default(),
        }
    }
}

/// One step of a show-text operator.
enum ShowStep {
    Glyph { code: u32, width: f64 },
    Adjust(f64),
}

/// Interprets the content of one page.
pub struct ContentExtractor<'a, 'c> {
    doc: &'a Document,
    cache: &'c mut ResourceCache,
    page: Page,
    warnings: Vec<Warning>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    resources: Vec<Option<&'a Dictionary>>,
    path: Vec<PathSegment>,
    current: Option<Point>,
    subpath_start: Option<Point>,
    pending_clip: bool,
    text_matrix: Matrix,
    line_matrix: Matrix,
    skewed_text: usize,
    skewed_images: usize,
    depth: usize,
}

impl<'a, 'c> ContentExtractor<'a, 'c> {
    /// `ctm` maps user space onto page space (e.g. the MediaBox offset).
    pub fn new(doc: &'a Document, cache: &'c mut ResourceCache, page: Page, ctm: Matrix) -> Self {
        Self {
            doc,
            cache,
            page,
            warnings: Vec::new(),
            state: GraphicsState::new(ctm),
            saved: Vec::new(),
            resources: Vec::new(),
            path: Vec::new(),
            current: None,
            subpath_start: None,
            pending_clip: false,
            text_matrix: Matrix::identity(),
            line_matrix: Matrix::identity(),
            skewed_text: 0,
            skewed_images: 0,
            depth: 0,
        }
    }

    /// Interpret a decoded content stream. A stream that does not parse
    /// leaves the page empty and records a warning.
    pub fn run(&mut self, content: &[u8], resources: Option<&'a Dictionary>) {
        let operations = match Content::decode(content) {
            Ok(content) => content.operations,
            Err(err) => {
                self.warn(
                    WarningKind::UnsupportedLayout,
                    format!("content stream could not be parsed: {}", err),
                );
                return;
            }
        };
        self.resources.push(resources);
        self.run_operations(&operations);
        self.resources.pop();
    }

    /// The extracted page and its page-local warnings.
    pub fn finish(mut self) -> (Page, Vec<Warning>) {
        if self.skewed_text > 0 {
            self.warn(
                WarningKind::UnsupportedLayout,
                format!("{} rotated or skewed text runs drawn upright", self.skewed_text),
            );
        }
        if self.skewed_images > 0 {
            self.warn(
                WarningKind::UnsupportedLayout,
                format!("{} rotated images placed in their bounding box", self.skewed_images),
            );
        }
        debug!(
            page = self.page.number,
            ops = self.page.ops.len(),
            warnings = self.warnings.len(),
            "page content extracted"
        );
        (self.page, self.warnings)
    }

    fn run_operations(&mut self, operations: &[Operation]) {
        for operation in operations {
            self.apply(operation);
        }
    }

    fn apply(&mut self, operation: &Operation) {
        let operands = operation.operands.as_slice();
        match operation.operator.as_str() {
            // -- Graphics state -----------------------------------------------
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "w" => {
                if let Some(w) = operands.first().and_then(number) {
                    self.state.line_width = w;
                }
            }
            "gs" => self.ext_gstate(operands),

            // -- Color ----------------------------------------------------------
            "g" => self.set_fill(SpaceKind::Gray, operands),
            "rg" => self.set_fill(SpaceKind::Rgb, operands),
            "k" => self.set_fill(SpaceKind::Cmyk, operands),
            "G" => self.set_stroke(SpaceKind::Gray, operands),
            "RG" => self.set_stroke(SpaceKind::Rgb, operands),
            "K" => self.set_stroke(SpaceKind::Cmyk, operands),
            "cs" => {
                let space = self.color_space(operands);
                self.state.fill_space = space;
                self.state.fill = space.initial();
            }
            "CS" => {
                let space = self.color_space(operands);
                self.state.stroke_space = space;
                self.state.stroke = space.initial();
            }
            "sc" | "scn" => {
                self.state.fill = self.state.fill_space.color(operands, self.state.fill);
            }
            "SC" | "SCN" => {
                self.state.stroke = self.state.stroke_space.color(operands, self.state.stroke);
            }

            // -- Path construction ---------------------------------------------
            "m" => {
                if let Some(p) = self.point(operands, 0) {
                    self.path.push(PathSegment::MoveTo(p));
                    self.current = Some(p);
                    self.subpath_start = Some(p);
                }
            }
            "l" => {
                if let Some(p) = self.point(operands, 0) {
                    self.path.push(PathSegment::LineTo(p));
                    self.current = Some(p);
                }
            }
            "c" => {
                if let (Some(c1), Some(c2), Some(to)) = (
                    self.point(operands, 0),
                    self.point(operands, 2),
                    self.point(operands, 4),
                ) {
                    self.curve(c1, c2, to);
                }
            }
            "v" => {
                if let (Some(c1), Some(c2), Some(to)) =
                    (self.current, self.point(operands, 0), self.point(operands, 2))
                {
                    self.curve(c1, c2, to);
                }
            }
            "y" => {
                if let (Some(c1), Some(to)) = (self.point(operands, 0), self.point(operands, 2)) {
                    self.curve(c1, to, to);
                }
            }
            "h" => self.close_subpath(),
            "re" => self.rectangle(operands),

            // -- Painting -------------------------------------------------------
            "f" | "F" => self.paint(PaintMode::Fill, FillRule::NonZero, false),
            "f*" => self.paint(PaintMode::Fill, FillRule::EvenOdd, false),
            "S" => self.paint(PaintMode::Stroke, FillRule::NonZero, false),
            "s" => self.paint(PaintMode::Stroke, FillRule::NonZero, true),
            "B" => self.paint(PaintMode::FillStroke, FillRule::NonZero, false),
            "B*" => self.paint(PaintMode::FillStroke, FillRule::EvenOdd, false),
            "b" => self.paint(PaintMode::FillStroke, FillRule::NonZero, true),
            "b*" => self.paint(PaintMode::FillStroke, FillRule::EvenOdd, true),
            "n" => {
                let segments = std::mem::take(&mut self.path);
                self.apply_pending_clip(&segments);
                self.current = None;
            }
            "W" | "W*" => self.pending_clip = true,

            // -- Text -----------------------------------------------------------
            "BT" => {
                self.text_matrix = Matrix::identity();
                self.line_matrix = Matrix::identity();
            }
            "ET" => {}
            "Tf" => self.set_font(operands),
            "Tc" => set_number(operands, &mut self.state.text.char_spacing),
            "Tw" => set_number(operands, &mut self.state.text.word_spacing),
            "TL" => set_number(operands, &mut self.state.text.leading),
            "Ts" => set_number(operands, &mut self.state.text.rise),
            "Tz" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.state.text.scale = v / 100.0;
                }
            }
            "Tr" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.state.text.render_mode = v as i64;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers(operands).as_deref().and_then(pair) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers(operands).as_deref().and_then(pair) {
                    self.state.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => self.show(operands.get(..1).unwrap_or_default()),
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line();
                self.show(operands.get(..1).unwrap_or_default());
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.state.text.word_spacing = aw;
                    self.state.text.char_spacing = ac;
                }
                self.next_line();
                self.show(operands.get(2..3).unwrap_or_default());
            }

            // -- XObjects -------------------------------------------------------
            "Do" => self.xobject(operands),

            other => trace!(operator = other, "operator ignored"),
        }
    }

    fn warn(&mut self, kind: WarningKind, message: String) {
        debug!(page = self.page.number, ?kind, %message, "page warning");
        self.warnings.push(Warning::on_page(self.page.number, kind, message));
    }

    fn emit(&mut self, bbox: BoundingBox, kind: OpKind) {
        match self.state.clip.narrow(bbox) {
            Some(bbox) => {
                self.page.push(bbox, kind);
            }
            None => trace!(kind = kind.label(), "op outside clip dropped"),
        }
    }

    /// Entry `name` of the current resource category, unresolved so callers
    /// can key caches on the reference.
    fn resource(&self, category: &[u8], name: &str) -> Option<&'a Object> {
        let resources = (*self.resources.last()?)?;
        let entries = objects::sub_dict(self.doc, resources, category)?;
        entries.get(name.as_bytes()).ok()
    }

    // -- State helpers ---------------------------------------------------------

    fn set_fill(&mut self, space: SpaceKind, operands: &[Object]) {
        self.state.fill_space = space;
        self.state.fill = space.color(operands, self.state.fill);
    }

    fn set_stroke(&mut self, space: SpaceKind, operands: &[Object]) {
        self.state.stroke_space = space;
        self.state.stroke = space.color(operands, self.state.stroke);
    }

    fn color_space(&mut self, operands: &[Object]) -> SpaceKind {
        let Some(space) = operands.first().and_then(objects::name) else {
            return SpaceKind::Gray;
        };
        if let Some(kind) = device_space(space) {
            return kind;
        }
        match self.resource(b"ColorSpace", space).map(|o| resolve(self.doc, o)) {
            Some(Object::Array(items)) => space_family(self.doc, items),
            Some(Object::Name(n)) => device_space(&String::from_utf8_lossy(n)).unwrap_or(SpaceKind::Opaque),
            _ => {
                self.warn(
                    WarningKind::MissingResource,
                    format!("color space /{} is not defined", space),
                );
                SpaceKind::Opaque
            }
        }
    }

    fn ext_gstate(&mut self, operands: &[Object]) {
        let Some(name) = operands.first().and_then(objects::name) else {
            return;
        };
        match self.resource(b"ExtGState", name).and_then(|o| objects::dict(self.doc, o)) {
            Some(dict) => {
                if let Some(lw) = get_number(self.doc, dict, b"LW") {
                    self.state.line_width = lw;
                }
            }
            None => self.warn(
                WarningKind::MissingResource,
                format!("graphics state /{} is not defined", name),
            ),
        }
    }

    // -- Paths -----------------------------------------------------------------

    fn point(&self, operands: &[Object], at: usize) -> Option<Point> {
        let x = operands.get(at).and_then(number)?;
        let y = operands.get(at + 1).and_then(number)?;
        Some(self.state.ctm.apply(Point::new(x, y)))
    }

    fn curve(&mut self, c1: Point, c2: Point, to: Point) {
        self.path.push(PathSegment::CurveTo { c1, c2, to });
        self.current = Some(to);
    }

    fn close_subpath(&mut self) {
        if !self.path.is_empty() && self.path.last() != Some(&PathSegment::Close) {
            self.path.push(PathSegment::Close);
        }
        self.current = self.subpath_start;
    }

    fn rectangle(&mut self, operands: &[Object]) {
        let Some([x, y, w, h]) = numbers(operands).as_deref().and_then(quad) else {
            return;
        };
        let ctm = self.state.ctm;
        let corner = |px: f64, py: f64| ctm.apply(Point::new(px, py));
        let start = corner(x, y);
        self.path.extend([
            PathSegment::MoveTo(start),
            PathSegment::LineTo(corner(x + w, y)),
            PathSegment::LineTo(corner(x + w, y + h)),
            PathSegment::LineTo(corner(x, y + h)),
            PathSegment::Close,
        ]);
        self.current = Some(start);
        self.subpath_start = Some(start);
    }

    fn paint(&mut self, mode: PaintMode, fill_rule: FillRule, close: bool) {
        if close {
            self.close_subpath();
        }
        let segments = std::mem::take(&mut self.path);
        self.current = None;
        let Some(mut bbox) = segments_bbox(&segments) else {
            self.pending_clip = false;
            return;
        };

        let ctm = self.state.ctm;
        let line_width =
            self.state.line_width * (ctm.horizontal_scale() + ctm.vertical_scale()) / 2.0;
        if mode != PaintMode::Fill {
            let half = line_width / 2.0;
            bbox = BoundingBox::new(bbox.x0 - half, bbox.y0 - half, bbox.x1 + half, bbox.y1 + half);
        }

        let clip_segments = self.pending_clip.then(|| segments.clone());
        self.emit(
            bbox,
            OpKind::FillPath(FillPath {
                segments,
                fill_color: self.state.fill,
                fill_rule,
                mode,
                stroke_color: self.state.stroke,
                line_width,
            }),
        );
        // The clip takes effect after the painting operator.
        if let Some(segments) = clip_segments {
            self.apply_pending_clip(&segments);
        }
    }

    fn apply_pending_clip(&mut self, segments: &[PathSegment]) {
        if !std::mem::take(&mut self.pending_clip) {
            return;
        }
        self.state.clip = match segments_bbox(segments) {
            Some(region) => self.state.clip.intersect(region),
            None => Clip::Empty,
        };
    }

    // -- Text ------------------------------------------------------------------

    fn set_font(&mut self, operands: &[Object]) {
        let (Some(name), Some(size)) = (
            operands.first().and_then(objects::name),
            operands.get(1).and_then(number),
        ) else {
            return;
        };
        self.state.text.size = size;
        self.state.text.font = self.font(name);
    }

    fn font(&mut self, name: &str) -> Option<FontId> {
        let Some(raw) = self.resource(b"Font", name) else {
            self.warn(
                WarningKind::MissingResource,
                format!("font /{} is not defined", name),
            );
            return None;
        };
        let reference = match raw {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        if let Some(id) = reference.and_then(|r| self.cache.fonts.get(&r)) {
            return Some(*id);
        }
        let Some(dict) = objects::dict(self.doc, raw) else {
            self.warn(
                WarningKind::MissingResource,
                format!("font /{} is not a dictionary", name),
            );
            return None;
        };

        let id = self.cache.arena.add_font(load_font(self.doc, dict));
        if let Some(reference) = reference {
            self.cache.fonts.insert(reference, id);
        }
        Some(id)
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, items: &[Object]) {
        let text = self.state.text;
        let Some(font_id) = text.font else {
            return;
        };
        let Some(font) = self.cache.arena.font(font_id) else {
            return;
        };

        // Resolve codes and widths first so the arena borrow ends here.
        let two_byte = font.two_byte;
        let mut steps = Vec::new();
        for item in items {
            match item {
                Object::String(bytes, _) => steps.extend(
                    codes(bytes, two_byte)
                        .map(|code| ShowStep::Glyph { code, width: font.width(code) }),
                ),
                other => {
                    if let Some(n) = number(other) {
                        steps.push(ShowStep::Adjust(n));
                    }
                }
            }
        }

        let ctm = self.state.ctm;
        let start = self.text_matrix.then(&ctm);
        let origin = start.apply(Point::new(0.0, text.rise));
        let direction = {
            let length = start.horizontal_scale();
            if length > 0.0 {
                (start.a / length, start.b / length)
            } else {
                (1.0, 0.0)
            }
        };

        let mut glyphs = Vec::new();
        let mut pending_break = false;
        for step in steps {
            match step {
                ShowStep::Adjust(n) => {
                    let tx = -n / 1000.0 * text.size * text.scale;
                    self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
                    pending_break |= n.abs() >= BREAK_ADJUSTMENT;
                }
                ShowStep::Glyph { code, width } => {
                    let at = self.text_matrix.then(&ctm).apply(Point::new(0.0, text.rise));
                    glyphs.push(Glyph {
                        code,
                        offset: (at.x - origin.x) * direction.0 + (at.y - origin.y) * direction.1,
                        break_before: pending_break && !glyphs.is_empty(),
                    });
                    pending_break = false;

                    let word = if !two_byte && code == 32 { text.word_spacing } else { 0.0 };
                    let tx = (width / 1000.0 * text.size + text.char_spacing + word) * text.scale;
                    self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
                }
            }
        }

        if glyphs.is_empty() {
            return;
        }

        let end = self.text_matrix.then(&ctm);
        let low = text.rise - DESCENT * text.size;
        let high = text.rise + ASCENT * text.size;
        let bbox = BoundingBox::from_points(&[
            start.apply(Point::new(0.0, low)),
            start.apply(Point::new(0.0, high)),
            end.apply(Point::new(0.0, low)),
            end.apply(Point::new(0.0, high)),
        ])
        .unwrap_or_default();

        let upright = start.is_axis_aligned() && start.a > 0.0 && start.d > 0.0;
        if !upright {
            self.skewed_text += 1;
        }
        self.emit(
            bbox,
            OpKind::TextRun(TextRun {
                glyphs,
                origin,
                font: font_id,
                font_size: text.size * start.vertical_scale(),
                fill_color: self.state.fill,
                upright,
                invisible: matches!(text.render_mode, 3 | 7),
            }),
        );
    }

    // -- XObjects --------------------------------------------------------------

    fn xobject(&mut self, operands: &[Object]) {
        let Some(name) = operands.first().and_then(objects::name) else {
            return;
        };
        let Some(raw) = self.resource(b"XObject", name) else {
            self.warn(
                WarningKind::MissingResource,
                format!("XObject /{} is not defined", name),
            );
            return;
        };
        let Some(stream) = objects::stream(self.doc, raw) else {
            self.warn(
                WarningKind::MissingResource,
                format!("XObject /{} is not a stream", name),
            );
            return;
        };
        let reference = match raw {
            Object::Reference(id) => Some(*id),
            _ => None,
        };

        match get_name(self.doc, &stream.dict, b"Subtype") {
            Some("Image") => self.place_image(name, reference, stream),
            Some("Form") => self.run_form(name, stream),
            other => debug!(name, subtype = ?other, "XObject ignored"),
        }
    }

    fn place_image(&mut self, name: &str, reference: Option<ObjectId>, stream: &'a Stream) {
        if matches!(get(self.doc, &stream.dict, b"ImageMask"), Some(Object::Boolean(true))) {
            self.warn(
                WarningKind::UnsupportedLayout,
                format!("stencil mask /{} skipped", name),
            );
            return;
        }

        let image = match reference.and_then(|r| self.cache.images.get(&r).copied()) {
            Some(cached) => cached,
            None => {
                let decoded = self.decode(name, stream);
                if let Some(reference) = reference {
                    self.cache.images.insert(reference, decoded);
                }
                decoded
            }
        };
        let Some(image) = image else {
            return;
        };

        let ctm = self.state.ctm;
        if !ctm.is_axis_aligned() {
            self.skewed_images += 1;
        }
        self.emit(
            ctm.unit_square_bbox(),
            OpKind::Image(ImagePlacement {
                raster: Raster::Resource(image),
            }),
        );
    }

    fn decode(&mut self, name: &str, stream: &Stream) -> Option<ImageId> {
        match decode_image(self.doc, stream, name) {
            Ok(decoded) => {
                if let Some(err) = decoded.dropped_mask {
                    self.warn(
                        WarningKind::UndecodableImage,
                        format!("soft mask of image /{} ignored: {}", name, err),
                    );
                }
                Some(self.cache.arena.add_image(decoded.resource))
            }
            Err(err) => {
                self.warn(
                    WarningKind::UndecodableImage,
                    format!("image /{} skipped: {}", name, err),
                );
                None
            }
        }
    }

    fn run_form(&mut self, name: &str, stream: &'a Stream) {
        if self.depth >= MAX_FORM_DEPTH {
            self.warn(
                WarningKind::UnsupportedLayout,
                format!("form /{} nested too deeply", name),
            );
            return;
        }
        let operations = match objects::stream_bytes(stream).map(|bytes| Content::decode(&bytes)) {
            Some(Ok(content)) => content.operations,
            _ => {
                self.warn(
                    WarningKind::UnsupportedLayout,
                    format!("form /{} could not be decoded", name),
                );
                return;
            }
        };

        let form_matrix = get(self.doc, &stream.dict, b"Matrix")
            .and_then(|o| objects::array(self.doc, o))
            .and_then(|items| matrix(items))
            .unwrap_or_default();
        let resources = objects::sub_dict(self.doc, &stream.dict, b"Resources")
            .or_else(|| self.resources.last().copied().flatten());

        let saved_state = self.state.clone();
        let saved_depth = self.saved.len();
        let saved_text = (self.text_matrix, self.line_matrix);
        let saved_path = std::mem::take(&mut self.path);

        self.state.ctm = form_matrix.then(&self.state.ctm);
        if let Some([x0, y0, x1, y1]) =
            get(self.doc, &stream.dict, b"BBox").and_then(|o| objects::rect(self.doc, o))
        {
            let ctm = self.state.ctm;
            let region = BoundingBox::from_points(&[
                ctm.apply(Point::new(x0, y0)),
                ctm.apply(Point::new(x1, y0)),
                ctm.apply(Point::new(x0, y1)),
                ctm.apply(Point::new(x1, y1)),
            ]);
            if let Some(region) = region {
                self.state.clip = self.state.clip.intersect(region);
            }
        }

        self.depth += 1;
        self.resources.push(resources);
        self.run_operations(&operations);
        self.resources.pop();
        self.depth -= 1;

        self.saved.truncate(saved_depth);
        self.state = saved_state;
        (self.text_matrix, self.line_matrix) = saved_text;
        self.path = saved_path;
    }
}

fn set_number(operands: &[Object], target: &mut f64) {
    if let Some(v) = operands.first().and_then(number) {
        *target = v;
    }
}

fn matrix(operands: &[Object]) -> Option<Matrix> {
    match numbers(operands)?.as_slice() {
        [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

fn pair(values: &[f64]) -> Option<[f64; 2]> {
    values.try_into().ok()
}

fn quad(values: &[f64]) -> Option<[f64; 4]> {
    values.try_into().ok()
}

/// Split a show-text string into character codes.
fn codes(bytes: &[u8], two_byte: bool) -> impl Iterator<Item = u32> + '_ {
    let width = if two_byte { 2 } else { 1 };
    bytes
        .chunks(width)
        .map(|chunk| chunk.iter().fold(0u32, |code, b| (code << 8) | *b as u32))
}

fn device_space(name: &str) -> Option<SpaceKind> {
    match name {
        "DeviceGray" | "G" | "CalGray" => Some(SpaceKind::Gray),
        "DeviceRGB" | "RGB" | "CalRGB" => Some(SpaceKind::Rgb),
        "DeviceCMYK" | "CMYK" => Some(SpaceKind::Cmyk),
        "Pattern" => Some(SpaceKind::Opaque),
        _ => None,
    }
}

fn space_family(doc: &Document, items: &[Object]) -> SpaceKind {
    match items.first().map(|o| resolve(doc, o)).and_then(objects::name) {
        Some("ICCBased") => {
            let n = items
                .get(1)
                .and_then(|o| objects::dict(doc, o))
                .and_then(|d| get_number(doc, d, b"N"));
            match n.map(|n| n as u32) {
                Some(1) => SpaceKind::Gray,
                Some(4) => SpaceKind::Cmyk,
                _ => SpaceKind::Rgb,
            }
        }
        Some("Separation") | Some("DeviceN") => SpaceKind::Tint,
        Some(other) => device_space(other).unwrap_or(SpaceKind::Opaque),
        None => SpaceKind::Opaque,
    }
}
