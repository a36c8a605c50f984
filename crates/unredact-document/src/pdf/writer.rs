// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: a `DrawingSurface` that records pages with `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::collections::HashMap;

use image::{GenericImageView, RgbImage, RgbaImage};
use printpdf::{
    BuiltinFont, Cmyk, Color as PdfColor, FontId as PdfFontId, Greyscale, Line, LinePoint, Mm,
    Op, PaintMode as PdfPaintMode, ParsedFont, PdfDocument, PdfPage, PdfParseErrorSeverity,
    PdfSaveOptions, PdfWarnMsg, Point as PdfPoint, Polygon, PolygonRing, Pt, RawImage,
    RawImageData, RawImageFormat, Rgb, TextItem, TextRenderingMode, WindingOrder, XObjectId,
    XObjectTransform,
};
use tracing::{debug, instrument, warn};
use unredact_core::error::Result;
use unredact_core::{
    BoundingBox, Color, FillPath, FillRule, FontDescriptor, FontId, FontProgram, ImageId,
    ImageResource, PaintMode, PathSegment, Point, ResolvedFont, ResolvedText, StandardFont,
    TextRun, UnredactError, Warning, WarningKind,
};
use unredact_engine::fonts::winansi_encodable;
use unredact_engine::raster;
use unredact_engine::{DrawingSurface, ImageData};

/// Bytes of a finished PDF plus the warnings raised while writing it.
#[derive(Debug, Clone)]
pub struct WrittenPdf {
    pub bytes: Vec<u8>,
    pub warnings: Vec<Warning>,
}

/// A page being recorded.
struct OpenPage {
    number: u32,
    width: f64,
    height: f64,
    ops: Vec<Op>,
}

/// Records drawing calls into a new PDF document.
///
/// Shared images and embedded fonts are registered with the document once
/// and referenced from every page that uses them.
pub struct PdfWriter {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    current: Option<OpenPage>,
    images: HashMap<ImageId, XObjectId>,
    /// `None` records a program that failed to parse, so it is tried once.
    fonts: HashMap<FontId, Option<PdfFontId>>,
    warnings: Vec<Warning>,
    placeholder: char,
}

impl PdfWriter {
    /// Create a writer whose output carries `title` in its metadata.
    pub fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            current: None,
            images: HashMap::new(),
            fonts: HashMap::new(),
            warnings: Vec::new(),
            placeholder: '?',
        }
    }

    /// Character substituted for text a builtin font cannot encode.
    pub fn with_placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Number of pages completed so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialise the document.
    #[instrument(skip(self), fields(pages = self.pages.len()))]
    pub fn finish(mut self) -> Result<WrittenPdf> {
        if self.current.is_some() {
            return Err(UnredactError::Output("a page was left open".to_string()));
        }
        if self.pages.is_empty() {
            return Err(UnredactError::Output("no pages were written".to_string()));
        }

        self.doc.with_pages(self.pages);
        let mut pdf_warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut pdf_warnings);
        debug!(
            bytes = bytes.len(),
            printpdf_warnings = pdf_warnings.len(),
            "PDF serialised"
        );

        let mut warnings = self.warnings;
        warnings.extend(serializer_warnings(pdf_warnings));
        Ok(WrittenPdf { bytes, warnings })
    }

    fn page(&mut self) -> Result<&mut OpenPage> {
        self.current
            .as_mut()
            .ok_or_else(|| UnredactError::Output("drawing outside of a page".to_string()))
    }

    /// Registered font for an embedded program, parsing it on first use.
    fn embedded_font(&mut self, id: FontId, descriptor: &FontDescriptor) -> Option<PdfFontId> {
        if let Some(cached) = self.fonts.get(&id) {
            return cached.clone();
        }

        let bytes = match &descriptor.program {
            Some(FontProgram::TrueType(bytes)) | Some(FontProgram::OpenType(bytes)) => Some(bytes),
            _ => None,
        };
        let mut parse_warnings: Vec<PdfWarnMsg> = Vec::new();
        let parsed = bytes.and_then(|b| ParsedFont::from_bytes(b, 0, &mut parse_warnings));
        let registered = parsed.map(|font| self.doc.add_font(&font));

        if registered.is_none() {
            let page = self.current.as_ref().map(|p| p.number);
            self.warnings.push(Warning::new(
                page,
                WarningKind::FontFallback,
                format!(
                    "embedded program of {} could not be reused; using a standard font",
                    descriptor.base_font
                ),
            ));
        }
        debug!(font = %descriptor.base_font, embedded = registered.is_some(), "font registered");
        self.fonts.insert(id, registered.clone());
        registered
    }

    /// Register a shared image once. A soft mask travels as the alpha channel.
    fn shared_image(&mut self, id: ImageId, resource: &ImageResource) -> XObjectId {
        if let Some(existing) = self.images.get(&id) {
            return existing.clone();
        }
        let raw = if raster::resource_has_alpha(resource) {
            raw_rgba_image(&raster::with_alpha(resource))
        } else {
            raw_image(&resource.pixels.to_rgb8())
        };
        let xobject = self.doc.add_image(&raw);
        self.images.insert(id, xobject.clone());
        xobject
    }

    /// Replace characters a builtin font cannot encode.
    fn sanitize(&self, text: &str) -> String {
        text.chars()
            .map(|c| if winansi_encodable(c) { c } else { self.placeholder })
            .collect()
    }
}

impl DrawingSurface for PdfWriter {
    fn begin_page(&mut self, number: u32, width: f64, height: f64) -> Result<()> {
        if self.current.is_some() {
            return Err(UnredactError::Output(format!(
                "page {} started before the previous page ended",
                number
            )));
        }
        self.current = Some(OpenPage {
            number,
            width,
            height,
            ops: Vec::new(),
        });
        Ok(())
    }

    fn fill_path(&mut self, path: &FillPath) -> Result<()> {
        let draw = path_op(path);
        let page = self.page()?;
        page.ops.extend([
            Op::SaveGraphicsState,
            Op::SetFillColor {
                col: pdf_color(path.fill_color),
            },
            Op::SetOutlineColor {
                col: pdf_color(path.stroke_color),
            },
            Op::SetOutlineThickness {
                pt: Pt(path.line_width as f32),
            },
        ]);
        page.ops.extend(draw);
        page.ops.push(Op::RestoreGraphicsState);
        Ok(())
    }

    fn draw_text(
        &mut self,
        run: &TextRun,
        text: &ResolvedText,
        font: Option<&FontDescriptor>,
    ) -> Result<()> {
        self.page()?;
        let embedded = match (&text.font, font) {
            (ResolvedFont::Embedded { font: id, .. }, Some(descriptor)) => {
                self.embedded_font(*id, descriptor)
            }
            _ => None,
        };
        let builtin = builtin_font(text.font.standard());
        let size = Pt(run.font_size as f32);

        let mut ops = vec![
            Op::SaveGraphicsState,
            Op::SetFillColor {
                col: pdf_color(run.fill_color),
            },
        ];
        for segment in &text.segments {
            ops.push(Op::StartTextSection);
            if run.invisible {
                ops.push(Op::SetTextRenderingMode {
                    mode: TextRenderingMode::Invisible,
                });
            }
            ops.push(Op::SetTextCursor {
                pos: PdfPoint {
                    x: Pt((run.origin.x + segment.offset) as f32),
                    y: Pt(run.origin.y as f32),
                },
            });
            match &embedded {
                Some(font) => {
                    ops.push(Op::SetFontSize {
                        size,
                        font: font.clone(),
                    });
                    ops.push(Op::WriteText {
                        items: vec![TextItem::Text(segment.text.clone())],
                        font: font.clone(),
                    });
                }
                None => {
                    ops.push(Op::SetFontSizeBuiltinFont {
                        size,
                        font: builtin,
                    });
                    ops.push(Op::WriteTextBuiltinFont {
                        items: vec![TextItem::Text(self.sanitize(&segment.text))],
                        font: builtin,
                    });
                }
            }
            ops.push(Op::EndTextSection);
        }
        ops.push(Op::RestoreGraphicsState);

        self.page()?.ops.extend(ops);
        Ok(())
    }

    fn draw_image(&mut self, bbox: &BoundingBox, image: ImageData<'_>) -> Result<()> {
        self.page()?;
        let (xobject, width, height) = match image {
            ImageData::Shared { id, resource } => {
                let pixels = &resource.pixels;
                (self.shared_image(id, resource), pixels.width(), pixels.height())
            }
            ImageData::Owned(pixels) => {
                let (w, h) = pixels.dimensions();
                (self.doc.add_image(&raw_image(pixels)), w, h)
            }
        };
        if width == 0 || height == 0 {
            return Err(UnredactError::Output("image has no pixels".to_string()));
        }

        // At 72 dpi one pixel is one point, so the scale maps pixels onto
        // the placement box.
        self.page()?.ops.push(Op::UseXobject {
            id: xobject,
            transform: XObjectTransform {
                translate_x: Some(Pt(bbox.x0 as f32)),
                translate_y: Some(Pt(bbox.y0 as f32)),
                scale_x: Some((bbox.width() / width as f64) as f32),
                scale_y: Some((bbox.height() / height as f64) as f32),
                dpi: Some(72.0),
                rotate: None,
            },
        });
        Ok(())
    }

    fn end_page(&mut self) -> Result<()> {
        let page = self
            .current
            .take()
            .ok_or_else(|| UnredactError::Output("end of page without a page".to_string()))?;
        debug!(page = page.number, ops = page.ops.len(), "page recorded");
        self.pages.push(PdfPage::new(
            points_to_mm(page.width),
            points_to_mm(page.height),
            page.ops,
        ));
        Ok(())
    }
}

fn points_to_mm(points: f64) -> Mm {
    Mm((points * 25.4 / 72.0) as f32)
}

fn pdf_point(p: Point) -> PdfPoint {
    PdfPoint {
        x: Pt(p.x as f32),
        y: Pt(p.y as f32),
    }
}

fn pdf_color(color: Color) -> PdfColor {
    match color {
        Color::Gray(g) => PdfColor::Greyscale(Greyscale {
            percent: g,
            icc_profile: None,
        }),
        Color::Rgb(r, g, b) => PdfColor::Rgb(Rgb {
            r,
            g,
            b,
            icc_profile: None,
        }),
        Color::Cmyk(c, m, y, k) => PdfColor::Cmyk(Cmyk {
            c,
            m,
            y,
            k,
            icc_profile: None,
        }),
    }
}

fn builtin_font(font: StandardFont) -> BuiltinFont {
    match font {
        StandardFont::TimesRoman => BuiltinFont::TimesRoman,
        StandardFont::TimesBold => BuiltinFont::TimesBold,
        StandardFont::TimesItalic => BuiltinFont::TimesItalic,
        StandardFont::TimesBoldItalic => BuiltinFont::TimesBoldItalic,
        StandardFont::Helvetica => BuiltinFont::Helvetica,
        StandardFont::HelveticaBold => BuiltinFont::HelveticaBold,
        StandardFont::HelveticaOblique => BuiltinFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique => BuiltinFont::HelveticaBoldOblique,
        StandardFont::Courier => BuiltinFont::Courier,
        StandardFont::CourierBold => BuiltinFont::CourierBold,
        StandardFont::CourierOblique => BuiltinFont::CourierOblique,
        StandardFont::CourierBoldOblique => BuiltinFont::CourierBoldOblique,
        StandardFont::Symbol => BuiltinFont::Symbol,
        StandardFont::ZapfDingbats => BuiltinFont::ZapfDingbats,
    }
}

fn raw_image(pixels: &RgbImage) -> RawImage {
    RawImage {
        pixels: RawImageData::U8(pixels.as_raw().clone()),
        width: pixels.width() as usize,
        height: pixels.height() as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    }
}

fn raw_rgba_image(pixels: &RgbaImage) -> RawImage {
    RawImage {
        pixels: RawImageData::U8(pixels.as_raw().clone()),
        width: pixels.width() as usize,
        height: pixels.height() as usize,
        data_format: RawImageFormat::RGBA8,
        tag: Vec::new(),
    }
}

/// Serialiser messages worth reporting. Informational ones are only logged.
fn serializer_warnings(messages: Vec<PdfWarnMsg>) -> Vec<Warning> {
    messages
        .into_iter()
        .filter_map(|msg| {
            if msg.severity == PdfParseErrorSeverity::Info {
                debug!(message = %msg.msg, "printpdf note");
                return None;
            }
            warn!(message = %msg.msg, "printpdf reported a problem");
            Some(Warning::new(None, WarningKind::WriterIssue, msg.msg))
        })
        .collect()
}

/// Subpaths of a segment list as printpdf points, each with a closed flag.
/// Curve control points carry `bezier: true`.
fn subpaths(segments: &[PathSegment]) -> Vec<(Vec<LinePoint>, bool)> {
    let mut result: Vec<(Vec<LinePoint>, bool)> = Vec::new();
    let point = |p: Point, bezier: bool| LinePoint {
        p: pdf_point(p),
        bezier,
    };
    for segment in segments {
        match *segment {
            PathSegment::MoveTo(p) => result.push((vec![point(p, false)], false)),
            PathSegment::LineTo(p) => match result.last_mut() {
                Some((points, _)) => points.push(point(p, false)),
                None => result.push((vec![point(p, false)], false)),
            },
            PathSegment::CurveTo { c1, c2, to } => {
                if result.is_empty() {
                    result.push((Vec::new(), false));
                }
                if let Some((points, _)) = result.last_mut() {
                    points.extend([point(c1, true), point(c2, true), point(to, false)]);
                }
            }
            PathSegment::Close => {
                if let Some((_, closed)) = result.last_mut() {
                    *closed = true;
                }
            }
        }
    }
    result.retain(|(points, _)| points.len() > 1);
    result
}

/// Draw ops for a path: one polygon when the interior is painted, otherwise
/// one line per subpath.
fn path_op(path: &FillPath) -> Vec<Op> {
    let subpaths = subpaths(&path.segments);
    if path.mode == PaintMode::Stroke {
        return subpaths
            .into_iter()
            .map(|(points, is_closed)| Op::DrawLine {
                line: Line { points, is_closed },
            })
            .collect();
    }
    if subpaths.is_empty() {
        return Vec::new();
    }

    vec![Op::DrawPolygon {
        polygon: Polygon {
            rings: subpaths
                .into_iter()
                .map(|(points, _)| PolygonRing { points })
                .collect(),
            mode: match path.mode {
                PaintMode::FillStroke => PdfPaintMode::FillStroke,
                _ => PdfPaintMode::Fill,
            },
            winding_order: match path.fill_rule {
                FillRule::NonZero => WindingOrder::NonZero,
                FillRule::EvenOdd => WindingOrder::EvenOdd,
            },
        },
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use unredact_core::geometry::rectangle;
    use unredact_core::{Glyph, TextSegment};

    fn square() -> FillPath {
        FillPath {
            segments: rectangle(BoundingBox::new(8.0, 8.0, 62.0, 22.0)),
            fill_color: Color::Gray(0.9),
            fill_rule: FillRule::NonZero,
            mode: PaintMode::Fill,
            stroke_color: Color::default(),
            line_width: 1.0,
        }
    }

    fn run() -> TextRun {
        TextRun {
            glyphs: "Hi".bytes().map(|b| Glyph { code: b as u32, offset: 0.0, break_before: false }).collect(),
            origin: Point::new(10.0, 12.0),
            font: FontId(0),
            font_size: 10.0,
            fill_color: Color::default(),
            upright: true,
            invisible: false,
        }
    }

    #[test]
    fn rectangle_becomes_one_polygon_ring() {
        let ops = path_op(&square());
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Op::DrawPolygon { polygon } => {
                assert_eq!(polygon.rings.len(), 1);
                assert_eq!(polygon.rings[0].points.len(), 4);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn stroked_open_path_becomes_a_line() {
        let mut path = square();
        path.mode = PaintMode::Stroke;
        path.segments = vec![
            PathSegment::MoveTo(Point::new(0.0, 0.0)),
            PathSegment::CurveTo {
                c1: Point::new(1.0, 1.0),
                c2: Point::new(2.0, 1.0),
                to: Point::new(3.0, 0.0),
            },
        ];
        match path_op(&path).as_slice() {
            [Op::DrawLine { line }] => {
                assert!(!line.is_closed);
                let flags: Vec<bool> = line.points.iter().map(|p| p.bezier).collect();
                assert_eq!(flags, vec![false, true, true, false]);
            }
            other => panic!("expected one line, got {:?}", other),
        }
    }

    #[test]
    fn drawing_outside_a_page_is_an_error() {
        let mut writer = PdfWriter::new("test");
        assert!(matches!(writer.fill_path(&square()), Err(UnredactError::Output(_))));
        assert!(matches!(writer.end_page(), Err(UnredactError::Output(_))));
    }

    #[test]
    fn finishing_without_pages_is_an_error() {
        assert!(matches!(PdfWriter::new("empty").finish(), Err(UnredactError::Output(_))));
    }

    #[test]
    fn unusable_embedded_program_falls_back_with_one_warning() {
        let mut descriptor = FontDescriptor::named("ABCDEF+Broken");
        descriptor.program = Some(FontProgram::TrueType(Arc::new(vec![0, 1, 2, 3])));
        let text = ResolvedText {
            font: ResolvedFont::Embedded {
                font: FontId(0),
                fallback: StandardFont::Helvetica,
            },
            segments: vec![TextSegment {
                offset: 0.0,
                text: "Hi".into(),
            }],
            glyph_count: 2,
        };

        let mut writer = PdfWriter::new("fonts");
        writer.begin_page(1, 100.0, 100.0).unwrap();
        writer.draw_text(&run(), &text, Some(&descriptor)).unwrap();
        writer.draw_text(&run(), &text, Some(&descriptor)).unwrap();
        writer.end_page().unwrap();

        let written = writer.finish().unwrap();
        assert_eq!(written.warnings.len(), 1);
        assert_eq!(written.warnings[0].kind, WarningKind::FontFallback);
        assert_eq!(written.warnings[0].page, Some(1));
        assert!(written.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn shared_images_are_registered_once() {
        let pixels = RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        let resource = unredact_core::ImageResource {
            name: "Im0".into(),
            pixels: image::DynamicImage::ImageRgb8(pixels),
            soft_mask: None,
        };
        let bbox = BoundingBox::new(0.0, 0.0, 40.0, 40.0);

        let mut writer = PdfWriter::new("images");
        writer.begin_page(1, 100.0, 100.0).unwrap();
        for _ in 0..3 {
            let data = ImageData::Shared {
                id: ImageId(0),
                resource: &resource,
            };
            writer.draw_image(&bbox, data).unwrap();
        }
        writer.end_page().unwrap();
        assert_eq!(writer.images.len(), 1);
        assert_eq!(writer.page_count(), 1);
    }

    fn hi() -> ResolvedText {
        ResolvedText {
            font: ResolvedFont::Standard(StandardFont::Helvetica),
            segments: vec![TextSegment {
                offset: 0.0,
                text: "Hi".into(),
            }],
            glyph_count: 2,
        }
    }

    fn recorded_ops(writer: &PdfWriter) -> &[Op] {
        &writer.current.as_ref().unwrap().ops
    }

    #[test]
    fn invisible_run_keeps_its_rendering_mode() {
        let mut writer = PdfWriter::new("ocr");
        writer.begin_page(1, 100.0, 100.0).unwrap();
        let mut hidden = run();
        hidden.invisible = true;
        writer.draw_text(&hidden, &hi(), None).unwrap();
        assert!(recorded_ops(&writer).iter().any(|op| matches!(
            op,
            Op::SetTextRenderingMode {
                mode: TextRenderingMode::Invisible
            }
        )));

        let mut visible = PdfWriter::new("plain");
        visible.begin_page(1, 100.0, 100.0).unwrap();
        visible.draw_text(&run(), &hi(), None).unwrap();
        assert!(
            !recorded_ops(&visible)
                .iter()
                .any(|op| matches!(op, Op::SetTextRenderingMode { .. }))
        );
    }

    #[test]
    fn soft_masked_image_is_written_with_alpha() {
        let resource = unredact_core::ImageResource {
            name: "Logo".into(),
            pixels: image::DynamicImage::ImageRgb8(RgbImage::from_pixel(
                4,
                4,
                image::Rgb([200, 30, 30]),
            )),
            soft_mask: Some(image::GrayImage::from_pixel(4, 4, image::Luma([128]))),
        };
        let mut writer = PdfWriter::new("masked");
        writer.begin_page(1, 100.0, 100.0).unwrap();
        let data = ImageData::Shared {
            id: ImageId(3),
            resource: &resource,
        };
        writer
            .draw_image(&BoundingBox::new(0.0, 0.0, 40.0, 40.0), data)
            .unwrap();
        writer.end_page().unwrap();

        let written = writer.finish().unwrap();
        let reread = lopdf::Document::load_mem(&written.bytes).unwrap();
        let has_smask = reread.objects.values().any(|object| {
            object
                .as_stream()
                .map(|stream| stream.dict.has(b"SMask"))
                .unwrap_or(false)
        });
        assert!(has_smask);
    }

    #[test]
    fn serializer_problems_become_warnings() {
        let mut writer = PdfWriter::new("colors");
        writer.begin_page(1, 100.0, 100.0).unwrap();
        let mut path = square();
        path.fill_color = Color::Gray(1.5);
        writer.fill_path(&path).unwrap();
        writer.end_page().unwrap();

        let written = writer.finish().unwrap();
        assert!(
            written
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::WriterIssue && w.message.contains("out of range"))
        );
    }

    #[test]
    fn informational_serializer_notes_are_not_reported() {
        let notes = vec![
            PdfWarnMsg {
                page: 0,
                op_id: 0,
                severity: PdfParseErrorSeverity::Info,
                msg: "note".into(),
            },
            PdfWarnMsg::error(0, 3, "bad operand".into()),
        ];
        let warnings = serializer_warnings(notes);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "bad operand");
        assert_eq!(warnings[0].page, None);
    }

    #[test]
    fn builtin_text_is_sanitized() {
        let writer = PdfWriter::new("t").with_placeholder('#');
        assert_eq!(writer.sanitize("a\u{4e2d}b"), "a#b");
        assert_eq!(writer.sanitize("café"), "café");
    }
}
