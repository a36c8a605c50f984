// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font mapping: turn the raw glyph codes of a text run into characters a
// writer can draw, and pick the font to draw them with.

use std::collections::BTreeSet;

use tracing::debug;
use unredact_core::{
    FontDescriptor, FontId, FontMap, FontProgram, FontSubtype, OpKind, OutputOp, ResolvedFont,
    ResolvedText, ResourceArena, TextRun, TextSegment, Warning, WarningKind,
};

/// Characters in the 0x80–0x9F block of WinAnsiEncoding.
const WIN_ANSI_HIGH: [(u32, char); 27] = [
    (0x80, '€'),
    (0x82, '‚'),
    (0x83, 'ƒ'),
    (0x84, '„'),
    (0x85, '…'),
    (0x86, '†'),
    (0x87, '‡'),
    (0x88, 'ˆ'),
    (0x89, '‰'),
    (0x8A, 'Š'),
    (0x8B, '‹'),
    (0x8C, 'Œ'),
    (0x8E, 'Ž'),
    (0x91, '‘'),
    (0x92, '’'),
    (0x93, '“'),
    (0x94, '”'),
    (0x95, '•'),
    (0x96, '–'),
    (0x97, '—'),
    (0x98, '˜'),
    (0x99, '™'),
    (0x9A, 'š'),
    (0x9B, '›'),
    (0x9C, 'œ'),
    (0x9E, 'ž'),
    (0x9F, 'Ÿ'),
];

/// Whether the builtin (non-embedded) fonts can encode `c`.
pub fn winansi_encodable(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF) || WIN_ANSI_HIGH.iter().any(|&(_, ch)| ch == c)
}

/// Decode a single-byte code as WinAnsiEncoding.
fn win_ansi_char(code: u32) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => char::from_u32(code),
        0x80..=0x9F => WIN_ANSI_HIGH
            .iter()
            .find(|&&(c, _)| c == code)
            .map(|&(_, ch)| ch),
        _ => None,
    }
}

/// Adobe glyph names that do not spell their character directly.
const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("exclam", '!'),
    ("quotedbl", '"'),
    ("numbersign", '#'),
    ("dollar", '$'),
    ("percent", '%'),
    ("ampersand", '&'),
    ("quotesingle", '\''),
    ("quoteright", '’'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("asterisk", '*'),
    ("plus", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("period", '.'),
    ("slash", '/'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less", '<'),
    ("equal", '='),
    ("greater", '>'),
    ("question", '?'),
    ("at", '@'),
    ("bracketleft", '['),
    ("backslash", '\\'),
    ("bracketright", ']'),
    ("asciicircum", '^'),
    ("underscore", '_'),
    ("grave", '`'),
    ("quoteleft", '‘'),
    ("braceleft", '{'),
    ("bar", '|'),
    ("braceright", '}'),
    ("asciitilde", '~'),
    ("bullet", '•'),
    ("endash", '–'),
    ("emdash", '—'),
    ("quotedblleft", '“'),
    ("quotedblright", '”'),
    ("quotesinglbase", '‚'),
    ("quotedblbase", '„'),
    ("ellipsis", '…'),
    ("dagger", '†'),
    ("daggerdbl", '‡'),
    ("trademark", '™'),
    ("copyright", '©'),
    ("registered", '®'),
    ("degree", '°'),
    ("section", '§'),
    ("paragraph", '¶'),
    ("sterling", '£'),
    ("yen", '¥'),
    ("Euro", '€'),
    ("cent", '¢'),
    ("nbspace", '\u{a0}'),
    ("minus", '−'),
    ("multiply", '×'),
    ("divide", '÷'),
    ("eacute", 'é'),
    ("egrave", 'è'),
    ("ecircumflex", 'ê'),
    ("aacute", 'á'),
    ("agrave", 'à'),
    ("acircumflex", 'â'),
    ("adieresis", 'ä'),
    ("odieresis", 'ö'),
    ("udieresis", 'ü'),
    ("Adieresis", 'Ä'),
    ("Odieresis", 'Ö'),
    ("Udieresis", 'Ü'),
    ("germandbls", 'ß'),
    ("ccedilla", 'ç'),
    ("ntilde", 'ñ'),
];

/// Text for an Adobe glyph name: single letters, `uniXXXX`, `uXXXX`, the
/// ligatures, and the common names above.
fn glyph_name_text(name: &str) -> Option<String> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c.to_string());
    }
    match name {
        "fi" | "fl" | "ff" | "ffi" | "ffl" => return Some(name.to_string()),
        _ => {}
    }
    if let Some(hex) = name.strip_prefix("uni").filter(|h| h.len() == 4) {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }
    if let Some(hex) = name.strip_prefix('u').filter(|h| (4..=6).contains(&h.len())) {
        if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
            return Some(c.to_string());
        }
    }
    GLYPH_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| c.to_string())
}

/// A run after mapping, with the counts the caller needs for warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMapping {
    pub text: ResolvedText,
    /// Glyphs replaced by the placeholder.
    pub unmapped: usize,
    /// The font name resolved to nothing and the default font was used.
    pub fell_back: bool,
}

/// Resolves text runs against an immutable [`FontMap`].
pub struct FontMapper<'a> {
    map: &'a FontMap,
}

impl<'a> FontMapper<'a> {
    pub fn new(map: &'a FontMap) -> Self {
        Self { map }
    }

    /// Font for a run. The flag is set when the default font stands in for a
    /// name the map does not know.
    pub fn choose_font(&self, id: FontId, font: Option<&FontDescriptor>) -> (ResolvedFont, bool) {
        let Some(font) = font else {
            return (ResolvedFont::Standard(self.map.default_font), true);
        };
        let looked_up = self.map.lookup(font.family_name());
        let reusable = matches!(font.program, Some(FontProgram::TrueType(_)))
            && font.subtype == FontSubtype::TrueType
            && !font.is_subset();

        if reusable {
            let fallback = looked_up.unwrap_or(self.map.default_font);
            return (ResolvedFont::Embedded { font: id, fallback }, false);
        }
        match looked_up {
            Some(standard) => (ResolvedFont::Standard(standard), false),
            None => (ResolvedFont::Standard(self.map.default_font), true),
        }
    }

    /// Map every glyph of `run`. The result always holds one character per
    /// glyph, except where a ToUnicode entry or ligature name expands to
    /// several.
    pub fn resolve_run(&self, run: &TextRun, font: Option<&FontDescriptor>) -> RunMapping {
        let (resolved, fell_back) = self.choose_font(run.font, font);
        let embedded = matches!(resolved, ResolvedFont::Embedded { .. });

        let mut segments: Vec<TextSegment> = Vec::new();
        let mut resolved_glyphs = 0;
        let mut unmapped = 0;

        for glyph in &run.glyphs {
            let text = match font.and_then(|f| self.glyph_text(f, glyph.code)) {
                Some(text) if drawable(&text, embedded) => {
                    resolved_glyphs += 1;
                    text
                }
                _ => {
                    unmapped += 1;
                    self.map.placeholder.to_string()
                }
            };
            match segments.last_mut() {
                Some(segment) if !glyph.break_before => segment.text.push_str(&text),
                _ => segments.push(TextSegment {
                    offset: glyph.offset,
                    text,
                }),
            }
        }

        RunMapping {
            text: ResolvedText {
                font: resolved,
                segments,
                glyph_count: resolved_glyphs,
            },
            unmapped,
            fell_back,
        }
    }

    fn glyph_text(&self, font: &FontDescriptor, code: u32) -> Option<String> {
        if let Some(c) = self.map.glyph_override(font.family_name(), code) {
            return Some(c.to_string());
        }
        if let Some(text) = font.to_unicode.get(&code).filter(|t| !t.is_empty()) {
            return Some(text.clone());
        }
        if let Some(name) = font.differences.get(&code) {
            if let Some(text) = glyph_name_text(name) {
                return Some(text);
            }
        }
        if font.two_byte {
            return None;
        }
        win_ansi_char(code).map(String::from)
    }

    /// Attach resolved text to every text run of a page, returning the
    /// page's font warnings: one fallback warning per font and one
    /// unmappable-glyph warning per affected run.
    pub fn map_page(
        &self,
        page: u32,
        ops: &mut [OutputOp],
        resources: &ResourceArena,
    ) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let mut warned_fonts = BTreeSet::new();

        for out in ops.iter_mut() {
            let OpKind::TextRun(run) = &out.op.kind else {
                continue;
            };
            let font = resources.font(run.font);
            let mapping = self.resolve_run(run, font);
            let name = font.map(|f| f.base_font.as_str()).unwrap_or("<unknown>");

            if mapping.fell_back && warned_fonts.insert(run.font) {
                debug!(font = name, "no font mapping, using default");
                warnings.push(Warning::on_page(
                    page,
                    WarningKind::FontFallback,
                    format!(
                        "font '{}' is not in the font map; using {}",
                        name,
                        self.map.default_font.postscript_name()
                    ),
                ));
            }
            if mapping.unmapped > 0 {
                warnings.push(Warning::on_page(
                    page,
                    WarningKind::UnmappableGlyph,
                    format!(
                        "{} of {} glyphs in font '{}' replaced by '{}'",
                        mapping.unmapped,
                        run.glyphs.len(),
                        name,
                        self.map.placeholder
                    ),
                ));
            }
            out.text = Some(mapping.text);
        }

        warnings
    }
}

fn drawable(text: &str, embedded: bool) -> bool {
    text.chars()
        .all(|c| !c.is_control() && (embedded || winansi_encodable(c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use unredact_core::{
        BoundingBox, Color, Disposition, DrawOp, Glyph, Point, StandardFont,
    };

    fn run(codes: &[u32], font: FontId) -> TextRun {
        TextRun {
            glyphs: codes
                .iter()
                .enumerate()
                .map(|(i, &code)| Glyph {
                    code,
                    offset: i as f64 * 5.0,
                    break_before: false,
                })
                .collect(),
            origin: Point::new(0.0, 0.0),
            font,
            font_size: 10.0,
            fill_color: Color::default(),
            upright: true,
            invisible: false,
        }
    }

    #[test]
    fn standard_font_passes_through() {
        let map = FontMap::default();
        let font = FontDescriptor::named("Helvetica-Bold");
        let mapping = FontMapper::new(&map).resolve_run(&run(&[72, 105], FontId(0)), Some(&font));
        assert_eq!(mapping.text.font, ResolvedFont::Standard(StandardFont::HelveticaBold));
        assert_eq!(mapping.text.text(), "Hi");
        assert!(!mapping.fell_back);
    }

    #[test]
    fn subset_prefix_is_ignored_for_lookup() {
        let map = FontMap::default();
        let font = FontDescriptor::named("ABCDEF+TimesNewRomanPS-BoldMT");
        let (resolved, fell_back) = FontMapper::new(&map).choose_font(FontId(0), Some(&font));
        assert_eq!(resolved, ResolvedFont::Standard(StandardFont::TimesBold));
        assert!(!fell_back);
    }

    #[test]
    fn non_subset_truetype_is_reused() {
        let map = FontMap::default();
        let mut font = FontDescriptor::named("ArialMT");
        font.subtype = FontSubtype::TrueType;
        font.program = Some(FontProgram::TrueType(Arc::new(vec![0, 1, 0, 0])));
        let (resolved, _) = FontMapper::new(&map).choose_font(FontId(3), Some(&font));
        assert_eq!(
            resolved,
            ResolvedFont::Embedded {
                font: FontId(3),
                fallback: StandardFont::Helvetica
            }
        );

        font.base_font = "ABCDEF+ArialMT".into();
        let (resolved, _) = FontMapper::new(&map).choose_font(FontId(3), Some(&font));
        assert_eq!(resolved, ResolvedFont::Standard(StandardFont::Helvetica));
    }

    #[test]
    fn to_unicode_beats_encoding_and_override_beats_both() {
        let mut map = FontMap::default();
        let mut font = FontDescriptor::named("Custom");
        font.to_unicode.insert(1, "S".into());
        font.to_unicode.insert(2, "E".into());
        font.differences.insert(1, "Z".into());

        let text = FontMapper::new(&map).resolve_run(&run(&[1, 2], FontId(0)), Some(&font)).text;
        assert_eq!(text.text(), "SE");

        map.glyphs
            .insert("Custom".into(), BTreeMap::from([(2, 'X')]));
        let text = FontMapper::new(&map).resolve_run(&run(&[1, 2], FontId(0)), Some(&font)).text;
        assert_eq!(text.text(), "SX");
    }

    #[test]
    fn differences_glyph_names_resolve() {
        let map = FontMap::default();
        let mut font = FontDescriptor::named("Helvetica");
        font.differences.insert(1, "quoteright".into());
        font.differences.insert(2, "uni00E9".into());
        font.differences.insert(3, "fi".into());
        let text = FontMapper::new(&map).resolve_run(&run(&[1, 2, 3], FontId(0)), Some(&font)).text;
        assert_eq!(text.text(), "’éfi");
        assert_eq!(text.glyph_count, 3);
    }

    #[test]
    fn unmapped_code_becomes_placeholder_and_is_not_counted() {
        let map = FontMap::default();
        let mut font = FontDescriptor::named("Helvetica");
        font.two_byte = true;
        font.to_unicode.insert(0x0041, "A".into());
        let mapping = FontMapper::new(&map)
            .resolve_run(&run(&[0x0041, 0x0F00, 0x0041], FontId(0)), Some(&font));
        assert_eq!(mapping.text.text(), "A?A");
        assert_eq!(mapping.text.text().chars().count(), 3);
        assert_eq!(mapping.text.glyph_count, 2);
        assert_eq!(mapping.unmapped, 1);
    }

    #[test]
    fn non_winansi_character_is_replaced_for_builtin_fonts() {
        let map = FontMap::default();
        let mut font = FontDescriptor::named("Helvetica");
        font.to_unicode.insert(1, "Ж".into());
        let mapping = FontMapper::new(&map).resolve_run(&run(&[1], FontId(0)), Some(&font));
        assert_eq!(mapping.text.text(), "?");
        assert!(winansi_encodable('€'));
        assert!(!winansi_encodable('Ж'));
    }

    #[test]
    fn break_before_starts_a_new_segment() {
        let map = FontMap::default();
        let font = FontDescriptor::named("Courier");
        let mut text_run = run(&[65, 66, 67], FontId(0));
        text_run.glyphs[2].break_before = true;
        let text = FontMapper::new(&map).resolve_run(&text_run, Some(&font)).text;
        assert_eq!(text.segments.len(), 2);
        assert_eq!(text.segments[0].text, "AB");
        assert_eq!(text.segments[1].text, "C");
        assert_eq!(text.segments[1].offset, 10.0);
    }

    #[test]
    fn unknown_font_warns_once_per_page() {
        let map = FontMap::default();
        let mut resources = ResourceArena::new();
        let id = resources.add_font(FontDescriptor::named("MysterySans"));
        let op = |index| OutputOp {
            op: DrawOp {
                index,
                bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                kind: OpKind::TextRun(run(&[65, 0x01], id)),
            },
            disposition: Disposition::Unchanged,
            text: None,
        };
        let mut ops = vec![op(0), op(1)];
        let warnings = FontMapper::new(&map).map_page(4, &mut ops, &resources);

        let fallbacks = warnings
            .iter()
            .filter(|w| w.kind == WarningKind::FontFallback)
            .count();
        let unmappable = warnings
            .iter()
            .filter(|w| w.kind == WarningKind::UnmappableGlyph)
            .count();
        assert_eq!(fallbacks, 1);
        assert_eq!(unmappable, 2);
        assert!(warnings.iter().all(|w| w.page == Some(4)));
        let text = ops[0].text.as_ref().unwrap();
        assert_eq!(text.font, ResolvedFont::Standard(StandardFont::TimesRoman));
        assert_eq!(text.text(), "A?");
    }
}
