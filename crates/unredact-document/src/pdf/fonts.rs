// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font dictionaries → `FontDescriptor`: widths, encoding differences,
// ToUnicode maps and embedded programs.

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object};
use tracing::debug;
use unredact_core::{FontDescriptor, FontProgram, FontSubtype};

use super::cmap::{self, MAX_CODE};
use super::objects::{self, array, get, get_name, get_number, number, resolve, stream_bytes};

/// Default advance for Type0 fonts without `/DW`.
const CID_DEFAULT_WIDTH: f64 = 1000.0;

/// Default advance for simple fonts without metrics.
const SIMPLE_DEFAULT_WIDTH: f64 = 500.0;

/// Build a descriptor from a `/Font` dictionary. Never fails: missing parts
/// simply leave the corresponding fields empty.
pub fn load_font(doc: &Document, font: &Dictionary) -> FontDescriptor {
    let base_font = get_name(doc, font, b"BaseFont").unwrap_or("Unnamed").to_string();
    let mut descriptor = FontDescriptor::named(base_font);
    descriptor.subtype = match get_name(doc, font, b"Subtype") {
        Some("Type1") | Some("MMType1") => FontSubtype::Type1,
        Some("TrueType") => FontSubtype::TrueType,
        Some("Type0") => FontSubtype::Type0,
        Some("Type3") => FontSubtype::Type3,
        _ => FontSubtype::Unknown,
    };

    if let Some(stream) = get(doc, font, b"ToUnicode").and_then(|o| objects::stream(doc, o))
        && let Some(bytes) = stream_bytes(stream)
    {
        descriptor.to_unicode = cmap::parse_to_unicode(&bytes);
    }

    if descriptor.subtype == FontSubtype::Type0 {
        descriptor.two_byte = true;
        descriptor.default_width = CID_DEFAULT_WIDTH;
        if let Some(cid_font) = descendant(doc, font) {
            if let Some(dw) = get_number(doc, cid_font, b"DW") {
                descriptor.default_width = dw;
            }
            if let Some(w) = get(doc, cid_font, b"W").and_then(|o| array(doc, o)) {
                descriptor.widths = parse_cid_widths(doc, w);
            }
            descriptor.program = font_program(doc, cid_font);
        }
    } else {
        descriptor.default_width = missing_width(doc, font).unwrap_or(SIMPLE_DEFAULT_WIDTH);
        descriptor.widths = simple_widths(doc, font);
        if descriptor.subtype == FontSubtype::Type3 {
            scale_type3_widths(doc, font, &mut descriptor.widths);
        }
        descriptor.differences = differences(doc, font);
        descriptor.program = font_program(doc, font);
    }

    debug!(
        font = %descriptor.base_font,
        subtype = ?descriptor.subtype,
        widths = descriptor.widths.len(),
        to_unicode = descriptor.to_unicode.len(),
        embedded = descriptor.program.is_some(),
        "font loaded"
    );
    descriptor
}

fn descendant<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    let fonts = get(doc, font, b"DescendantFonts").and_then(|o| array(doc, o))?;
    objects::dict(doc, fonts.first()?)
}

/// A numeric code operand, if it names a character code.
fn code(value: f64) -> Option<u32> {
    (0.0..=MAX_CODE as f64).contains(&value).then_some(value as u32)
}

fn simple_widths(doc: &Document, font: &Dictionary) -> BTreeMap<u32, f64> {
    let Some(first) = code(get_number(doc, font, b"FirstChar").unwrap_or(0.0)) else {
        return BTreeMap::new();
    };
    let Some(widths) = get(doc, font, b"Widths").and_then(|o| array(doc, o)) else {
        return BTreeMap::new();
    };
    widths
        .iter()
        .zip(first..=MAX_CODE)
        .filter_map(|(w, code)| Some((code, number(resolve(doc, w))?)))
        .collect()
}

fn missing_width(doc: &Document, font: &Dictionary) -> Option<f64> {
    let descriptor = get(doc, font, b"FontDescriptor").and_then(|o| objects::dict(doc, o))?;
    get_number(doc, descriptor, b"MissingWidth").filter(|w| *w > 0.0)
}

/// Type3 widths are in glyph space; bring them to thousandths of an em.
fn scale_type3_widths(doc: &Document, font: &Dictionary, widths: &mut BTreeMap<u32, f64>) {
    let scale = get(doc, font, b"FontMatrix")
        .and_then(|o| array(doc, o))
        .and_then(|m| m.first().and_then(|a| number(resolve(doc, a))))
        .unwrap_or(0.001);
    for width in widths.values_mut() {
        *width *= scale * 1000.0;
    }
}

/// `/W` array: `c [w1 w2 ...]` or `c_first c_last w`.
fn parse_cid_widths(doc: &Document, items: &[Object]) -> BTreeMap<u32, f64> {
    let mut widths = BTreeMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(start) = number(resolve(doc, &items[i])) else {
            i += 1;
            continue;
        };
        // An out-of-range start still consumes its operands.
        let start = code(start);
        match items.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                if let Some(start) = start {
                    for (w, cid) in list.iter().zip(start..=MAX_CODE) {
                        if let Some(w) = number(resolve(doc, w)) {
                            widths.insert(cid, w);
                        }
                    }
                }
                i += 2;
            }
            Some(end) => {
                let end = number(end).map(|e| e.min(MAX_CODE as f64) as u32);
                let width = items.get(i + 2).and_then(|o| number(resolve(doc, o)));
                if let (Some(start), Some(end), Some(width)) = (start, end, width) {
                    for cid in start..=end {
                        widths.insert(cid, width);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// `/Encoding << /Differences [code /name /name code /name ...] >>`.
fn differences(doc: &Document, font: &Dictionary) -> BTreeMap<u32, String> {
    let mut map = BTreeMap::new();
    let Some(encoding) = get(doc, font, b"Encoding").and_then(|o| objects::dict(doc, o)) else {
        return map;
    };
    let Some(items) = get(doc, encoding, b"Differences").and_then(|o| array(doc, o)) else {
        return map;
    };

    // `None` once the codes run past the two-byte range.
    let mut next = Some(0u32);
    for item in items {
        match resolve(doc, item) {
            Object::Integer(start) => next = code(*start as f64),
            Object::Name(name) => {
                if let Some(at) = next {
                    map.insert(at, String::from_utf8_lossy(name).into_owned());
                    next = at.checked_add(1).filter(|c| *c <= MAX_CODE);
                }
            }
            _ => {}
        }
    }
    map
}

fn font_program(doc: &Document, font: &Dictionary) -> Option<FontProgram> {
    let descriptor = get(doc, font, b"FontDescriptor").and_then(|o| objects::dict(doc, o))?;
    let load = |key: &[u8]| -> Option<Arc<Vec<u8>>> {
        let stream = get(doc, descriptor, key).and_then(|o| objects::stream(doc, o))?;
        stream_bytes(stream).map(Arc::new)
    };

    if let Some(bytes) = load(b"FontFile2") {
        return Some(FontProgram::TrueType(bytes));
    }
    if let Some(bytes) = load(b"FontFile") {
        return Some(FontProgram::Type1(bytes));
    }
    let stream = get(doc, descriptor, b"FontFile3").and_then(|o| objects::stream(doc, o))?;
    let bytes = Arc::new(stream_bytes(stream)?);
    match get_name(doc, &stream.dict, b"Subtype") {
        Some("OpenType") => Some(FontProgram::OpenType(bytes)),
        _ => Some(FontProgram::Type1(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    #[test]
    fn simple_font_widths_and_differences() {
        let mut doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ABCDEF+Garamond",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(600), Object::Integer(700)],
            "Encoding" => dictionary! {
                "Differences" => Object::Array(vec![
                    Object::Integer(1),
                    Object::Name(b"quoteright".to_vec()),
                    Object::Name(b"fi".to_vec()),
                ]),
            },
        };
        let font_id = doc.add_object(font);
        let font = doc.get_object(font_id).unwrap().as_dict().unwrap();
        let loaded = load_font(&doc, font);

        assert_eq!(loaded.subtype, FontSubtype::Type1);
        assert_eq!(loaded.family_name(), "Garamond");
        assert_eq!(loaded.width(65), 600.0);
        assert_eq!(loaded.width(66), 700.0);
        assert_eq!(loaded.width(67), SIMPLE_DEFAULT_WIDTH);
        assert_eq!(loaded.differences.get(&1).map(String::as_str), Some("quoteright"));
        assert_eq!(loaded.differences.get(&2).map(String::as_str), Some("fi"));
        assert!(!loaded.two_byte);
    }

    #[test]
    fn type0_font_reads_descendant_widths_and_to_unicode() {
        let mut doc = Document::with_version("1.5");
        let cmap = doc.add_object(Stream::new(
            dictionary! {},
            b"1 beginbfchar <0005> <0048> endbfchar".to_vec(),
        ));
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "Arial",
            "DW" => 800,
            "W" => Object::Array(vec![
                Object::Integer(5),
                Object::Array(vec![Object::Integer(450), Object::Integer(460)]),
                Object::Integer(10),
                Object::Integer(12),
                Object::Integer(300),
            ]),
        });
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Arial",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
            "ToUnicode" => cmap,
        });
        let font = doc.get_object(font_id).unwrap().as_dict().unwrap();
        let loaded = load_font(&doc, font);

        assert!(loaded.two_byte);
        assert_eq!(loaded.width(5), 450.0);
        assert_eq!(loaded.width(6), 460.0);
        assert_eq!(loaded.width(11), 300.0);
        assert_eq!(loaded.width(99), 800.0);
        assert_eq!(loaded.to_unicode.get(&5).map(String::as_str), Some("H"));
    }

    #[test]
    fn out_of_range_codes_are_ignored() {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Broken",
            "FirstChar" => 4294967295i64,
            "Widths" => vec![Object::Integer(500), Object::Integer(600)],
            "Encoding" => dictionary! {
                "Differences" => Object::Array(vec![
                    Object::Integer(4294967295),
                    Object::Name(b"a".to_vec()),
                    Object::Integer(65535),
                    Object::Name(b"b".to_vec()),
                    Object::Name(b"c".to_vec()),
                ]),
            },
        });
        let font = doc.get_object(font_id).unwrap().as_dict().unwrap();
        let loaded = load_font(&doc, font);

        assert!(loaded.widths.is_empty());
        assert_eq!(loaded.differences.len(), 1);
        assert_eq!(loaded.differences.get(&0xFFFF).map(String::as_str), Some("b"));
    }

    #[test]
    fn cid_width_ranges_stop_at_the_two_byte_limit() {
        let doc = Document::with_version("1.5");
        let items = vec![
            Object::Integer(65534),
            Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)]),
            Object::Integer(65530),
            Object::Integer(4294967295),
            Object::Integer(250),
            Object::Integer(4294967295),
            Object::Array(vec![Object::Integer(9)]),
            Object::Integer(7),
            Object::Integer(7),
            Object::Integer(100),
        ];
        let widths = parse_cid_widths(&doc, &items);

        assert_eq!(widths.get(&65534), Some(&250.0));
        assert_eq!(widths.get(&65535), Some(&250.0));
        assert_eq!(widths.get(&65530), Some(&250.0));
        assert_eq!(widths.get(&7), Some(&100.0));
        assert_eq!(widths.len(), 7);
    }

    #[test]
    fn embedded_truetype_program_is_kept() {
        let mut doc = Document::with_version("1.5");
        let file = doc.add_object(Stream::new(dictionary! {}, vec![0, 1, 0, 0, 42]));
        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => "ArialMT",
            "FontFile2" => file,
        });
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "ArialMT",
            "FontDescriptor" => descriptor,
        });
        let font = doc.get_object(font_id).unwrap().as_dict().unwrap();
        let loaded = load_font(&doc, font);

        match loaded.program {
            Some(FontProgram::TrueType(bytes)) => assert_eq!(bytes.as_slice(), &[0, 1, 0, 0, 42]),
            other => panic!("unexpected program {:?}", other),
        }
    }
}
