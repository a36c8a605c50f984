// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small helpers over lopdf's object model: reference resolution, numbers,
// names and page-tree inheritance.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Follow a reference; other objects are returned as-is. Dangling references
/// resolve to the reference itself.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

pub fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// All operands as numbers, or `None` if any is not numeric.
pub fn numbers(objects: &[Object]) -> Option<Vec<f64>> {
    objects.iter().map(number).collect()
}

pub fn name(object: &Object) -> Option<&str> {
    match object {
        Object::Name(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

pub fn dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn stream<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Stream> {
    match resolve(doc, object) {
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

pub fn array<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Vec<Object>> {
    match resolve(doc, object) {
        Object::Array(items) => Some(items),
        _ => None,
    }
}

/// Look up `key` in `dict`, resolving a reference value.
pub fn get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|value| resolve(doc, value))
}

pub fn get_number(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    get(doc, dict, key).and_then(number)
}

pub fn get_name<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a str> {
    get(doc, dict, key).and_then(name)
}

/// Sub-dictionary of a resource dictionary (`/Font`, `/XObject`, ...).
pub fn sub_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key).ok().and_then(|value| self::dict(doc, value))
}

/// Stream bytes with filters removed. Streams whose filter lopdf cannot
/// undo yield `None`.
pub fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()
    } else {
        Some(stream.content.clone())
    }
}

/// Look up a page attribute, walking `/Parent` for inherited keys.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    // Page trees are shallow; the bound only guards against cycles.
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").ok()?;
        current = dict(doc, parent)?;
    }
    None
}

/// `[x0 y0 x1 y1]` rectangle array.
pub fn rect(doc: &Document, object: &Object) -> Option<[f64; 4]> {
    let items = array(doc, object)?;
    if items.len() != 4 {
        return None;
    }
    let values: Vec<f64> = items
        .iter()
        .map(|item| number(resolve(doc, item)))
        .collect::<Option<_>>()?;
    Some([values[0], values[1], values[2], values[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn inherited_value_comes_from_parent() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            }),
        );

        let media = inherited(&doc, page_id, b"MediaBox").unwrap();
        assert_eq!(rect(&doc, media), Some([0.0, 0.0, 300.0, 400.0]));
        assert!(inherited(&doc, page_id, b"Rotate").is_none());
    }

    #[test]
    fn numbers_rejects_mixed_operands() {
        assert_eq!(
            numbers(&[Object::Integer(1), Object::Real(0.5)]),
            Some(vec![1.0, 0.5])
        );
        assert_eq!(numbers(&[Object::Integer(1), Object::Name(b"P0".to_vec())]), None);
    }
}
