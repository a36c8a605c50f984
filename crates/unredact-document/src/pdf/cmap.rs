// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ToUnicode CMap parsing (`bfchar` and `bfrange` sections).
//
// Malformed entries are skipped rather than failing the font; a partially
// mapped font still renders more text than an unmapped one.

use std::collections::BTreeMap;

/// Largest character code a one- or two-byte string can produce.
pub const MAX_CODE: u32 = 0xFFFF;

/// Parse a ToUnicode CMap into code → text.
pub fn parse_to_unicode(data: &[u8]) -> BTreeMap<u32, String> {
    let text = String::from_utf8_lossy(data);
    let mut map = BTreeMap::new();

    for section in sections(&text, "beginbfchar", "endbfchar") {
        for line in section.lines() {
            let tokens = hex_tokens(line);
            if let [src, dst, ..] = tokens.as_slice()
                && let (Some(code), Some(text)) = (parse_code(src), decode_utf16be(dst))
            {
                map.insert(code, text);
            }
        }
    }

    for section in sections(&text, "beginbfrange", "endbfrange") {
        for line in section.lines() {
            parse_range_line(line, &mut map);
        }
    }

    map
}

fn sections<'a>(text: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(begin) {
        let body = &rest[start + begin.len()..];
        match body.find(end) {
            Some(stop) => {
                found.push(&body[..stop]);
                rest = &body[stop + end.len()..];
            }
            None => break,
        }
    }
    found
}

fn parse_range_line(line: &str, map: &mut BTreeMap<u32, String>) {
    let (head, array) = match line.find('[') {
        Some(open) => (&line[..open], Some(&line[open + 1..])),
        None => (line, None),
    };
    let tokens = hex_tokens(head);
    let (Some(low), Some(high)) = (
        tokens.first().and_then(|t| parse_code(t)),
        tokens.get(1).and_then(|t| parse_code(t)),
    ) else {
        return;
    };
    let high = high.min(MAX_CODE);
    if high < low {
        return;
    }

    match array {
        Some(items) => {
            let items = items.split(']').next().unwrap_or_default();
            for (code, dst) in (low..=high).zip(hex_tokens(items)) {
                if let Some(text) = decode_utf16be(dst) {
                    map.insert(code, text);
                }
            }
        }
        None => {
            let Some(start) = tokens.get(2).and_then(|t| decode_utf16be(t)) else {
                return;
            };
            // The last code unit is incremented across the range.
            let mut units: Vec<char> = start.chars().collect();
            let Some(last) = units.pop() else {
                return;
            };
            let prefix: String = units.into_iter().collect();
            for (step, code) in (low..=high).enumerate() {
                if let Some(c) = char::from_u32(last as u32 + step as u32) {
                    map.insert(code, format!("{}{}", prefix, c));
                }
            }
        }
    }
}

fn hex_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open + 1..].find('>') else {
            break;
        };
        tokens.push(&rest[open + 1..open + 1 + close]);
        rest = &rest[open + 1 + close + 1..];
    }
    tokens
}

fn parse_code(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex.trim(), 16).ok()
}

/// Decode hex UTF-16BE; two-digit values are treated as one code unit.
fn decode_utf16be(hex: &str) -> Option<String> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    let padded = if hex.len() == 2 { format!("00{}", hex) } else { hex };
    if padded.is_empty() || padded.len() % 4 != 0 {
        return None;
    }
    let units: Vec<u16> = padded
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .ok()
                .and_then(|s| u16::from_str_radix(s, 16).ok())
        })
        .collect::<Option<_>>()?;
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
2 beginbfchar
<0003> <0020>
<0024> <0041>
endbfchar
2 beginbfrange
<0044> <0046> <0061>
<0050> <0051> [<00660069> <D83DDE00>]
endbfrange
endcmap";

    #[test]
    fn bfchar_entries_map_single_codes() {
        let map = parse_to_unicode(CMAP);
        assert_eq!(map.get(&0x03).map(String::as_str), Some(" "));
        assert_eq!(map.get(&0x24).map(String::as_str), Some("A"));
    }

    #[test]
    fn bfrange_increments_destination() {
        let map = parse_to_unicode(CMAP);
        assert_eq!(map.get(&0x44).map(String::as_str), Some("a"));
        assert_eq!(map.get(&0x46).map(String::as_str), Some("c"));
    }

    #[test]
    fn bfrange_array_form_handles_ligatures_and_surrogates() {
        let map = parse_to_unicode(CMAP);
        assert_eq!(map.get(&0x50).map(String::as_str), Some("fi"));
        assert_eq!(map.get(&0x51).map(String::as_str), Some("😀"));
    }

    #[test]
    fn oversized_bfrange_is_capped() {
        let map = parse_to_unicode(b"beginbfrange <FFFE> <FFFFFFFF> <0041> endbfrange");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&0xFFFF).map(String::as_str), Some("B"));

        let beyond = parse_to_unicode(b"beginbfrange <10000> <FFFFFFFF> <0041> endbfrange");
        assert!(beyond.is_empty());
    }

    #[test]
    fn garbage_yields_empty_map() {
        assert!(parse_to_unicode(b"beginbfchar <zz> <0041> endbfchar").is_empty());
        assert!(parse_to_unicode(b"").is_empty());
    }
}
