// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the unredact-document crate: content extraction
// alone, and the full read → unredact → write round trip, on a synthetic
// one-page PDF.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lopdf::{Object, Stream, dictionary};

use unredact_core::EngineConfig;
use unredact_document::{PdfReader, unredact_bytes};

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A letter-sized page with 60 lines of text, every third one covered by a
/// black box.
fn synthetic_pdf() -> Vec<u8> {
    let mut content = String::new();
    for line in 0..60 {
        let y = 760 - line * 12;
        content.push_str(&format!(
            "BT /F1 10 Tf 40 {} Td (Line {} of the quarterly report) Tj ET\n",
            y, line
        ));
        if line % 3 == 0 {
            content.push_str(&format!("0 g 38 {} 200 12 re f\n", y - 3));
        }
    }

    let mut doc = lopdf::Document::with_version("1.5");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
        "Contents" => Object::Reference(content_id),
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture PDF serialises");
    bytes
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Parse and interpret the page content only.
fn bench_extract(c: &mut Criterion) {
    let bytes = synthetic_pdf();
    c.bench_function("extract (60 lines)", |b| {
        b.iter(|| {
            let reader = PdfReader::from_bytes(black_box(&bytes)).expect("fixture loads");
            black_box(reader.extract().expect("fixture extracts"));
        });
    });
}

/// The whole pipeline, including printpdf serialisation.
fn bench_round_trip(c: &mut Criterion) {
    let bytes = synthetic_pdf();
    let config = EngineConfig::default();
    c.bench_function("unredact round trip (60 lines)", |b| {
        b.iter(|| {
            let converted = unredact_bytes(black_box(&bytes), &config).expect("fixture converts");
            black_box(converted.bytes.len());
        });
    });
}

criterion_group!(benches, bench_extract, bench_round_trip);
criterion_main!(benches);
