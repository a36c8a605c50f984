// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end conversion: read a PDF, run the engine, write the rebuilt PDF.
//
// Every fatal check (parse, encryption, empty page tree) happens before the
// output is written, so a failed run never leaves a partial file behind.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};
use unredact_core::error::Result;
use unredact_core::{EngineConfig, Report, UnredactError};
use unredact_engine::{Reconstructor, Unredactor};

use crate::pdf::reader::PdfReader;
use crate::pdf::writer::PdfWriter;

/// Suffix appended to the input's file stem.
pub const OUTPUT_SUFFIX: &str = "-unredacted";

/// A rebuilt PDF and the diagnostics of every stage.
#[derive(Debug, Clone)]
pub struct Converted {
    pub bytes: Vec<u8>,
    pub report: Report,
}

/// `<stem>-unredacted<.ext>` beside the input.
pub fn output_path_for(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| UnredactError::InvalidPath(input.display().to_string()))?;
    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };
    Ok(input.with_file_name(name))
}

/// Run the whole pipeline over an already-open reader.
#[instrument(skip_all, fields(pages = reader.page_count()))]
pub fn unredact_reader(reader: &PdfReader, config: &EngineConfig, title: &str) -> Result<Converted> {
    let extraction = reader.extract()?;
    let unredacted = Unredactor::new(config.clone()).process(&extraction.document)?;

    let mut writer = PdfWriter::new(title).with_placeholder(config.fonts.placeholder);
    Reconstructor::new(&extraction.document.resources).emit_all(&unredacted.pages, &mut writer)?;
    let written = writer.finish()?;

    let mut report = Report::new();
    report.extend_warnings(extraction.warnings);
    report.extend_warnings(unredacted.report.warnings);
    report.extend_warnings(written.warnings);
    report.pages = unredacted.report.pages;

    Ok(Converted {
        bytes: written.bytes,
        report,
    })
}

/// Unredact PDF bytes held in memory.
pub fn unredact_bytes(data: &[u8], config: &EngineConfig) -> Result<Converted> {
    let reader = PdfReader::from_bytes(data)?;
    unredact_reader(&reader, config, "unredacted")
}

/// Unredact `input` into `output`. Returns the diagnostics report.
#[instrument(skip(config), fields(input = %input.display(), output = %output.display()))]
pub fn unredact_file(input: &Path, output: &Path, config: &EngineConfig) -> Result<Report> {
    let reader = PdfReader::open(input)?;
    let title = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unredacted");
    let converted = unredact_reader(&reader, config, title)?;

    std::fs::write(output, &converted.bytes)?;
    info!(
        pages = converted.report.pages.len(),
        occluders = converted.report.occluders_removed(),
        revealed = converted.report.ops_revealed(),
        warnings = converted.report.warnings.len(),
        "Wrote {}",
        output.display()
    );
    Ok(converted.report)
}
