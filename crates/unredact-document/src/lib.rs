// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// unredact-document: the PDF side of unredact.
//
// Reads a PDF with lopdf and interprets its content streams into the
// `unredact_core` page model, and writes the engine's output back out as a
// new PDF with printpdf.

pub mod convert;
pub mod image;
pub mod pdf;

// Re-export the primary entry points so callers can use
// `unredact_document::PdfReader` etc.
pub use convert::{Converted, output_path_for, unredact_bytes, unredact_file, unredact_reader};
pub use pdf::reader::{Extraction, PdfReader};
pub use pdf::writer::{PdfWriter, WrittenPdf};
