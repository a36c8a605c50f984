// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: loading and interpreting input documents, writing output.

pub mod cmap;
pub mod content;
pub mod fonts;
pub mod objects;
pub mod reader;
pub mod writer;

pub use content::{ContentExtractor, ResourceCache};
pub use reader::{Extraction, PdfReader};
pub use writer::{PdfWriter, WrittenPdf};
