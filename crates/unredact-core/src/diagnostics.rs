// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic report returned alongside the output. Non-fatal problems are
// collected here rather than printed, so the caller decides how to surface
// them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Category of a non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// An operator referenced a font, image, or graphics state that the
    /// resource dictionary does not define.
    MissingResource,
    /// A glyph had no mapping and was replaced by the placeholder.
    UnmappableGlyph,
    /// Rotated/skewed text or another layout feature placed best-effort.
    UnsupportedLayout,
    /// Image data could not be decoded. The image was skipped, or kept
    /// without its soft mask when only the mask was unreadable.
    UndecodableImage,
    /// A font was substituted by the default font, or an embedded program
    /// could not be reused.
    FontFallback,
    /// The PDF serialiser reported a problem with an operation it wrote.
    WriterIssue,
}

/// One non-fatal problem, optionally tied to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// 1-indexed page number.
    pub page: Option<u32>,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(page: Option<u32>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            page,
            kind,
            message: message.into(),
        }
    }

    pub fn on_page(page: u32, kind: WarningKind, message: impl Into<String>) -> Self {
        Self::new(Some(page), kind, message)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "page {}: {:?}: {}", page, self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// Why an op was classified as an occluder. Diagnostic only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    /// Paint index of the occluder.
    pub index: usize,
    pub kind: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
    /// Number of earlier ops it hid.
    pub covered: usize,
}

/// Per-page outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: u32,
    pub input_ops: usize,
    pub output_ops: usize,
    pub candidates: Vec<CandidateSummary>,
    /// Ops that were under at least one removed occluder.
    pub revealed: usize,
    /// Transparency pairs merged into one image.
    pub repaired_images: usize,
}

/// Aggregated diagnostics for one document run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub pages: Vec<PageSummary>,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    pub fn occluders_removed(&self) -> usize {
        self.pages.iter().map(|p| p.candidates.len()).sum()
    }

    pub fn ops_revealed(&self) -> usize {
        self.pages.iter().map(|p| p.revealed).sum()
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
