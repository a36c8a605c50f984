// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Redaction detection: classify draw ops that look like overlay marks.
//
// Inclusion is decided by fixed thresholds from `EngineConfig`. The confidence
// score attached to each candidate is for reporting only.

use serde::{Deserialize, Serialize};
use tracing::debug;
use unredact_core::diagnostics::CandidateSummary;
use unredact_core::{
    BoundingBox, Color, DrawOp, EngineConfig, FillPath, ImagePlacement, OpKind, ResourceArena,
};

use crate::raster;

/// Which rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    /// A filled path in a dark or configured censor color.
    Path,
    /// A solid raster in a dark or configured censor color.
    Image,
}

/// A draw op classified as an occluder.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionCandidate {
    /// Paint index of the occluding op.
    pub index: usize,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub source: CandidateSource,
    /// Earlier ops whose bbox intersects the candidate.
    pub overlaps: usize,
}

impl RedactionCandidate {
    pub fn summary(&self, covered: usize) -> CandidateSummary {
        CandidateSummary {
            index: self.index,
            kind: match self.source {
                CandidateSource::Path => "path".to_string(),
                CandidateSource::Image => "image".to_string(),
            },
            bbox: self.bbox,
            confidence: self.confidence,
            covered,
        }
    }
}

/// Area (pt²) at which the area term of the confidence score saturates.
const AREA_SATURATION: f64 = 2_000.0;

/// Overlap count at which the overlap term saturates.
const OVERLAP_SATURATION: usize = 3;

pub struct RedactionDetector<'a> {
    config: &'a EngineConfig,
}

impl<'a> RedactionDetector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Candidates in ascending paint order.
    pub fn detect(&self, ops: &[DrawOp], resources: &ResourceArena) -> Vec<RedactionCandidate> {
        let mut candidates = Vec::new();

        for (position, op) in ops.iter().enumerate() {
            let uniformity = match &op.kind {
                OpKind::FillPath(path) => self.path_uniformity(path),
                OpKind::Image(placement) => self.image_uniformity(placement, resources),
                OpKind::TextRun(_) => None,
            };
            let Some(uniformity) = uniformity else {
                continue;
            };
            if !self.large_enough(&op.bbox) {
                continue;
            }

            let overlaps = ops[..position]
                .iter()
                .filter(|earlier| earlier.bbox.intersects(&op.bbox))
                .count();
            if self.config.require_overlap && overlaps == 0 {
                continue;
            }

            let source = match op.kind {
                OpKind::Image(_) => CandidateSource::Image,
                _ => CandidateSource::Path,
            };
            let confidence = confidence(uniformity, op.bbox.area(), overlaps);
            debug!(
                index = op.index,
                ?source,
                confidence,
                overlaps,
                "occluder candidate"
            );
            candidates.push(RedactionCandidate {
                index: op.index,
                bbox: op.bbox,
                confidence,
                source,
                overlaps,
            });
        }

        candidates
    }

    fn large_enough(&self, bbox: &BoundingBox) -> bool {
        bbox.area() > self.config.min_area
            && bbox.width() > self.config.min_thickness
            && bbox.height() > self.config.min_thickness
    }

    /// Solid fills are perfectly uniform; `None` when the path is no mark.
    fn path_uniformity(&self, path: &FillPath) -> Option<f64> {
        if !path.is_filled() {
            return None;
        }
        if self.is_censor_color(&path.fill_color) {
            Some(1.0)
        } else {
            None
        }
    }

    fn is_censor_color(&self, color: &Color) -> bool {
        color.max_channel() <= self.config.dark_threshold
            || self
                .config
                .censor_colors
                .iter()
                .any(|censor| color.distance(censor) <= self.config.censor_color_tolerance)
    }

    fn image_uniformity(
        &self,
        placement: &ImagePlacement,
        resources: &ResourceArena,
    ) -> Option<f64> {
        if raster::has_alpha(&placement.raster, resources) {
            return None;
        }
        let stats = raster::raster_stats(&placement.raster, resources)?;
        let threshold = self.config.image_variance_threshold;
        if !stats.is_uniform(threshold) || !self.is_censor_color(&stats.mean_color) {
            return None;
        }
        if threshold <= 0.0 {
            return Some(1.0);
        }
        Some(1.0 - (stats.variance / threshold).clamp(0.0, 1.0) as f64)
    }
}

fn confidence(uniformity: f64, area: f64, overlaps: usize) -> f64 {
    let area_score = (area / AREA_SATURATION).min(1.0);
    let overlap_score = overlaps.min(OVERLAP_SATURATION) as f64 / OVERLAP_SATURATION as f64;
    0.5 * uniformity + 0.3 * area_score + 0.2 * overlap_score
}
