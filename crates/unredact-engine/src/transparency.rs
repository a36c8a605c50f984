// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transparency repair: undo simulated alpha.
//
// Some producers fake a transparent image by painting a solid background
// image and the real image exactly on top of it. Stripping the dark lower
// half as an occluder would leave the upper image on a black field, so pairs
// are merged into one image before detection runs. Images that are not part
// of a pair pass through untouched, soft masks included.

use std::sync::Arc;

use tracing::debug;
use unredact_core::{
    BoundingBox, DrawOp, EngineConfig, ImagePlacement, OpKind, Raster, ResourceArena,
};

use crate::raster;

/// Ops after repair, with paint indices taken from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub ops: Vec<DrawOp>,
    /// Pairs merged into one image.
    pub pairs_merged: usize,
}

pub struct TransparencyRepair<'a> {
    config: &'a EngineConfig,
}

impl<'a> TransparencyRepair<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn repair(&self, ops: &[DrawOp], resources: &ResourceArena) -> RepairOutcome {
        let mut out = Vec::with_capacity(ops.len());
        let mut pairs_merged = 0;
        let mut position = 0;

        while position < ops.len() {
            let op = &ops[position];
            let merged = ops
                .get(position + 1)
                .and_then(|next| self.merge_pair(op, next, resources));
            if let Some(merged) = merged {
                debug!(lower = op.index, upper = merged.index, "merged transparency pair");
                out.push(merged);
                pairs_merged += 1;
                position += 2;
                continue;
            }

            out.push(op.clone());
            position += 1;
        }

        RepairOutcome {
            ops: out,
            pairs_merged,
        }
    }

    fn merge_pair(
        &self,
        lower: &DrawOp,
        upper: &DrawOp,
        resources: &ResourceArena,
    ) -> Option<DrawOp> {
        let (OpKind::Image(bottom), OpKind::Image(top)) = (&lower.kind, &upper.kind) else {
            return None;
        };
        if !lower.bbox.approx_eq(&upper.bbox, self.config.pair_tolerance) {
            return None;
        }
        if raster::has_alpha(&top.raster, resources) {
            return None;
        }

        let threshold = self.config.image_variance_threshold;
        let background = raster::raster_stats(&bottom.raster, resources)?;
        if !background.is_uniform(threshold) {
            return None;
        }
        // Two solid images stacked are just a solid image, not a pair.
        let foreground = raster::raster_stats(&top.raster, resources)?;
        if foreground.is_uniform(threshold) {
            return None;
        }

        let pixels = match &top.raster {
            Raster::Resource(id) => resources.image(*id)?.pixels.to_rgb8(),
            Raster::Composited(pixels) => pixels.as_ref().clone(),
        };
        let knocked = raster::knock_out_background(
            &pixels,
            &background.mean_color,
            self.config.background_match_tolerance,
            &self.config.backdrop,
        );

        Some(composited(upper.index, upper.bbox, knocked))
    }
}

fn composited(index: usize, bbox: BoundingBox, pixels: image::RgbImage) -> DrawOp {
    DrawOp {
        index,
        bbox,
        kind: OpKind::Image(ImagePlacement {
            raster: Raster::Composited(Arc::new(pixels)),
        }),
    }
}
