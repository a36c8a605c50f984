// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Occlusion resolution: drop occluders, keep what they covered.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use unredact_core::{Disposition, DrawOp, OutputOp};

use crate::detector::RedactionCandidate;

/// The ops one occluder was painted over.
#[derive(Debug, Clone, PartialEq)]
pub struct Occlusion {
    /// Paint index of the occluder.
    pub occluder: usize,
    /// Paint indices of covered ops, ascending.
    pub covered: Vec<usize>,
}

/// Result of resolving one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Retained ops in source paint order. `text` is left unset.
    pub ops: Vec<OutputOp>,
    pub occlusions: Vec<Occlusion>,
}

impl Resolution {
    /// Distinct ops revealed by at least one occluder.
    pub fn revealed(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| op.disposition == Disposition::Revealed)
            .count()
    }
}

pub struct OcclusionResolver {
    min_overlap_fraction: f64,
}

impl OcclusionResolver {
    pub fn new(min_overlap_fraction: f64) -> Self {
        Self {
            min_overlap_fraction,
        }
    }

    pub fn resolve(&self, ops: &[DrawOp], candidates: &[RedactionCandidate]) -> Resolution {
        let occluders: BTreeMap<usize, &RedactionCandidate> =
            candidates.iter().map(|c| (c.index, c)).collect();

        let mut revealed = BTreeSet::new();
        let mut occlusions = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let covered: Vec<usize> = ops
                .iter()
                .filter(|op| op.index < candidate.index)
                .filter(|op| !occluders.contains_key(&op.index))
                .filter(|op| op.bbox.overlap_fraction(&candidate.bbox) > self.min_overlap_fraction)
                .map(|op| op.index)
                .collect();
            debug!(
                occluder = candidate.index,
                covered = covered.len(),
                "resolved occluder"
            );
            revealed.extend(covered.iter().copied());
            occlusions.push(Occlusion {
                occluder: candidate.index,
                covered,
            });
        }

        let ops = ops
            .iter()
            .filter(|op| !occluders.contains_key(&op.index))
            .map(|op| OutputOp {
                op: op.clone(),
                disposition: if revealed.contains(&op.index) {
                    Disposition::Revealed
                } else {
                    Disposition::Unchanged
                },
                text: None,
            })
            .collect();

        Resolution { ops, occlusions }
    }
}
