// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// unredact engine: the pure, in-memory half of the pipeline. Everything here
// works on `unredact_core` page models; parsing and writing PDF bytes live in
// `unredact-document`.

pub mod detector;
pub mod fonts;
pub mod occlusion;
pub mod pipeline;
pub mod raster;
pub mod reconstruct;
pub mod transparency;

pub use detector::{CandidateSource, RedactionCandidate, RedactionDetector};
pub use fonts::{FontMapper, RunMapping};
pub use occlusion::{Occlusion, OcclusionResolver, Resolution};
pub use pipeline::{PageOutcome, Unredacted, Unredactor};
pub use reconstruct::{DrawingSurface, EmitStats, ImageData, Reconstructor};
pub use transparency::{RepairOutcome, TransparencyRepair};
