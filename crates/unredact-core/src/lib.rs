// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// unredact: Core types, configuration and error definitions shared across
// all crates.

pub mod color;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod human_errors;
pub mod types;

pub use color::Color;
pub use config::{EngineConfig, FontMap, StandardFont};
pub use diagnostics::{Report, Warning, WarningKind};
pub use error::UnredactError;
pub use geometry::{BoundingBox, Matrix, PathSegment, Point};
pub use types::*;
