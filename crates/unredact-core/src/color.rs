// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paint colors in the three device color spaces the extractor understands.

use serde::{Deserialize, Serialize};

/// A fill or stroke color. Components are in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Color {
    Gray(f32),
    Rgb(f32, f32, f32),
    Cmyk(f32, f32, f32, f32),
}

impl Default for Color {
    /// PDF's initial fill color is black in DeviceGray.
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

impl Color {
    /// Build a color from raw operand components, inferring the space from
    /// the component count. Returns `None` for counts that match no device
    /// space (e.g. pattern names).
    pub fn from_components(components: &[f32]) -> Option<Self> {
        let clamp = |v: f32| v.clamp(0.0, 1.0);
        match components {
            [g] => Some(Color::Gray(clamp(*g))),
            [r, g, b] => Some(Color::Rgb(clamp(*r), clamp(*g), clamp(*b))),
            [c, m, y, k] => Some(Color::Cmyk(clamp(*c), clamp(*m), clamp(*y), clamp(*k))),
            _ => None,
        }
    }

    /// Naive device conversion to RGB.
    pub fn to_rgb(&self) -> [f32; 3] {
        match *self {
            Color::Gray(g) => [g, g, g],
            Color::Rgb(r, g, b) => [r, g, b],
            Color::Cmyk(c, m, y, k) => [
                (1.0 - c) * (1.0 - k),
                (1.0 - m) * (1.0 - k),
                (1.0 - y) * (1.0 - k),
            ],
        }
    }

    /// Rec. 601 luma in `0.0..=1.0`.
    pub fn luminance(&self) -> f32 {
        let [r, g, b] = self.to_rgb();
        0.299 * r + 0.587 * g + 0.114 * b
    }

    /// Largest RGB channel. A color is "dark" when even its brightest channel
    /// stays under the threshold.
    pub fn max_channel(&self) -> f32 {
        let [r, g, b] = self.to_rgb();
        r.max(g).max(b)
    }

    /// Largest per-channel RGB difference to `other`.
    pub fn distance(&self, other: &Color) -> f32 {
        let a = self.to_rgb();
        let b = other.to_rgb();
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    /// 8-bit RGB triple, used when painting raster backdrops.
    pub fn to_rgb8(&self) -> [u8; 3] {
        let [r, g, b] = self.to_rgb();
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(r), q(g), q(b)]
    }

    pub fn white() -> Self {
        Color::Gray(1.0)
    }
}
