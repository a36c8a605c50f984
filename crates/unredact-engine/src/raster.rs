// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel statistics and compositing helpers shared by the detector, the
// transparency repair pass and the writer.

use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage};
use unredact_core::{Color, ImageResource, Raster, ResourceArena};

/// Summary of an image's luma distribution plus its average color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterStats {
    /// Mean luma, 0.0–1.0.
    pub mean_luma: f32,
    /// Luma variance on the 0.0–1.0 scale.
    pub variance: f32,
    /// Average pixel color.
    pub mean_color: Color,
}

impl RasterStats {
    /// Whether the image is a flat fill within `variance_threshold`.
    pub fn is_uniform(&self, variance_threshold: f32) -> bool {
        self.variance <= variance_threshold
    }
}

/// Longest side sampled when gathering statistics; larger images are read on
/// a stride so huge scans stay cheap.
const SAMPLE_EDGE: u32 = 256;

pub fn rgb_stats(image: &RgbImage) -> Option<RasterStats> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let step_x = (width / SAMPLE_EDGE).max(1);
    let step_y = (height / SAMPLE_EDGE).max(1);

    let mut count = 0f64;
    let mut sum = 0f64;
    let mut sum_sq = 0f64;
    let mut channels = [0f64; 3];

    for y in (0..height).step_by(step_y as usize) {
        for x in (0..width).step_by(step_x as usize) {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            let luma = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
            sum += luma;
            sum_sq += luma * luma;
            channels[0] += r as f64;
            channels[1] += g as f64;
            channels[2] += b as f64;
            count += 1.0;
        }
    }

    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    Some(RasterStats {
        mean_luma: mean as f32,
        variance: variance as f32,
        mean_color: Color::Rgb(
            (channels[0] / count / 255.0) as f32,
            (channels[1] / count / 255.0) as f32,
            (channels[2] / count / 255.0) as f32,
        ),
    })
}

pub fn dynamic_stats(image: &DynamicImage) -> Option<RasterStats> {
    rgb_stats(&image.to_rgb8())
}

/// Statistics for whatever pixels a placement refers to. `None` when the
/// resource is missing or empty.
pub fn raster_stats(raster: &Raster, resources: &ResourceArena) -> Option<RasterStats> {
    match raster {
        Raster::Resource(id) => dynamic_stats(&resources.image(*id)?.pixels),
        Raster::Composited(pixels) => rgb_stats(pixels),
    }
}

/// Whether the raster carries its own alpha (soft mask or alpha channel).
pub fn has_alpha(raster: &Raster, resources: &ResourceArena) -> bool {
    match raster {
        Raster::Resource(id) => resources
            .image(*id)
            .map(resource_has_alpha)
            .unwrap_or(false),
        Raster::Composited(_) => false,
    }
}

pub fn resource_has_alpha(resource: &ImageResource) -> bool {
    resource.soft_mask.is_some() || resource.pixels.color().has_alpha()
}

/// Replace every pixel within `tolerance` of `background` by `backdrop`.
pub fn knock_out_background(
    image: &RgbImage,
    background: &Color,
    tolerance: f32,
    backdrop: &Color,
) -> RgbImage {
    let fill = Rgb(backdrop.to_rgb8());
    let [br, bg, bb] = background.to_rgb();
    let limit = tolerance * 255.0;
    let (br, bg, bb) = (br * 255.0, bg * 255.0, bb * 255.0);

    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let px = *image.get_pixel(x, y);
        let Rgb([r, g, b]) = px;
        let close = (r as f32 - br).abs() <= limit
            && (g as f32 - bg).abs() <= limit
            && (b as f32 - bb).abs() <= limit;
        if close { fill } else { px }
    })
}

/// The resource's pixels with its soft mask (if any) as the alpha channel.
/// A mask of a different size than the image is ignored.
pub fn with_alpha(resource: &ImageResource) -> RgbaImage {
    let mut rgba = resource.pixels.to_rgba8();
    let mask: Option<&GrayImage> = resource
        .soft_mask
        .as_ref()
        .filter(|m| m.dimensions() == rgba.dimensions());
    if let Some(mask) = mask {
        for (px, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
            px.0[3] = alpha.0[0];
        }
    }
    rgba
}
