// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObject decoding into `image` buffers.
//
// Supported: DCT (JPEG) via the `image` crate, and raw or Flate/LZW-encoded
// samples in DeviceGray, DeviceRGB, DeviceCMYK, ICCBased and Indexed color
// spaces at 1, 2, 4, 8 or 16 bits per component. Soft masks are decoded the
// same way and resized to the base image; a mask that fails to decode is
// dropped and the image kept.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage};
use lopdf::{Document, Object, Stream};
use tracing::{debug, instrument, warn};
use unredact_core::error::Result;
use unredact_core::{Color, ImageResource, UnredactError};

use crate::pdf::objects::{self, get, get_number, name, number, resolve};

/// Decoded pixel layout of an image's color space.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Base palette expanded to RGB, indexed by sample value.
    Indexed(Vec<[u8; 3]>),
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed(_) => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

/// An image and, when its soft mask was unusable, why the mask was dropped.
#[derive(Debug)]
pub struct DecodedImage {
    pub resource: ImageResource,
    pub dropped_mask: Option<UnredactError>,
}

/// Decode an image XObject, including its `/SMask`.
#[instrument(skip(doc, stream), fields(name))]
pub fn decode_image(doc: &Document, stream: &Stream, name: &str) -> Result<DecodedImage> {
    let pixels = decode_pixels(doc, stream)?;
    let mut dropped_mask = None;
    let soft_mask = match get(doc, &stream.dict, b"SMask").and_then(|o| objects::stream(doc, o)) {
        Some(mask) => match decode_pixels(doc, mask) {
            Ok(mask) => {
                let mask = mask.to_luma8();
                Some(if mask.dimensions() == pixels.dimensions() {
                    mask
                } else {
                    imageops::resize(&mask, pixels.width(), pixels.height(), FilterType::Nearest)
                })
            }
            Err(err) => {
                warn!(image = name, error = %err, "soft mask dropped");
                dropped_mask = Some(err);
                None
            }
        },
        None => None,
    };

    debug!(
        width = pixels.width(),
        height = pixels.height(),
        soft_mask = soft_mask.is_some(),
        "image decoded"
    );
    Ok(DecodedImage {
        resource: ImageResource {
            name: name.to_string(),
            pixels,
            soft_mask,
        },
        dropped_mask,
    })
}

fn decode_pixels(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    if matches!(get(doc, dict, b"ImageMask"), Some(Object::Boolean(true))) {
        return Err(UnredactError::ImageError(
            "stencil masks are not supported".to_string(),
        ));
    }

    let filters = filters(doc, stream);
    match filters.last().map(String::as_str) {
        Some("DCTDecode") => {
            let bytes = if filters.len() == 1 {
                stream.content.clone()
            } else {
                stream.decompressed_content().map_err(|err| {
                    UnredactError::ImageError(format!("failed to unpack JPEG stream: {}", err))
                })?
            };
            return image::load_from_memory(&bytes)
                .map_err(|err| UnredactError::ImageError(format!("invalid JPEG data: {}", err)));
        }
        Some(other @ ("JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode")) => {
            return Err(UnredactError::ImageError(format!(
                "unsupported image filter {}",
                other
            )));
        }
        _ => {}
    }

    let width = get_number(doc, dict, b"Width").unwrap_or(0.0) as u32;
    let height = get_number(doc, dict, b"Height").unwrap_or(0.0) as u32;
    if width == 0 || height == 0 {
        return Err(UnredactError::ImageError("image has no size".to_string()));
    }
    let bits = get_number(doc, dict, b"BitsPerComponent").unwrap_or(8.0) as u32;
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(UnredactError::ImageError(format!(
            "unsupported bit depth {}",
            bits
        )));
    }
    let space = match dict.get(b"ColorSpace") {
        Ok(object) => color_space(doc, object)?,
        Err(_) => ColorSpace::Gray,
    };
    let inverted = decode_inverted(doc, dict);

    let data = objects::stream_bytes(stream)
        .ok_or_else(|| UnredactError::ImageError("image stream cannot be decompressed".to_string()))?;
    let samples = unpack_samples(&data, width, height, bits, space.components())?;
    let max = ((1u32 << bits.min(8)) - 1) as u8;

    let image = match &space {
        ColorSpace::Gray => {
            let gray = GrayImage::from_fn(width, height, |x, y| {
                let v = scale(samples[(y * width + x) as usize], max);
                Luma([if inverted { 255 - v } else { v }])
            });
            DynamicImage::ImageLuma8(gray)
        }
        ColorSpace::Rgb => DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let i = (y * width + x) as usize * 3;
            Rgb([
                scale(samples[i], max),
                scale(samples[i + 1], max),
                scale(samples[i + 2], max),
            ])
        })),
        ColorSpace::Cmyk => DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let i = (y * width + x) as usize * 4;
            let c = |k: usize| scale(samples[i + k], max) as f32 / 255.0;
            Rgb(Color::Cmyk(c(0), c(1), c(2), c(3)).to_rgb8())
        })),
        ColorSpace::Indexed(palette) => {
            DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                let index = samples[(y * width + x) as usize] as usize;
                Rgb(palette.get(index).copied().unwrap_or([0, 0, 0]))
            }))
        }
    };
    Ok(image)
}

fn filters(doc: &Document, stream: &Stream) -> Vec<String> {
    match get(doc, &stream.dict, b"Filter") {
        Some(Object::Name(n)) => vec![String::from_utf8_lossy(n).into_owned()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| name(resolve(doc, item)).map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// A `/Decode [1 0]` array on a single-component image inverts it.
fn decode_inverted(doc: &Document, dict: &lopdf::Dictionary) -> bool {
    let Some(Object::Array(items)) = get(doc, dict, b"Decode") else {
        return false;
    };
    match (items.first().and_then(number), items.get(1).and_then(number)) {
        (Some(lo), Some(hi)) => lo > hi,
        _ => false,
    }
}

fn color_space(doc: &Document, object: &Object) -> Result<ColorSpace> {
    let object = resolve(doc, object);
    if let Some(space) = name(object) {
        return named_space(space);
    }
    let items = match object {
        Object::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(UnredactError::ImageError(
                "malformed color space".to_string(),
            ));
        }
    };

    match name(resolve(doc, &items[0])) {
        Some("ICCBased") => {
            let n = items
                .get(1)
                .and_then(|o| objects::dict(doc, o))
                .and_then(|d| get_number(doc, d, b"N"))
                .unwrap_or(3.0) as usize;
            match n {
                1 => Ok(ColorSpace::Gray),
                4 => Ok(ColorSpace::Cmyk),
                _ => Ok(ColorSpace::Rgb),
            }
        }
        Some("CalRGB") | Some("Lab") => Ok(ColorSpace::Rgb),
        Some("CalGray") => Ok(ColorSpace::Gray),
        Some("Indexed") | Some("I") => indexed(doc, items),
        Some(other) => named_space(other),
        None => Err(UnredactError::ImageError(
            "malformed color space".to_string(),
        )),
    }
}

fn named_space(space: &str) -> Result<ColorSpace> {
    match space {
        "DeviceGray" | "G" | "CalGray" => Ok(ColorSpace::Gray),
        "DeviceRGB" | "RGB" | "CalRGB" => Ok(ColorSpace::Rgb),
        "DeviceCMYK" | "CMYK" => Ok(ColorSpace::Cmyk),
        other => Err(UnredactError::ImageError(format!(
            "unsupported color space {}",
            other
        ))),
    }
}

/// `[/Indexed base hival lookup]`.
fn indexed(doc: &Document, items: &[Object]) -> Result<ColorSpace> {
    let malformed = || UnredactError::ImageError("malformed indexed color space".to_string());
    let base = color_space(doc, items.get(1).ok_or_else(malformed)?)?;
    let hival = items.get(2).and_then(|o| number(resolve(doc, o))).ok_or_else(malformed)? as usize;
    let lookup = match items.get(3).map(|o| resolve(doc, o)) {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(stream)) => objects::stream_bytes(stream).ok_or_else(malformed)?,
        _ => return Err(malformed()),
    };

    let width = base.components();
    let palette = lookup
        .chunks(width)
        .take(hival + 1)
        .map(|entry| match (&base, entry) {
            (ColorSpace::Gray, [g]) => [*g, *g, *g],
            (ColorSpace::Rgb, [r, g, b]) => [*r, *g, *b],
            (ColorSpace::Cmyk, [c, m, y, k]) => Color::Cmyk(
                *c as f32 / 255.0,
                *m as f32 / 255.0,
                *y as f32 / 255.0,
                *k as f32 / 255.0,
            )
            .to_rgb8(),
            _ => [0, 0, 0],
        })
        .collect();
    Ok(ColorSpace::Indexed(palette))
}

/// Split packed rows into one sample per component. 16-bit samples keep
/// their high byte.
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    bits: u32,
    components: usize,
) -> Result<Vec<u8>> {
    let per_row = width as usize * components;
    let row_bytes = (per_row * bits as usize).div_ceil(8);
    let needed = row_bytes * height as usize;
    if data.len() < needed {
        return Err(UnredactError::ImageError(format!(
            "image data truncated: {} of {} bytes",
            data.len(),
            needed
        )));
    }

    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data.chunks(row_bytes).take(height as usize) {
        match bits {
            8 => samples.extend_from_slice(&row[..per_row]),
            16 => samples.extend(row.chunks(2).take(per_row).map(|pair| pair[0])),
            _ => {
                let mask = (1u8 << bits) - 1;
                for i in 0..per_row {
                    let bit = i * bits as usize;
                    let shift = 8 - bits as usize - (bit % 8);
                    samples.push((row[bit / 8] >> shift) & mask);
                }
            }
        }
    }
    Ok(samples)
}

/// Stretch a `max`-ranged sample to 0–255.
fn scale(sample: u8, max: u8) -> u8 {
    if max == 255 {
        sample
    } else {
        ((sample as u32 * 255) / max as u32) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn raw_image(dict: lopdf::Dictionary, data: Vec<u8>) -> (Document, Stream) {
        (Document::with_version("1.5"), Stream::new(dict, data))
    }

    #[test]
    fn eight_bit_rgb_decodes() {
        let (doc, stream) = raw_image(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 0, 255],
        );
        let resource = decode_image(&doc, &stream, "Im0").unwrap().resource;
        let rgb = resource.pixels.to_rgb8();
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([0, 0, 255]));
        assert!(resource.soft_mask.is_none());
    }

    #[test]
    fn one_bit_gray_unpacks_rows() {
        let (doc, stream) = raw_image(
            dictionary! {
                "Width" => 3,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
            },
            // Rows are padded to whole bytes: 101xxxxx, 010xxxxx.
            vec![0b1010_0000, 0b0100_0000],
        );
        let gray = decode_image(&doc, &stream, "Im1").unwrap().resource.pixels.to_luma8();
        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(1, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn indexed_palette_expands() {
        let (doc, stream) = raw_image(
            dictionary! {
                "Width" => 2,
                "Height" => 1,
                "BitsPerComponent" => 8,
                "ColorSpace" => vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    Object::Integer(1),
                    Object::String(vec![0, 0, 0, 10, 20, 30], lopdf::StringFormat::Hexadecimal),
                ],
            },
            vec![1, 0],
        );
        let rgb = decode_image(&doc, &stream, "Im2").unwrap().resource.pixels.to_rgb8();
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([10, 20, 30]));
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn truncated_data_is_an_error() {
        let (doc, stream) = raw_image(
            dictionary! {
                "Width" => 10,
                "Height" => 10,
                "ColorSpace" => "DeviceGray",
            },
            vec![0; 5],
        );
        assert!(matches!(
            decode_image(&doc, &stream, "Im3"),
            Err(UnredactError::ImageError(_))
        ));
    }

    #[test]
    fn soft_mask_is_decoded_and_resized() {
        let mut doc = Document::with_version("1.5");
        let mask = doc.add_object(Stream::new(
            dictionary! {
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![128],
        ));
        let stream = Stream::new(
            dictionary! {
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "SMask" => mask,
            },
            vec![0, 0, 0, 0],
        );
        let decoded = decode_image(&doc, &stream, "Im4").unwrap();
        assert!(decoded.dropped_mask.is_none());
        let soft_mask = decoded.resource.soft_mask.unwrap();
        assert_eq!(soft_mask.dimensions(), (2, 2));
        assert_eq!(soft_mask.get_pixel(1, 1).0[0], 128);
    }

    #[test]
    fn corrupt_soft_mask_is_dropped_not_fatal() {
        let mut doc = Document::with_version("1.5");
        let mask = doc.add_object(Stream::new(
            dictionary! {
                "Width" => 4,
                "Height" => 4,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![255],
        ));
        let stream = Stream::new(
            dictionary! {
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => mask,
            },
            vec![10, 20, 30, 40, 50, 60],
        );
        let decoded = decode_image(&doc, &stream, "Im5").unwrap();
        assert!(decoded.resource.soft_mask.is_none());
        assert!(matches!(decoded.dropped_mask, Some(UnredactError::ImageError(_))));
        assert_eq!(*decoded.resource.pixels.to_rgb8().get_pixel(1, 0), Rgb([40, 50, 60]));
    }
}
