// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decoding PDF image XObjects into `image` buffers.

pub mod decode;

pub use decode::{DecodedImage, decode_image};
