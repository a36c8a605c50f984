// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for unredact. Only document-fatal conditions are errors;
// page-local problems are reported as `diagnostics::Warning`s instead.

use thiserror::Error;

/// Top-level error type for all unredact operations.
#[derive(Debug, Error)]
pub enum UnredactError {
    // -- Input errors --
    #[error("malformed PDF: {0}")]
    MalformedPdf(String),

    #[error("document is encrypted and no credentials were provided")]
    Encrypted,

    #[error("document has no pages")]
    NoPages,

    #[error("invalid input path: {0}")]
    InvalidPath(String),

    // -- Output errors --
    #[error("PDF output failed: {0}")]
    Output(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / serialisation --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, UnredactError>;
