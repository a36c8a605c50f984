// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every fatal error is mapped to plain English with a clear suggestion.

use crate::error::UnredactError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// User must do something (fix the path, supply a decrypted copy).
    ActionRequired,
    /// The input cannot be processed as-is.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert an `UnredactError` into a `HumanError`.
pub fn humanize_error(err: &UnredactError) -> HumanError {
    match err {
        UnredactError::MalformedPdf(detail) => HumanError {
            message: "This file could not be read as a PDF.".into(),
            suggestion: format!(
                "Check that the file is a complete PDF; re-download it if it was truncated. ({detail})"
            ),
            severity: Severity::Permanent,
        },

        UnredactError::Encrypted => HumanError {
            message: "This PDF is encrypted.".into(),
            suggestion: "Open it in a PDF viewer with the password and save an unencrypted copy, then run unredact on that copy.".into(),
            severity: Severity::ActionRequired,
        },

        UnredactError::NoPages => HumanError {
            message: "This PDF has no pages.".into(),
            suggestion: "There is nothing to unredact in this file.".into(),
            severity: Severity::Permanent,
        },

        UnredactError::InvalidPath(detail) => HumanError {
            message: "The input path is not usable.".into(),
            suggestion: format!("Pass the path of an existing .pdf file. ({detail})"),
            severity: Severity::ActionRequired,
        },

        UnredactError::Output(detail) => HumanError {
            message: "The unredacted PDF could not be written.".into(),
            suggestion: format!("Check that the output folder is writable and has free space. ({detail})"),
            severity: Severity::ActionRequired,
        },

        UnredactError::ImageError(detail) => HumanError {
            message: "An image in the document could not be processed.".into(),
            suggestion: format!("The rest of the document may still be usable. ({detail})"),
            severity: Severity::Permanent,
        },

        UnredactError::Config(detail) => HumanError {
            message: "The configuration is invalid.".into(),
            suggestion: format!("Fix the configuration value and try again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        UnredactError::Io(io_err) => {
            let kind = io_err.kind();
            match kind {
                std::io::ErrorKind::NotFound => HumanError {
                    message: "The file could not be found.".into(),
                    suggestion: "Check the spelling of the path and try again.".into(),
                    severity: Severity::ActionRequired,
                },
                std::io::ErrorKind::PermissionDenied => HumanError {
                    message: "Permission denied.".into(),
                    suggestion: "Make sure you can read the input file and write to its folder.".into(),
                    severity: Severity::ActionRequired,
                },
                _ => HumanError {
                    message: "A file error occurred.".into(),
                    suggestion: format!("Try again. ({io_err})"),
                    severity: Severity::ActionRequired,
                },
            }
        }

        UnredactError::Serialization(detail) => HumanError {
            message: "Data could not be read or written.".into(),
            suggestion: format!("This is probably a bug. ({detail})"),
            severity: Severity::Permanent,
        },
    }
}
