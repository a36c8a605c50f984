// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Terminal text for a finished run or a fatal error.

use unredact_core::Report;
use unredact_core::UnredactError;
use unredact_core::human_errors::{Severity, humanize_error};

/// One line: pages, occluders removed, ops revealed, warning count.
pub fn summary_line(report: &Report) -> String {
    format!(
        "{} {}, {} {} removed, {} {} revealed, {} {}",
        report.pages.len(),
        plural(report.pages.len(), "page", "pages"),
        report.occluders_removed(),
        plural(report.occluders_removed(), "occluder", "occluders"),
        report.ops_revealed(),
        plural(report.ops_revealed(), "op", "ops"),
        report.warnings.len(),
        plural(report.warnings.len(), "warning", "warnings"),
    )
}

/// One line per non-fatal warning.
pub fn warning_lines(report: &Report) -> Vec<String> {
    report.warnings.iter().map(|w| format!("warning: {}", w)).collect()
}

/// Message and suggestion for a fatal error.
pub fn error_lines(err: &UnredactError) -> Vec<String> {
    let human = humanize_error(err);
    let prefix = match human.severity {
        Severity::ActionRequired => "error",
        Severity::Permanent => "error (cannot be processed)",
    };
    vec![
        format!("{}: {}", prefix, human.message),
        format!("  {}", human.suggestion),
    ]
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
