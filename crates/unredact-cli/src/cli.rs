// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::path::PathBuf;

use clap::Parser;

/// Remove overlay redactions from a PDF and write `<name>-unredacted.pdf`
/// beside it.
#[derive(Debug, Parser)]
#[command(name = "unredact", about, version)]
pub struct Cli {
    /// Path to the PDF file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn takes_exactly_one_path() {
        let cli = Cli::try_parse_from(["unredact", "memo.pdf"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("memo.pdf"));

        assert!(Cli::try_parse_from(["unredact"]).is_err());
        assert!(Cli::try_parse_from(["unredact", "a.pdf", "b.pdf"]).is_err());
        assert!(Cli::try_parse_from(["unredact", "--pages", "1", "a.pdf"]).is_err());
    }
}
