// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Spoolwerk.
//
// These errors live *below* the `PrinterBackend` contract: native layers
// return them, and the backends fold them into the sentinel job id or an
// empty result before anything reaches the caller.

use thiserror::Error;

/// Top-level error type for native print-service operations.
#[derive(Debug, Error)]
pub enum SpoolwerkError {
    // -- CUPS scheduler --
    #[error("IPP request failed: {0}")]
    Ipp(String),

    #[error("PPD unavailable or malformed: {0}")]
    Ppd(String),

    // -- Windows spooler --
    #[error("spooler call {call} failed (error {code})")]
    Spooler { call: &'static str, code: u32 },

    // -- Input --
    #[error("invalid printer or document name: {0:?}")]
    InvalidName(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -- Submission --
    #[error("no printer given and no default printer configured")]
    NoDefaultPrinter,

    #[error("print failed")]
    PrintFailed,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpoolwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Every variant has a caller-facing message; the match keeps this list
    /// in step with the enum.
    fn sample(err: &SpoolwerkError) -> &'static str {
        match err {
            SpoolwerkError::Ipp(_) => "IPP request failed",
            SpoolwerkError::Ppd(_) => "PPD unavailable",
            SpoolwerkError::Spooler { .. } => "spooler call",
            SpoolwerkError::InvalidName(_) => "invalid printer",
            SpoolwerkError::Io(_) => "file I/O error",
            SpoolwerkError::NoDefaultPrinter => "no default printer",
            SpoolwerkError::PrintFailed => "print failed",
        }
    }

    #[test]
    fn messages_name_the_failure() {
        let errors = [
            SpoolwerkError::Ipp("client-error-not-found".into()),
            SpoolwerkError::Ppd("empty".into()),
            SpoolwerkError::Spooler { call: "StartDocPrinterW", code: 5 },
            SpoolwerkError::InvalidName("a/b".into()),
            SpoolwerkError::Io(std::io::Error::other("disk full")),
            SpoolwerkError::NoDefaultPrinter,
            SpoolwerkError::PrintFailed,
        ];
        for err in &errors {
            assert!(err.to_string().contains(sample(err)), "{err}");
        }
        assert_eq!(
            SpoolwerkError::Spooler { call: "StartDocPrinterW", code: 5 }.to_string(),
            "spooler call StartDocPrinterW failed (error 5)"
        );
    }
}
