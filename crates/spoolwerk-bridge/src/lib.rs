// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Spoolwerk printer backends.
//!
//! [`PrinterBackend`] is the one contract the host sees.  Two implementations
//! sit behind it: [`cups::CupsBackend`] for the Unix scheduler and
//! [`winspool::WinspoolBackend`] for the Windows spooler.  Both are written
//! against a narrow native seam (`CupsApi`, `Spooler`) so their mapping logic
//! builds and runs on every target.

pub mod cups;
pub mod traits;
pub mod winspool;

pub use traits::PrinterBackend;

#[cfg(not(any(unix, windows)))]
compile_error!("spoolwerk-bridge supports Unix (CUPS) and Windows (winspool) targets only");

/// The backend for the platform this binary was built for.
///
/// Selection happens at compile time; there is no runtime switching and no
/// way to drive both print services from one process.
pub fn platform_backend() -> Box<dyn PrinterBackend> {
    #[cfg(windows)]
    {
        // Windows: Win32 spooler through windows-sys.
        Box::new(winspool::WinspoolBackend::native())
    }
    #[cfg(unix)]
    {
        // Linux, macOS, BSD: the CUPS scheduler over IPP.
        Box::new(cups::CupsBackend::from_env())
    }
}
