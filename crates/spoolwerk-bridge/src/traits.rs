// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The operation set every platform backend implements.
//
// Methods never fail: native faults degrade to `PRINT_FAILED`, an empty
// collection, `None`, or a not-found descriptor, and are logged by the
// backend that swallowed them.

use std::path::Path;

use spoolwerk_core::types::{
    DriverOptions, JobCommand, JobDescriptor, PrintFormat, PrintOptions, PrinterDescriptor,
};

/// One native print service seen through the shared printer/job model.
pub trait PrinterBackend: Send + Sync {
    /// Short name of the native service ("cups", "winspool").
    fn backend_name(&self) -> &'static str;

    /// Every printer the service knows, local and connected.  An empty list
    /// is the answer to "no printers", not a failure.
    fn list_printers(&self) -> Vec<PrinterDescriptor>;

    /// Exact-name lookup in [`PrinterBackend::list_printers`].
    fn get_printer(&self, name: &str) -> PrinterDescriptor {
        self.list_printers()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| PrinterDescriptor::not_found(name))
    }

    fn default_printer_name(&self) -> Option<String>;

    /// Choice groups of the printer's driver with their defaults flagged.
    /// Empty when the driver cannot be introspected.
    fn driver_options(&self, name: &str) -> DriverOptions;

    /// Named paper size, or a numeric code as a string when only that is
    /// known.
    fn selected_paper_size(&self, name: &str) -> Option<String>;

    /// Submit `data`.  `format` is a format tag; anything outside the
    /// taxonomy is treated like `RAW`.  Returns the job id, or
    /// [`PRINT_FAILED`](spoolwerk_core::types::PRINT_FAILED).
    fn print_bytes(&self, name: &str, data: &[u8], format: &str, options: &PrintOptions) -> i32;

    /// Submit a file by path.  Same return contract as `print_bytes`.
    fn print_file(&self, name: &str, path: &Path) -> i32;

    fn supported_formats(&self) -> &'static [PrintFormat];

    fn supported_job_commands(&self) -> &'static [JobCommand];

    /// The queued job with `id`, or [`JobDescriptor::not_found`].
    fn get_job(&self, name: &str, id: i32) -> JobDescriptor;

    /// Issue a job-control command.  Unrecognised commands are ignored, and
    /// the native verdict is not reported.
    fn set_job(&self, name: &str, id: i32, command: &str);
}
