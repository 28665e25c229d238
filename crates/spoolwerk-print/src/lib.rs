// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolwerk Print: the surface a host binding calls.
//
// Wraps one `PrinterBackend` with the host conventions: optional printer
// names resolve to the default at call time, formats and commands travel as
// strings, and long submissions run on Tokio's blocking pool with optional
// success/error callbacks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use spoolwerk_bridge::{PrinterBackend, platform_backend};
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{
    DriverOptions, JobDescriptor, PRINT_FAILED, PrintFormat, PrintOptions, PrinterDescriptor,
};

/// Format assumed when the host passes none.
pub const DEFAULT_FORMAT: &str = "RAW";

pub type SuccessCallback = Box<dyn FnOnce(i32) + Send + 'static>;
pub type ErrorCallback = Box<dyn FnOnce(SpoolwerkError) + Send + 'static>;

/// Completion hooks for a background submission.  Either may be absent.
#[derive(Default)]
pub struct PrintCallbacks {
    pub on_success: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl PrintCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, callback: impl FnOnce(i32) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(SpoolwerkError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    fn finish(self, outcome: Result<i32>) {
        match outcome {
            Ok(job_id) => {
                if let Some(callback) = self.on_success {
                    callback(job_id);
                }
            }
            Err(e) => {
                if let Some(callback) = self.on_error {
                    callback(e);
                }
            }
        }
    }
}

/// The print facade.  Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct Spool {
    backend: Arc<dyn PrinterBackend>,
}

impl Spool {
    /// Facade over the backend for the build target.
    pub fn platform() -> Self {
        Self::with_backend(Arc::from(platform_backend()))
    }

    pub fn with_backend(backend: Arc<dyn PrinterBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn PrinterBackend {
        self.backend.as_ref()
    }

    pub fn list_printers(&self) -> Vec<PrinterDescriptor> {
        self.backend.list_printers()
    }

    pub fn get_printer(&self, name: &str) -> PrinterDescriptor {
        self.backend.get_printer(name)
    }

    pub fn default_printer_name(&self) -> Option<String> {
        self.backend.default_printer_name()
    }

    pub fn driver_options(&self, name: &str) -> DriverOptions {
        self.backend.driver_options(name)
    }

    /// Empty string when the size cannot be determined.
    pub fn selected_paper_size(&self, name: &str) -> String {
        self.backend.selected_paper_size(name).unwrap_or_default()
    }

    /// The named printer, passed through unchanged, or the current default
    /// when `name` is absent or blank.
    pub fn resolve_printer(&self, name: Option<&str>) -> Option<String> {
        match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => Some(name.to_string()),
            None => self.backend.default_printer_name(),
        }
    }

    #[instrument(skip(self, data, options), fields(bytes = data.len()))]
    pub fn print_bytes(
        &self,
        name: Option<&str>,
        data: &[u8],
        format: Option<&str>,
        options: &PrintOptions,
    ) -> i32 {
        let Some(printer) = self.resolve_printer(name) else {
            warn!("no printer given and no default configured");
            return PRINT_FAILED;
        };
        let format = format.map(str::trim).filter(|f| !f.is_empty()).unwrap_or(DEFAULT_FORMAT);
        self.backend.print_bytes(&printer, data, format, options)
    }

    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn print_file(&self, name: Option<&str>, path: impl AsRef<Path>) -> i32 {
        let Some(printer) = self.resolve_printer(name) else {
            warn!("no printer given and no default configured");
            return PRINT_FAILED;
        };
        self.backend.print_file(&printer, path.as_ref())
    }

    pub fn supported_formats(&self) -> Vec<String> {
        self.backend
            .supported_formats()
            .iter()
            .map(PrintFormat::to_string)
            .collect()
    }

    pub fn supported_job_commands(&self) -> Vec<String> {
        self.backend
            .supported_job_commands()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn get_job(&self, printer: &str, id: i32) -> JobDescriptor {
        let job = self.backend.get_job(printer, id);
        if !job.is_found() {
            debug!(printer, job_id = id, "job not queued");
        }
        job
    }

    pub fn set_job(&self, printer: &str, id: i32, command: &str) {
        self.backend.set_job(printer, id, command)
    }

    /// Submit `data` on the blocking pool and report through `callbacks`.
    ///
    /// Must be called inside a Tokio runtime.  The returned handle resolves
    /// after the callback has run.
    pub fn print_bytes_in_background(
        &self,
        name: Option<String>,
        data: Vec<u8>,
        format: Option<String>,
        options: PrintOptions,
        callbacks: PrintCallbacks,
    ) -> JoinHandle<()> {
        let spool = self.clone();
        Self::dispatch(
            move || {
                let printer = spool
                    .resolve_printer(name.as_deref())
                    .ok_or(SpoolwerkError::NoDefaultPrinter)?;
                let format = format
                    .as_deref()
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .unwrap_or(DEFAULT_FORMAT);
                Ok(spool.backend.print_bytes(&printer, &data, format, &options))
            },
            callbacks,
        )
    }

    /// Submit a file on the blocking pool and report through `callbacks`.
    pub fn print_file_in_background(
        &self,
        name: Option<String>,
        path: PathBuf,
        callbacks: PrintCallbacks,
    ) -> JoinHandle<()> {
        let spool = self.clone();
        Self::dispatch(
            move || {
                let printer = spool
                    .resolve_printer(name.as_deref())
                    .ok_or(SpoolwerkError::NoDefaultPrinter)?;
                Ok(spool.backend.print_file(&printer, &path))
            },
            callbacks,
        )
    }

    fn dispatch<F>(work: F, callbacks: PrintCallbacks) -> JoinHandle<()>
    where
        F: FnOnce() -> Result<i32> + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = match tokio::task::spawn_blocking(work).await {
                Ok(Ok(job_id)) if job_id > 0 => {
                    info!(job_id, "background print submitted");
                    Ok(job_id)
                }
                Ok(Ok(job_id)) => {
                    debug!(job_id, "background print returned no job");
                    Err(SpoolwerkError::PrintFailed)
                }
                Ok(Err(e)) => Err(e),
                Err(e) => {
                    error!(error = %e, "print worker did not complete");
                    Err(SpoolwerkError::PrintFailed)
                }
            };
            callbacks.finish(outcome);
        })
    }
}
