// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The slice of the CUPS client API the Unix backend is written against.
//
// The shapes here follow libcups (`cups_dest_t`, `cups_option_t`,
// `cups_job_t`, `cupsStartDocument`…) so the backend reads like a libcups
// program; `IppCups` provides them over IPP, and tests provide fakes.

use std::path::Path;

use tempfile::NamedTempFile;

use spoolwerk_core::error::Result;
use spoolwerk_core::types::PrinterOptions;

/// `CUPS_FORMAT_RAW`: bytes go to the device without filtering.
pub const FORMAT_RAW: &str = "application/vnd.cups-raw";

/// A destination as returned by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CupsDest {
    pub name: String,
    pub is_default: bool,
    pub options: PrinterOptions,
}

/// A `name=value` option record attached to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CupsOption {
    pub name: String,
    pub value: String,
}

impl CupsOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// IPP `job-state` values (RFC 8011 §5.3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IppJobState {
    Pending = 3,
    Held = 4,
    Processing = 5,
    Stopped = 6,
    Canceled = 7,
    Aborted = 8,
    Completed = 9,
}

impl IppJobState {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            3 => Some(Self::Pending),
            4 => Some(Self::Held),
            5 => Some(Self::Processing),
            6 => Some(Self::Stopped),
            7 => Some(Self::Canceled),
            8 => Some(Self::Aborted),
            9 => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A queued job.  `state` is the raw `job-state` so that values outside
/// [`IppJobState`] survive until the backend maps them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CupsJob {
    pub id: i32,
    pub title: String,
    pub user: String,
    pub format: String,
    pub priority: i32,
    /// Size in kilobytes (`job-k-octets`).
    pub size: i32,
    pub state: i32,
    pub creation_time: i64,
    pub processing_time: i64,
    pub completed_time: i64,
}

/// IPP status code of a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IppStatus(pub u16);

impl IppStatus {
    pub const OK: IppStatus = IppStatus(0x0000);
    pub const OK_CONFLICTING: IppStatus = IppStatus(0x0002);
    pub const NOT_FOUND: IppStatus = IppStatus(0x0406);
    pub const INTERNAL_ERROR: IppStatus = IppStatus(0x0500);

    /// Anything up to `successful-ok-conflicting-attributes` counts as
    /// accepted; warnings below that boundary do not fail a submission.
    pub fn is_accepted(&self) -> bool {
        self.0 <= Self::OK_CONFLICTING.0
    }
}

/// A document being streamed into an open job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub printer: String,
    pub job_id: i32,
    pub name: String,
    pub format: String,
    pub last: bool,
    pub data: Vec<u8>,
}

/// Native calls the Unix backend needs from the print service.
pub trait CupsApi: Send + Sync {
    /// All destinations (printers and classes), default flagged.
    fn get_dests(&self) -> Result<Vec<CupsDest>>;

    /// Download the destination's PPD.  The file is deleted when the
    /// returned handle drops.
    fn get_ppd(&self, printer: &str) -> Result<NamedTempFile>;

    /// Submit a whole file, letting the scheduler type and filter it.
    fn print_file(
        &self,
        printer: &str,
        path: &Path,
        title: &str,
        options: &[CupsOption],
    ) -> Result<i32>;

    /// Open an empty job and return its id.
    fn create_job(&self, printer: &str, title: &str) -> Result<i32>;

    /// Begin a document inside an open job.
    fn start_document(
        &self,
        printer: &str,
        job_id: i32,
        name: &str,
        format: &str,
        last: bool,
    ) -> Result<DocumentRequest> {
        Ok(DocumentRequest {
            printer: printer.to_string(),
            job_id,
            name: name.to_string(),
            format: format.to_string(),
            last,
            data: Vec::new(),
        })
    }

    /// Append document bytes.
    fn write_request_data(&self, document: &mut DocumentRequest, data: &[u8]) -> Result<()> {
        document.data.extend_from_slice(data);
        Ok(())
    }

    /// Close the document and report the scheduler's verdict.
    fn finish_document(&self, document: DocumentRequest) -> Result<IppStatus>;

    fn cancel_job(&self, printer: &str, job_id: i32) -> Result<()>;

    fn hold_job(&self, printer: &str, job_id: i32) -> Result<()>;

    fn release_job(&self, printer: &str, job_id: i32) -> Result<()>;

    /// Every job on the destination, completed ones included.
    fn get_jobs(&self, printer: &str) -> Result<Vec<CupsJob>>;
}
