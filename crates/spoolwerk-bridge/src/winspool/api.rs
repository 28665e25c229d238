// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The slice of the Win32 spooler API the Windows backend is written against.

use spoolwerk_core::error::Result;
use spoolwerk_core::types::JobCommand;

/// `JOB_STATUS_*` bits of `JOB_INFO_2W::Status`.
pub mod job_status {
    pub const PAUSED: u32 = 0x0000_0001;
    pub const ERROR: u32 = 0x0000_0002;
    pub const DELETING: u32 = 0x0000_0004;
    pub const SPOOLING: u32 = 0x0000_0008;
    pub const PRINTING: u32 = 0x0000_0010;
    pub const OFFLINE: u32 = 0x0000_0020;
    pub const PAPEROUT: u32 = 0x0000_0040;
    pub const PRINTED: u32 = 0x0000_0080;
    pub const DELETED: u32 = 0x0000_0100;
}

/// The fields of `PRINTER_INFO_2W` the backend reads.  Null strings arrive
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrinterInfo {
    pub name: String,
    pub location: String,
    pub comment: String,
    pub driver: String,
    pub port: String,
}

/// Paper fields of the printer's `DEVMODEW`, present only when the
/// matching `dmFields` bit is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevModeInfo {
    pub form_name: Option<String>,
    pub paper_size: Option<i16>,
}

/// `SYSTEMTIME`, always UTC for spooler timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemTime {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

/// The fields of `JOB_INFO_2W` the backend reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobInfo {
    pub document: String,
    pub user: String,
    pub priority: u32,
    pub size: u32,
    pub status: u32,
    pub submitted: SystemTime,
}

/// Process-wide spooler calls.
pub trait Spooler: Send + Sync {
    type Printer: SpoolerPrinter;

    /// `EnumPrintersW(PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS, level 2)`.
    fn enum_printers(&self) -> Result<Vec<PrinterInfo>>;

    fn default_printer(&self) -> Result<Option<String>>;

    /// `OpenPrinterW`.  The handle closes when the returned value drops.
    fn open_printer(&self, name: &str) -> Result<Self::Printer>;
}

/// Calls made on an open printer handle.
pub trait SpoolerPrinter {
    /// `StartDocPrinterW`, returning the spooler job id.
    fn start_doc(&mut self, doc_name: &str, datatype: &str) -> Result<u32>;

    fn end_doc(&mut self) -> Result<()>;

    fn start_page(&mut self) -> Result<()>;

    fn end_page(&mut self) -> Result<()>;

    /// `WritePrinter`, returning the byte count the spooler took.
    fn write(&mut self, data: &[u8]) -> Result<u32>;

    /// The printer's current settings via `DocumentPropertiesW`.
    fn document_properties(&mut self) -> Result<DevModeInfo>;

    /// `GetJobW` level 2; `None` when the queue has no such job.
    fn job(&mut self, job_id: u32) -> Result<Option<JobInfo>>;

    /// `SetJobW` with a `JOB_CONTROL_*` command.
    fn control_job(&mut self, job_id: u32, command: JobCommand) -> Result<()>;
}
