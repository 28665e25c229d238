// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unix backend: the shared model over the CUPS scheduler.
//
// Rendered formats (PDF, JPEG, PostScript) are handed to the scheduler as a
// temporary file so its filter chain runs; everything else is streamed into
// a Create-Job as raw device data.  Driver options and paper size come from
// the destination's PPD, downloaded per call and deleted on return.

pub mod api;
pub mod ipp_client;
pub mod ppd;

use std::io::Write;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use spoolwerk_core::config::SpoolConfig;
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{
    DriverOptions, JobCommand, JobDescriptor, JobStatus, PRINT_FAILED, PrintFormat, PrintOptions,
    PrinterDescriptor,
};

use crate::traits::PrinterBackend;
use api::{CupsApi, CupsJob, CupsOption, FORMAT_RAW, IppJobState};
use ipp_client::IppCups;
use ppd::PpdFile;

const SUPPORTED_FORMATS: &[PrintFormat] = &[
    PrintFormat::Raw,
    PrintFormat::Text,
    PrintFormat::Pdf,
    PrintFormat::Jpeg,
    PrintFormat::PostScript,
    PrintFormat::Command,
    PrintFormat::Auto,
];

/// Backend over any [`CupsApi`]; [`IppCups`] in production.
pub struct CupsBackend<A: CupsApi = IppCups> {
    api: A,
    config: SpoolConfig,
}

impl CupsBackend<IppCups> {
    /// Talk to the scheduler the environment points at.
    pub fn from_env() -> Self {
        let config = SpoolConfig::from_env();
        Self::new(IppCups::new(config.clone()), config)
    }
}

impl<A: CupsApi> CupsBackend<A> {
    pub fn new(api: A, config: SpoolConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Download and parse the destination's PPD.  The download is removed
    /// when this returns, whether or not it parsed.
    fn load_ppd(&self, name: &str) -> Option<PpdFile> {
        let file = match self.api.get_ppd(name) {
            Ok(file) => file,
            Err(e) => {
                warn!(printer = %name, error = %e, "no PPD for destination");
                return None;
            }
        };
        match PpdFile::open(file.path()) {
            Ok(ppd) => Some(ppd),
            Err(e) => {
                warn!(printer = %name, error = %e, "PPD could not be parsed");
                None
            }
        }
    }

    /// Write `data` to a temp file and submit it through Print-Job.
    fn print_document_file(&self, name: &str, data: &[u8], options: &PrintOptions) -> Result<i32> {
        let mut file = tempfile::Builder::new()
            .prefix(&self.config.temp_prefix)
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;

        let options: Vec<CupsOption> = options
            .iter()
            .map(|(k, v)| CupsOption::new(k.as_str(), v.as_str()))
            .collect();
        debug!(path = %file.path().display(), bytes = data.len(), "document staged");
        self.api
            .print_file(name, file.path(), &self.config.job_title, &options)
    }

    /// Create-Job, one raw document, finish.  The job is cancelled if any
    /// stage after creation fails.
    fn stream_job(&self, name: &str, data: &[u8]) -> Result<i32> {
        let title = &self.config.job_title;
        let job_id = self.api.create_job(name, title)?;
        if job_id <= 0 {
            return Err(SpoolwerkError::Ipp(format!("Create-Job returned id {job_id}")));
        }
        let guard = OpenJob::new(&self.api, name, job_id);

        let mut document = self.api.start_document(name, job_id, title, FORMAT_RAW, true)?;
        self.api.write_request_data(&mut document, data)?;
        let status = self.api.finish_document(document)?;
        if !status.is_accepted() {
            return Err(SpoolwerkError::Ipp(format!(
                "Send-Document finished with status {:#06x}",
                status.0
            )));
        }

        guard.commit();
        Ok(job_id)
    }
}

/// A created job that is cancelled on drop unless committed.
struct OpenJob<'a, A: CupsApi> {
    api: &'a A,
    printer: &'a str,
    job_id: i32,
    committed: bool,
}

impl<'a, A: CupsApi> OpenJob<'a, A> {
    fn new(api: &'a A, printer: &'a str, job_id: i32) -> Self {
        Self {
            api,
            printer,
            job_id,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl<A: CupsApi> Drop for OpenJob<'_, A> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        warn!(printer = %self.printer, job_id = self.job_id, "submission failed, cancelling job");
        if let Err(e) = self.api.cancel_job(self.printer, self.job_id) {
            warn!(job_id = self.job_id, error = %e, "Cancel-Job after failed submission");
        }
    }
}

/// Single-element status for an IPP `job-state`.
pub fn map_job_state(state: i32) -> JobStatus {
    match IppJobState::from_i32(state) {
        Some(IppJobState::Pending) | None => JobStatus::Pending,
        Some(IppJobState::Held) => JobStatus::Paused,
        Some(IppJobState::Processing) => JobStatus::Printing,
        Some(IppJobState::Stopped) | Some(IppJobState::Aborted) => JobStatus::Aborted,
        Some(IppJobState::Canceled) => JobStatus::Cancelled,
        Some(IppJobState::Completed) => JobStatus::Printed,
    }
}

fn job_descriptor(printer: &str, job: CupsJob) -> JobDescriptor {
    JobDescriptor {
        id: job.id,
        name: job.title,
        printer_name: printer.to_string(),
        user: job.user,
        format: job.format,
        priority: job.priority,
        size: job.size,
        status: vec![map_job_state(job.state)],
        creation_time: job.creation_time,
        processing_time: job.processing_time,
        completed_time: job.completed_time,
    }
}

impl<A: CupsApi> PrinterBackend for CupsBackend<A> {
    fn backend_name(&self) -> &'static str {
        "cups"
    }

    #[instrument(skip(self))]
    fn list_printers(&self) -> Vec<PrinterDescriptor> {
        match self.api.get_dests() {
            Ok(dests) => dests
                .into_iter()
                .map(|d| PrinterDescriptor {
                    name: d.name,
                    is_default: d.is_default,
                    options: d.options,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "destination listing failed");
                Vec::new()
            }
        }
    }

    fn default_printer_name(&self) -> Option<String> {
        self.list_printers()
            .into_iter()
            .find(|p| p.is_default)
            .map(|p| p.name)
    }

    #[instrument(skip(self))]
    fn driver_options(&self, name: &str) -> DriverOptions {
        self.load_ppd(name)
            .map(|ppd| ppd.driver_options())
            .unwrap_or_default()
    }

    #[instrument(skip(self))]
    fn selected_paper_size(&self, name: &str) -> Option<String> {
        self.load_ppd(name)
            .and_then(|ppd| ppd.page_size())
    }

    #[instrument(skip(self, data, options), fields(bytes = data.len()))]
    fn print_bytes(&self, name: &str, data: &[u8], format: &str, options: &PrintOptions) -> i32 {
        let as_file = PrintFormat::parse(format).is_some_and(|f| f.needs_document_file());
        let result = if as_file {
            self.print_document_file(name, data, options)
        } else {
            self.stream_job(name, data)
        };

        match result {
            Ok(job_id) if job_id > 0 => {
                info!(job_id, as_file, "job submitted");
                job_id
            }
            Ok(job_id) => {
                warn!(job_id, "scheduler returned no job id");
                PRINT_FAILED
            }
            Err(e) => {
                warn!(error = %e, "print failed");
                PRINT_FAILED
            }
        }
    }

    #[instrument(skip(self))]
    fn print_file(&self, name: &str, path: &Path) -> i32 {
        match self.api.print_file(name, path, &self.config.job_title, &[]) {
            Ok(job_id) if job_id > 0 => {
                info!(job_id, "file submitted");
                job_id
            }
            Ok(_) => PRINT_FAILED,
            Err(e) => {
                warn!(error = %e, "print file failed");
                PRINT_FAILED
            }
        }
    }

    fn supported_formats(&self) -> &'static [PrintFormat] {
        SUPPORTED_FORMATS
    }

    fn supported_job_commands(&self) -> &'static [JobCommand] {
        &JobCommand::ALL
    }

    #[instrument(skip(self))]
    fn get_job(&self, name: &str, id: i32) -> JobDescriptor {
        let jobs = match self.api.get_jobs(name) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "job listing failed");
                return JobDescriptor::not_found(name, id);
            }
        };
        jobs.into_iter()
            .find(|j| j.id == id)
            .map(|j| job_descriptor(name, j))
            .unwrap_or_else(|| JobDescriptor::not_found(name, id))
    }

    #[instrument(skip(self))]
    fn set_job(&self, name: &str, id: i32, command: &str) {
        let Some(command) = JobCommand::parse(command) else {
            debug!("ignoring unrecognised job command");
            return;
        };
        let result = match command {
            JobCommand::Cancel => self.api.cancel_job(name, id),
            JobCommand::Pause => self.api.hold_job(name, id),
            JobCommand::Resume => self.api.release_job(name, id),
        };
        if let Err(e) = result {
            warn!(%command, error = %e, "job command not accepted");
        }
    }
}
