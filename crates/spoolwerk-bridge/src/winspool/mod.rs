// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Windows backend: the shared model over the print spooler.
//
// Every submission is one RAW document of one page; the spooler does no
// conversion, so only formats the device understands natively are
// advertised.  Driver options are not enumerated on this platform.

pub mod api;
#[cfg(windows)]
pub mod native;

use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use spoolwerk_core::config::SpoolConfig;
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{
    DriverOptions, JobCommand, JobDescriptor, JobStatus, PRINT_FAILED, PrintFormat, PrintOptions,
    PrinterDescriptor, PrinterOptions,
};

use crate::traits::PrinterBackend;
use api::{JobInfo, PrinterInfo, Spooler, SpoolerPrinter, SystemTime, job_status};

/// Spool datatype for every document: bytes pass to the port unchanged.
pub const DATATYPE_RAW: &str = "RAW";

const SUPPORTED_FORMATS: &[PrintFormat] = &[PrintFormat::Raw, PrintFormat::Text, PrintFormat::Command];

/// Status bit to tag, in reporting order.
const STATUS_TABLE: &[(u32, JobStatus)] = &[
    (job_status::PAUSED, JobStatus::Paused),
    (job_status::PRINTING, JobStatus::Printing),
    (job_status::SPOOLING, JobStatus::Pending),
    (job_status::DELETING, JobStatus::Cancelled),
    (job_status::DELETED, JobStatus::Cancelled),
    (job_status::ERROR, JobStatus::Aborted),
    (job_status::OFFLINE, JobStatus::Pending),
    (job_status::PAPEROUT, JobStatus::Pending),
    (job_status::PRINTED, JobStatus::Printed),
];

/// Expand a `JOB_STATUS_*` mask into tags; `[PENDING]` when no known bit
/// is set.
pub fn map_job_status(bits: u32) -> Vec<JobStatus> {
    let mut out: Vec<JobStatus> = STATUS_TABLE
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, status)| *status)
        .collect();
    if out.is_empty() {
        out.push(JobStatus::Pending);
    }
    out
}

/// Seconds since the Unix epoch; `0` for invalid or pre-1970 times.
pub fn system_time_to_epoch(st: &SystemTime) -> i64 {
    NaiveDate::from_ymd_opt(i32::from(st.year), u32::from(st.month), u32::from(st.day))
        .and_then(|date| {
            date.and_hms_milli_opt(
                u32::from(st.hour),
                u32::from(st.minute),
                u32::from(st.second),
                u32::from(st.milliseconds),
            )
        })
        .map(|dt| dt.and_utc().timestamp())
        .filter(|secs| *secs >= 0)
        .unwrap_or(0)
}

fn printer_descriptor(info: PrinterInfo, default: Option<&str>) -> PrinterDescriptor {
    let mut options = PrinterOptions::new();
    for (key, value) in [
        ("location", info.location),
        ("comment", info.comment),
        ("driver", info.driver),
        ("port", info.port),
    ] {
        if !value.is_empty() {
            options.insert(key.to_string(), value);
        }
    }
    PrinterDescriptor {
        is_default: default.is_some_and(|d| !d.is_empty() && d == info.name),
        name: info.name,
        options,
    }
}

fn job_descriptor(printer: &str, id: i32, job: JobInfo) -> JobDescriptor {
    let created = system_time_to_epoch(&job.submitted);
    JobDescriptor {
        id,
        name: job.document,
        printer_name: printer.to_string(),
        user: job.user,
        format: DATATYPE_RAW.to_string(),
        priority: i32::try_from(job.priority).unwrap_or(i32::MAX),
        size: i32::try_from(job.size).unwrap_or(i32::MAX),
        status: map_job_status(job.status),
        creation_time: created,
        processing_time: created,
        completed_time: 0,
    }
}

/// A started document; `EndDocPrinter` runs on drop.
struct DocScope<'a, P: SpoolerPrinter> {
    printer: &'a mut P,
}

impl<'a, P: SpoolerPrinter> DocScope<'a, P> {
    fn start(printer: &'a mut P, doc_name: &str) -> Result<(Self, u32)> {
        let job_id = printer.start_doc(doc_name, DATATYPE_RAW)?;
        Ok((Self { printer }, job_id))
    }

    fn start_page(&mut self) -> Result<PageScope<'_, P>> {
        self.printer.start_page()?;
        Ok(PageScope {
            printer: &mut *self.printer,
        })
    }
}

impl<P: SpoolerPrinter> Drop for DocScope<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.printer.end_doc() {
            warn!(error = %e, "EndDocPrinter");
        }
    }
}

/// A started page; `EndPagePrinter` runs on drop.
struct PageScope<'a, P: SpoolerPrinter> {
    printer: &'a mut P,
}

impl<P: SpoolerPrinter> PageScope<'_, P> {
    fn write(&mut self, data: &[u8]) -> Result<u32> {
        self.printer.write(data)
    }
}

impl<P: SpoolerPrinter> Drop for PageScope<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.printer.end_page() {
            warn!(error = %e, "EndPagePrinter");
        }
    }
}

/// Backend over any [`Spooler`]; the Win32 spooler in production.
pub struct WinspoolBackend<S: Spooler> {
    spooler: S,
    config: SpoolConfig,
}

impl<S: Spooler> WinspoolBackend<S> {
    pub fn new(spooler: S, config: SpoolConfig) -> Self {
        Self { spooler, config }
    }

    pub fn spooler(&self) -> &S {
        &self.spooler
    }

    /// Open, one document, one page, one write.  Page, document and
    /// handle are released in that order on every path.
    fn submit_raw(&self, name: &str, data: &[u8]) -> Result<u32> {
        let mut printer = self.spooler.open_printer(name)?;
        let (mut doc, job_id) = DocScope::start(&mut printer, &self.config.job_title)?;
        let written = {
            let mut page = doc.start_page()?;
            page.write(data)?
        };
        drop(doc);

        if usize::try_from(written).ok() != Some(data.len()) {
            warn!(written, expected = data.len(), "short write to spooler");
            return Err(SpoolwerkError::PrintFailed);
        }
        Ok(job_id)
    }
}

#[cfg(windows)]
impl WinspoolBackend<native::NativeSpooler> {
    pub fn native() -> Self {
        Self::new(native::NativeSpooler, SpoolConfig::from_env())
    }
}

impl<S: Spooler> PrinterBackend for WinspoolBackend<S> {
    fn backend_name(&self) -> &'static str {
        "winspool"
    }

    #[instrument(skip(self))]
    fn list_printers(&self) -> Vec<PrinterDescriptor> {
        let printers = match self.spooler.enum_printers() {
            Ok(printers) => printers,
            Err(e) => {
                warn!(error = %e, "printer enumeration failed");
                return Vec::new();
            }
        };
        let default = self.default_printer_name();
        printers
            .into_iter()
            .map(|info| printer_descriptor(info, default.as_deref()))
            .collect()
    }

    fn default_printer_name(&self) -> Option<String> {
        match self.spooler.default_printer() {
            Ok(name) => name.filter(|n| !n.is_empty()),
            Err(e) => {
                debug!(error = %e, "no default printer");
                None
            }
        }
    }

    fn driver_options(&self, name: &str) -> DriverOptions {
        debug!(printer = %name, "driver option enumeration not available on winspool");
        DriverOptions::new()
    }

    #[instrument(skip(self))]
    fn selected_paper_size(&self, name: &str) -> Option<String> {
        let devmode = self
            .spooler
            .open_printer(name)
            .and_then(|mut printer| printer.document_properties());
        match devmode {
            Ok(devmode) => devmode
                .form_name
                .filter(|form| !form.is_empty())
                .or_else(|| devmode.paper_size.map(|code| code.to_string())),
            Err(e) => {
                warn!(error = %e, "printer settings unavailable");
                None
            }
        }
    }

    #[instrument(skip(self, data, _options), fields(bytes = data.len()))]
    fn print_bytes(&self, name: &str, data: &[u8], format: &str, _options: &PrintOptions) -> i32 {
        debug!(format, datatype = DATATYPE_RAW, "spooling document");
        match self.submit_raw(name, data).map(i32::try_from) {
            Ok(Ok(job_id)) if job_id > 0 => {
                info!(job_id, "job submitted");
                job_id
            }
            Ok(_) => {
                warn!("spooler returned an unusable job id");
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
        match std::fs::read(path) {
            Ok(data) => self.print_bytes(name, &data, DATATYPE_RAW, &PrintOptions::new()),
            Err(e) => {
                warn!(error = %e, "cannot read file to print");
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
        let Ok(native_id) = u32::try_from(id) else {
            return JobDescriptor::not_found(name, id);
        };
        let job = self
            .spooler
            .open_printer(name)
            .and_then(|mut printer| printer.job(native_id));
        match job {
            Ok(Some(job)) => job_descriptor(name, id, job),
            Ok(None) => JobDescriptor::not_found(name, id),
            Err(e) => {
                warn!(error = %e, "job query failed");
                JobDescriptor::not_found(name, id)
            }
        }
    }

    #[instrument(skip(self))]
    fn set_job(&self, name: &str, id: i32, command: &str) {
        let Some(command) = JobCommand::parse_strict(command) else {
            debug!("ignoring unrecognised job command");
            return;
        };
        let Ok(native_id) = u32::try_from(id) else {
            return;
        };
        let result = self
            .spooler
            .open_printer(name)
            .and_then(|mut printer| printer.control_job(native_id, command));
        if let Err(e) = result {
            warn!(%command, error = %e, "job command not accepted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::api::DevModeInfo;
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Default)]
    struct FakeSpooler {
        printers: Vec<PrinterInfo>,
        default: Option<String>,
        devmode: DevModeInfo,
        jobs: HashMap<u32, JobInfo>,
        fail_start_page: bool,
        short_write: bool,
        log: Log,
    }

    struct FakePrinter {
        name: String,
        spooler: FakeSpooler,
    }

    impl FakeSpooler {
        fn office() -> Self {
            let mut jobs = HashMap::new();
            jobs.insert(
                12,
                JobInfo {
                    document: "Quarterly report".into(),
                    user: "frontdesk".into(),
                    priority: 1,
                    size: 2048,
                    status: job_status::PAUSED | job_status::PRINTING,
                    submitted: SystemTime {
                        year: 2023,
                        month: 11,
                        day: 14,
                        hour: 22,
                        minute: 13,
                        second: 20,
                        milliseconds: 0,
                    },
                },
            );
            Self {
                printers: vec![
                    PrinterInfo {
                        name: "Office-LaserJet".into(),
                        location: "2nd floor".into(),
                        driver: "HP Universal Printing PCL 6".into(),
                        port: "IP_10.0.0.20".into(),
                        ..PrinterInfo::default()
                    },
                    PrinterInfo {
                        name: "Microsoft Print to PDF".into(),
                        comment: "".into(),
                        port: "PORTPROMPT:".into(),
                        ..PrinterInfo::default()
                    },
                ],
                default: Some("Office-LaserJet".into()),
                devmode: DevModeInfo {
                    form_name: Some("A4".into()),
                    paper_size: Some(9),
                },
                jobs,
                ..Self::default()
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().expect("log lock").clone()
        }

        fn push(&self, entry: impl Into<String>) {
            self.log.lock().expect("log lock").push(entry.into());
        }
    }

    impl Spooler for FakeSpooler {
        type Printer = FakePrinter;

        fn enum_printers(&self) -> Result<Vec<PrinterInfo>> {
            Ok(self.printers.clone())
        }

        fn default_printer(&self) -> Result<Option<String>> {
            Ok(self.default.clone())
        }

        fn open_printer(&self, name: &str) -> Result<FakePrinter> {
            if !self.printers.iter().any(|p| p.name == name) {
                return Err(SpoolwerkError::Spooler {
                    call: "OpenPrinterW",
                    code: 1801,
                });
            }
            self.push(format!("open {name}"));
            Ok(FakePrinter {
                name: name.to_string(),
                spooler: self.clone(),
            })
        }
    }

    impl SpoolerPrinter for FakePrinter {
        fn start_doc(&mut self, doc_name: &str, datatype: &str) -> Result<u32> {
            self.spooler.push(format!("start_doc {doc_name} {datatype}"));
            Ok(12)
        }

        fn end_doc(&mut self) -> Result<()> {
            self.spooler.push("end_doc");
            Ok(())
        }

        fn start_page(&mut self) -> Result<()> {
            if self.spooler.fail_start_page {
                return Err(SpoolwerkError::Spooler {
                    call: "StartPagePrinter",
                    code: 5,
                });
            }
            self.spooler.push("start_page");
            Ok(())
        }

        fn end_page(&mut self) -> Result<()> {
            self.spooler.push("end_page");
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> Result<u32> {
            self.spooler.push(format!("write {}", data.len()));
            let len = data.len() as u32;
            Ok(if self.spooler.short_write { len.saturating_sub(1) } else { len })
        }

        fn document_properties(&mut self) -> Result<DevModeInfo> {
            Ok(self.spooler.devmode.clone())
        }

        fn job(&mut self, job_id: u32) -> Result<Option<JobInfo>> {
            Ok(self.spooler.jobs.get(&job_id).cloned())
        }

        fn control_job(&mut self, job_id: u32, command: JobCommand) -> Result<()> {
            self.spooler.push(format!("control {job_id} {command}"));
            Ok(())
        }
    }

    impl Drop for FakePrinter {
        fn drop(&mut self) {
            self.spooler.push(format!("close {}", self.name));
        }
    }

    fn backend(spooler: FakeSpooler) -> WinspoolBackend<FakeSpooler> {
        WinspoolBackend::new(spooler, SpoolConfig::default())
    }

    #[test]
    fn status_bits_expand_in_table_order() {
        assert_eq!(
            map_job_status(job_status::PRINTED | job_status::PAUSED | job_status::ERROR),
            vec![JobStatus::Paused, JobStatus::Aborted, JobStatus::Printed]
        );
        assert_eq!(
            map_job_status(job_status::DELETING | job_status::DELETED),
            vec![JobStatus::Cancelled, JobStatus::Cancelled]
        );
        assert_eq!(
            map_job_status(job_status::OFFLINE | job_status::PAPEROUT | job_status::SPOOLING),
            vec![JobStatus::Pending, JobStatus::Pending, JobStatus::Pending]
        );
    }

    #[test]
    fn no_known_bits_means_pending() {
        assert_eq!(map_job_status(0), vec![JobStatus::Pending]);
        // JOB_STATUS_BLOCKED_DEVQ and friends are outside the table.
        assert_eq!(map_job_status(0x0000_0200 | 0x0000_1000), vec![JobStatus::Pending]);
    }

    #[test]
    fn system_time_converts_to_epoch() {
        let st = SystemTime {
            year: 2023,
            month: 11,
            day: 14,
            hour: 22,
            minute: 13,
            second: 20,
            milliseconds: 999,
        };
        assert_eq!(system_time_to_epoch(&st), 1_700_000_000);

        let before_epoch = SystemTime {
            year: 1601,
            month: 1,
            day: 1,
            ..SystemTime::default()
        };
        assert_eq!(system_time_to_epoch(&before_epoch), 0);
        assert_eq!(system_time_to_epoch(&SystemTime::default()), 0);
    }

    #[test]
    fn listing_copies_only_present_fields() {
        let backend = backend(FakeSpooler::office());
        let printers = backend.list_printers();
        assert_eq!(printers.len(), 2);

        let office = &printers[0];
        assert!(office.is_default);
        assert_eq!(office.options.len(), 3);
        assert_eq!(office.options.get("location").map(String::as_str), Some("2nd floor"));
        assert!(!office.options.contains_key("comment"));

        let pdf = &printers[1];
        assert!(!pdf.is_default);
        assert_eq!(pdf.options.keys().collect::<Vec<_>>(), vec!["port"]);

        assert_eq!(backend.default_printer_name().as_deref(), Some("Office-LaserJet"));
        assert_eq!(backend.get_printer("Office-LaserJet"), printers[0]);
    }

    #[test]
    fn empty_default_marks_nothing() {
        let backend = backend(FakeSpooler {
            default: Some(String::new()),
            ..FakeSpooler::office()
        });
        assert!(backend.list_printers().iter().all(|p| !p.is_default));
        assert!(backend.default_printer_name().is_none());
    }

    #[test]
    fn raw_submission_releases_in_order() {
        let spooler = FakeSpooler::office();
        let backend = backend(spooler.clone());
        let id = backend.print_bytes("Office-LaserJet", b"Hello\n", "RAW", &PrintOptions::new());
        assert_eq!(id, 12);
        assert_eq!(
            spooler.log(),
            vec![
                "open Office-LaserJet",
                "start_doc Spoolwerk Print Job RAW",
                "start_page",
                "write 6",
                "end_page",
                "end_doc",
                "close Office-LaserJet",
            ]
        );
    }

    #[test]
    fn claimed_format_does_not_change_datatype() {
        let spooler = FakeSpooler::office();
        let backend = backend(spooler.clone());
        backend.print_bytes("Office-LaserJet", b"%PDF", "PDF", &PrintOptions::new());
        assert!(spooler.log().contains(&"start_doc Spoolwerk Print Job RAW".to_string()));
    }

    #[test]
    fn failed_page_still_ends_doc_and_closes() {
        let spooler = FakeSpooler {
            fail_start_page: true,
            ..FakeSpooler::office()
        };
        let backend = backend(spooler.clone());
        assert_eq!(
            backend.print_bytes("Office-LaserJet", b"x", "RAW", &PrintOptions::new()),
            PRINT_FAILED
        );
        assert_eq!(
            spooler.log(),
            vec![
                "open Office-LaserJet",
                "start_doc Spoolwerk Print Job RAW",
                "end_doc",
                "close Office-LaserJet",
            ]
        );
    }

    #[test]
    fn short_write_is_failure() {
        let spooler = FakeSpooler {
            short_write: true,
            ..FakeSpooler::office()
        };
        let backend = backend(spooler.clone());
        assert_eq!(
            backend.print_bytes("Office-LaserJet", b"abc", "RAW", &PrintOptions::new()),
            PRINT_FAILED
        );
        assert!(spooler.log().ends_with(&[
            "end_page".to_string(),
            "end_doc".to_string(),
            "close Office-LaserJet".to_string(),
        ]));
    }

    #[test]
    fn unknown_printer_fails_without_handles() {
        let spooler = FakeSpooler::office();
        let backend = backend(spooler.clone());
        assert_eq!(
            backend.print_bytes("Nowhere", b"x", "RAW", &PrintOptions::new()),
            PRINT_FAILED
        );
        assert!(spooler.log().is_empty());
    }

    #[test]
    fn print_file_reads_bytes_and_sends_raw() {
        let spooler = FakeSpooler::office();
        let backend = backend(spooler.clone());
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("label.zpl");
        std::fs::write(&path, b"^XA^FDhi^FS^XZ").expect("write");

        assert_eq!(backend.print_file("Office-LaserJet", &path), 12);
        assert!(spooler.log().contains(&"write 14".to_string()));
        assert_eq!(
            backend.print_file("Office-LaserJet", &dir.path().join("missing.zpl")),
            PRINT_FAILED
        );
    }

    #[test]
    fn paper_prefers_form_name_then_code() {
        let named = backend(FakeSpooler::office());
        assert_eq!(named.selected_paper_size("Office-LaserJet").as_deref(), Some("A4"));

        let coded = backend(FakeSpooler {
            devmode: DevModeInfo {
                form_name: Some(String::new()),
                paper_size: Some(9),
            },
            ..FakeSpooler::office()
        });
        assert_eq!(coded.selected_paper_size("Office-LaserJet").as_deref(), Some("9"));

        let unknown = backend(FakeSpooler {
            devmode: DevModeInfo::default(),
            ..FakeSpooler::office()
        });
        assert!(unknown.selected_paper_size("Office-LaserJet").is_none());
        assert!(unknown.selected_paper_size("Nowhere").is_none());
    }

    #[test]
    fn driver_options_are_always_empty() {
        let backend = backend(FakeSpooler::office());
        assert!(backend.driver_options("Office-LaserJet").is_empty());
        assert!(backend.driver_options("Unknown-Printer").is_empty());
    }

    #[test]
    fn found_job_maps_fields() {
        let backend = backend(FakeSpooler::office());
        let job = backend.get_job("Office-LaserJet", 12);
        assert_eq!(job.id, 12);
        assert_eq!(job.name, "Quarterly report");
        assert_eq!(job.user, "frontdesk");
        assert_eq!(job.format, "RAW");
        assert_eq!(job.size, 2048);
        assert_eq!(job.status, vec![JobStatus::Paused, JobStatus::Printing]);
        assert_eq!(job.creation_time, 1_700_000_000);
        assert_eq!(job.processing_time, job.creation_time);
        assert_eq!(job.completed_time, 0);
    }

    #[test]
    fn missing_job_has_not_found_shape() {
        let backend = backend(FakeSpooler::office());
        assert_eq!(
            backend.get_job("Office-LaserJet", 99),
            JobDescriptor::not_found("Office-LaserJet", 99)
        );
        assert!(!backend.get_job("Nowhere", 12).is_found());
        assert!(!backend.get_job("Office-LaserJet", -1).is_found());
    }

    #[test]
    fn commands_are_strict() {
        let spooler = FakeSpooler::office();
        let backend = backend(spooler.clone());
        backend.set_job("Office-LaserJet", 12, "pause");
        backend.set_job("Office-LaserJet", 12, "HOLD");
        backend.set_job("Office-LaserJet", 12, "Resume");
        backend.set_job("Office-LaserJet", 12, "cancel");
        let controls: Vec<String> = spooler
            .log()
            .into_iter()
            .filter(|e| e.starts_with("control"))
            .collect();
        assert_eq!(
            controls,
            vec!["control 12 PAUSE", "control 12 RESUME", "control 12 CANCEL"]
        );
    }

    #[test]
    fn advertises_raw_family_only() {
        let backend = backend(FakeSpooler::office());
        assert_eq!(
            backend.supported_formats(),
            &[PrintFormat::Raw, PrintFormat::Text, PrintFormat::Command]
        );
    }
}
