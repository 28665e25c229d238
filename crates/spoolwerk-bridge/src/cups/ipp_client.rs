// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blocking IPP client for the local CUPS scheduler.
//
// Implements `CupsApi` with the operations libcups itself sends:
//   - CUPS-Get-Printers / CUPS-Get-Default   (destination listing)
//   - CUPS-Get-PPD                           (driver definition)
//   - Print-Job                              (file hand-off)
//   - Create-Job + Send-Document             (streamed submission)
//   - Get-Jobs                               (RFC 8011 §4.2.6)
//   - Cancel-Job / Hold-Job / Release-Job    (RFC 8011 §4.2.8, §4.3.5, §4.3.6)

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;

use ipp::prelude::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, instrument, warn};

use spoolwerk_core::config::SpoolConfig;
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::PrinterOptions;

use super::api::{CupsApi, CupsDest, CupsJob, CupsOption, DocumentRequest, IppStatus};

/// Printer attributes copied into a destination's option map.
pub const DEST_OPTION_ATTRIBUTES: &[&str] = &[
    "device-uri",
    "printer-info",
    "printer-is-accepting-jobs",
    "printer-is-shared",
    "printer-location",
    "printer-make-and-model",
    "printer-state",
    "printer-type",
    "printer-uri-supported",
];

const JOB_ATTRIBUTES: &[&str] = &[
    "job-id",
    "job-name",
    "job-originating-user-name",
    "document-format",
    "job-priority",
    "job-k-octets",
    "job-state",
    "time-at-creation",
    "time-at-processing",
    "time-at-completed",
];

/// Bytes escaped in the `/printers/<name>` path segment: all but RFC 3986
/// unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `CupsApi` over IPP to the scheduler named in a [`SpoolConfig`].
pub struct IppCups {
    config: SpoolConfig,
}

impl IppCups {
    pub fn new(config: SpoolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpoolConfig {
        &self.config
    }

    fn server_uri(&self) -> Result<Uri> {
        let base = self.config.cups_base_uri();
        base.parse()
            .map_err(|e| SpoolwerkError::Ipp(format!("invalid scheduler URI '{base}': {e}")))
    }

    fn printer_uri(&self, printer: &str) -> Result<Uri> {
        validate_printer_name(printer)?;
        let uri = format!(
            "{}/printers/{}",
            self.config.cups_base_uri(),
            utf8_percent_encode(printer, PATH_SEGMENT)
        );
        uri.parse()
            .map_err(|e| SpoolwerkError::Ipp(format!("invalid printer URI '{uri}': {e}")))
    }

    /// A request addressed to `uri` carrying `requesting-user-name`.
    fn request(&self, operation: Operation, uri: Uri) -> IppRequestResponse {
        let mut request = IppRequestResponse::new(IppVersion::v1_1(), operation, Some(uri));
        request.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "requesting-user-name",
                IppValue::NameWithoutLanguage(self.config.user_name.clone()),
            ),
        );
        request
    }

    fn send(&self, uri: Uri, request: IppRequestResponse, what: &str) -> Result<IppRequestResponse> {
        debug!(operation = what, "sending IPP request");
        IppClient::new(uri)
            .send(request)
            .map_err(|e| SpoolwerkError::Ipp(format!("{what}: {e}")))
    }

    /// Send and require a successful status.
    fn send_checked(
        &self,
        uri: Uri,
        request: IppRequestResponse,
        what: &str,
    ) -> Result<IppRequestResponse> {
        let response = self.send(uri, request, what)?;
        if !response.header().status_code().is_success() {
            let code = response.header().status_code();
            error!(status = ?code, operation = what, "IPP request rejected");
            return Err(SpoolwerkError::Ipp(format!("{what} returned status {code:?}")));
        }
        Ok(response)
    }

    /// The destination `CUPS-Get-Default` names, if any.
    fn server_default(&self) -> Result<Option<String>> {
        let uri = self.server_uri()?;
        let request = self.request(Operation::CupsGetDefault, uri.clone());
        let response = self.send(uri, request, "CUPS-Get-Default")?;
        if !response.header().status_code().is_success() {
            debug!(status = ?response.header().status_code(), "scheduler has no default destination");
            return Ok(None);
        }
        Ok(response
            .attributes()
            .groups_of(DelimiterTag::PrinterAttributes)
            .find_map(|group| text_attr(group.attributes(), "printer-name")))
    }

    fn job_operation(&self, operation: Operation, printer: &str, job_id: i32, what: &str) -> Result<()> {
        let uri = self.printer_uri(printer)?;
        let mut request = self.request(operation, uri.clone());
        request.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new("job-id", IppValue::Integer(job_id)),
        );
        self.send_checked(uri, request, what)?;
        info!(printer, job_id, operation = what, "job command accepted");
        Ok(())
    }
}

impl CupsApi for IppCups {
    #[instrument(skip(self))]
    fn get_dests(&self) -> Result<Vec<CupsDest>> {
        let uri = self.server_uri()?;
        let request = self.request(Operation::CupsGetPrinters, uri.clone());
        let response = self.send(uri, request, "CUPS-Get-Printers")?;

        // The scheduler answers not-found when no destination is configured.
        if response.header().status_code() as u16 == IppStatus::NOT_FOUND.0 {
            return Ok(Vec::new());
        }
        if !response.header().status_code().is_success() {
            let code = response.header().status_code();
            return Err(SpoolwerkError::Ipp(format!(
                "CUPS-Get-Printers returned status {code:?}"
            )));
        }

        let mut dests: Vec<CupsDest> = response
            .attributes()
            .groups_of(DelimiterTag::PrinterAttributes)
            .filter_map(|group| dest_from_attributes(group.attributes()))
            .collect();

        let default = match self.config.default_printer_override.as_deref() {
            Some(name) if dests.iter().any(|d| d.name == name) => Some(name.to_string()),
            _ => self.server_default().unwrap_or_else(|e| {
                warn!(error = %e, "default destination lookup failed");
                None
            }),
        };
        if let Some(default) = default {
            for dest in dests.iter_mut() {
                dest.is_default = dest.name == default;
            }
        }

        debug!(count = dests.len(), "received destinations");
        Ok(dests)
    }

    #[instrument(skip(self))]
    fn get_ppd(&self, printer: &str) -> Result<NamedTempFile> {
        let uri = self.printer_uri(printer)?;
        let request = self.request(Operation::CupsGetPPD, uri.clone());
        let response = self
            .send_checked(uri, request, "CUPS-Get-PPD")
            .map_err(|e| SpoolwerkError::Ppd(e.to_string()))?;

        let mut file = tempfile::Builder::new()
            .prefix(&self.config.temp_prefix)
            .suffix(".ppd")
            .tempfile()?;
        let mut payload = response.into_payload();
        let written = io::copy(&mut payload, &mut file)?;
        if written == 0 {
            return Err(SpoolwerkError::Ppd(format!("{printer} has no PPD")));
        }

        debug!(bytes = written, path = %file.path().display(), "PPD downloaded");
        Ok(file)
    }

    #[instrument(skip(self, options), fields(options = options.len()))]
    fn print_file(
        &self,
        printer: &str,
        path: &Path,
        title: &str,
        options: &[CupsOption],
    ) -> Result<i32> {
        let uri = self.printer_uri(printer)?;
        let payload = IppPayload::new(File::open(path)?);

        let mut builder = IppOperationBuilder::print_job(uri.clone(), payload)
            .user_name(&self.config.user_name)
            .job_title(title);
        for attribute in encode_options(options) {
            builder = builder.attribute(attribute);
        }

        info!("sending Print-Job");
        let response = self.send_checked(uri, builder.build().into(), "Print-Job")?;
        let job_id = extract_job_id(response.attributes()).ok_or_else(|| {
            SpoolwerkError::Ipp("Print-Job response missing job-id attribute".into())
        })?;

        info!(job_id, "print job accepted by scheduler");
        Ok(job_id)
    }

    #[instrument(skip(self))]
    fn create_job(&self, printer: &str, title: &str) -> Result<i32> {
        let uri = self.printer_uri(printer)?;
        let mut request = self.request(Operation::CreateJob, uri.clone());
        request.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "job-name",
                IppValue::NameWithoutLanguage(title.to_string()),
            ),
        );

        let response = self.send_checked(uri, request, "Create-Job")?;
        extract_job_id(response.attributes()).ok_or_else(|| {
            SpoolwerkError::Ipp("Create-Job response missing job-id attribute".into())
        })
    }

    #[instrument(skip(self, document), fields(printer = %document.printer, job_id = document.job_id, bytes = document.data.len()))]
    fn finish_document(&self, document: DocumentRequest) -> Result<IppStatus> {
        let uri = self.printer_uri(&document.printer)?;
        let mut request = self.request(Operation::SendDocument, uri.clone());
        let operation_attributes = [
            IppAttribute::new("job-id", IppValue::Integer(document.job_id)),
            IppAttribute::new("document-name", IppValue::NameWithoutLanguage(document.name)),
            IppAttribute::new(
                "document-format",
                IppValue::MimeMediaType(document.format),
            ),
            IppAttribute::new("last-document", IppValue::Boolean(document.last)),
        ];
        for attribute in operation_attributes {
            request
                .attributes_mut()
                .add(DelimiterTag::OperationAttributes, attribute);
        }
        *request.payload_mut() = IppPayload::new(Cursor::new(document.data));

        let response = self.send(uri, request, "Send-Document")?;
        let status = IppStatus(response.header().status_code() as u16);
        debug!(status = status.0, "document finished");
        Ok(status)
    }

    fn cancel_job(&self, printer: &str, job_id: i32) -> Result<()> {
        self.job_operation(Operation::CancelJob, printer, job_id, "Cancel-Job")
    }

    fn hold_job(&self, printer: &str, job_id: i32) -> Result<()> {
        self.job_operation(Operation::HoldJob, printer, job_id, "Hold-Job")
    }

    fn release_job(&self, printer: &str, job_id: i32) -> Result<()> {
        self.job_operation(Operation::ReleaseJob, printer, job_id, "Release-Job")
    }

    #[instrument(skip(self))]
    fn get_jobs(&self, printer: &str) -> Result<Vec<CupsJob>> {
        let uri = self.printer_uri(printer)?;
        let mut request = self.request(Operation::GetJobs, uri.clone());
        let requested = JOB_ATTRIBUTES
            .iter()
            .map(|name| IppValue::Keyword(name.to_string()))
            .collect();
        let operation_attributes = [
            IppAttribute::new("which-jobs", IppValue::Keyword("all".into())),
            IppAttribute::new("my-jobs", IppValue::Boolean(false)),
            IppAttribute::new("requested-attributes", IppValue::Array(requested)),
        ];
        for attribute in operation_attributes {
            request
                .attributes_mut()
                .add(DelimiterTag::OperationAttributes, attribute);
        }

        let response = self.send(uri, request, "Get-Jobs")?;
        if response.header().status_code() as u16 == IppStatus::NOT_FOUND.0 {
            return Ok(Vec::new());
        }
        if !response.header().status_code().is_success() {
            let code = response.header().status_code();
            return Err(SpoolwerkError::Ipp(format!("Get-Jobs returned status {code:?}")));
        }

        let jobs: Vec<CupsJob> = response
            .attributes()
            .groups_of(DelimiterTag::JobAttributes)
            .filter_map(|group| job_from_attributes(group.attributes()))
            .collect();
        debug!(count = jobs.len(), "received job list");
        Ok(jobs)
    }
}

impl Default for IppCups {
    fn default() -> Self {
        Self::new(SpoolConfig::from_env())
    }
}

// ---------------------------------------------------------------------------
// Attribute helpers
// ---------------------------------------------------------------------------

/// Reject names the scheduler refuses for a destination: empty, longer
/// than 127 bytes, or holding whitespace, control characters or
/// `/ \ # ? " '`.  Everything else is escaped into the resource path.
pub fn validate_printer_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.len() > 127
        || name.chars().any(|c| {
            c.is_control() || c.is_whitespace() || matches!(c, '/' | '\\' | '#' | '?' | '"' | '\'')
        });
    if bad {
        return Err(SpoolwerkError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn int_attr(attrs: &HashMap<String, IppAttribute>, name: &str) -> Option<i32> {
    match attrs.get(name)?.value() {
        IppValue::Integer(v) | IppValue::Enum(v) => Some(*v),
        _ => None,
    }
}

fn text_attr(attrs: &HashMap<String, IppAttribute>, name: &str) -> Option<String> {
    match attrs.get(name)?.value() {
        IppValue::NoValue => None,
        value => Some(value.to_string()),
    }
}

fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    attrs
        .groups_of(DelimiterTag::JobAttributes)
        .find_map(|group| int_attr(group.attributes(), "job-id"))
}

/// One destination from a printer-attributes group.
pub fn dest_from_attributes(attrs: &HashMap<String, IppAttribute>) -> Option<CupsDest> {
    let name = text_attr(attrs, "printer-name")?;
    let options: PrinterOptions = DEST_OPTION_ATTRIBUTES
        .iter()
        .filter_map(|key| text_attr(attrs, key).map(|v| (key.to_string(), v)))
        .collect();
    Some(CupsDest {
        name,
        is_default: false,
        options,
    })
}

/// One job from a job-attributes group; groups without a `job-id` are
/// skipped.
pub fn job_from_attributes(attrs: &HashMap<String, IppAttribute>) -> Option<CupsJob> {
    let id = int_attr(attrs, "job-id")?;
    let text = |name| text_attr(attrs, name).unwrap_or_default();
    let time = |name| int_attr(attrs, name).map(i64::from).unwrap_or(0);
    Some(CupsJob {
        id,
        title: text("job-name"),
        user: text("job-originating-user-name"),
        format: text("document-format"),
        priority: int_attr(attrs, "job-priority").unwrap_or(0),
        size: int_attr(attrs, "job-k-octets").unwrap_or(0),
        state: int_attr(attrs, "job-state").unwrap_or(0),
        creation_time: time("time-at-creation"),
        processing_time: time("time-at-processing"),
        completed_time: time("time-at-completed"),
    })
}

/// Encode caller options as job-template attributes the way
/// `cupsEncodeOptions` types them.
pub fn encode_options(options: &[CupsOption]) -> Vec<IppAttribute> {
    options
        .iter()
        .filter(|o| !o.name.is_empty())
        .map(|o| IppAttribute::new(&o.name, encode_value(&o.value)))
        .collect()
}

fn encode_value(value: &str) -> IppValue {
    if value.contains(',') {
        return IppValue::Array(value.split(',').map(|v| encode_scalar(v.trim())).collect());
    }
    encode_scalar(value)
}

fn encode_scalar(value: &str) -> IppValue {
    if let Ok(n) = value.parse::<i32>() {
        return IppValue::Integer(n);
    }
    if let Some(range) = parse_range(value) {
        return range;
    }
    match value.to_ascii_lowercase().as_str() {
        "true" => IppValue::Boolean(true),
        "false" => IppValue::Boolean(false),
        _ => IppValue::Keyword(value.to_string()),
    }
}

/// `N-M` with `N <= M`, as `rangeOfInteger` (`page-ranges`).
fn parse_range(value: &str) -> Option<IppValue> {
    let (min, max) = value.split_once('-')?;
    let min = min.trim().parse::<i32>().ok()?;
    let max = max.trim().parse::<i32>().ok()?;
    (min <= max).then_some(IppValue::RangeOfInteger { min, max })
}
