// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: printers, driver options, jobs, and the closed status /
// format / command taxonomies every backend maps its native concepts onto.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Job id returned by a submission that did not reach the print service.
pub const PRINT_FAILED: i32 = 0;

/// Backend-defined printer metadata (location, driver, port, dest options…).
pub type PrinterOptions = BTreeMap<String, String>;

/// Caller-supplied job options (`media=A4`, `copies=2`, …).
pub type PrintOptions = BTreeMap<String, String>;

/// Option keyword → (choice → "is the default choice").
pub type DriverOptions = BTreeMap<String, BTreeMap<String, bool>>;

// ---------------------------------------------------------------------------
// Taxonomies
// ---------------------------------------------------------------------------

/// Lifecycle state of a job as seen through either backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Paused,
    Printing,
    Aborted,
    Cancelled,
    Printed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paused => "PAUSED",
            Self::Printing => "PRINTING",
            Self::Aborted => "ABORTED",
            Self::Cancelled => "CANCELLED",
            Self::Printed => "PRINTED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document formats a backend may claim to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrintFormat {
    Raw,
    Text,
    Pdf,
    Jpeg,
    PostScript,
    Command,
    Auto,
}

impl PrintFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::Text => "TEXT",
            Self::Pdf => "PDF",
            Self::Jpeg => "JPEG",
            Self::PostScript => "POSTSCRIPT",
            Self::Command => "COMMAND",
            Self::Auto => "AUTO",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the taxonomy.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "RAW" => Some(Self::Raw),
            "TEXT" => Some(Self::Text),
            "PDF" => Some(Self::Pdf),
            "JPEG" => Some(Self::Jpeg),
            "POSTSCRIPT" => Some(Self::PostScript),
            "COMMAND" => Some(Self::Command),
            "AUTO" => Some(Self::Auto),
            _ => None,
        }
    }

    /// Formats the scheduler must receive as a complete file so it can run
    /// its own filter chain, rather than as a raw byte stream.
    pub fn needs_document_file(&self) -> bool {
        matches!(self, Self::Pdf | Self::Jpeg | Self::PostScript)
    }
}

impl fmt::Display for PrintFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrintFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown print format: {s}"))
    }
}

/// Job-control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobCommand {
    Cancel,
    Pause,
    Resume,
}

impl JobCommand {
    pub const ALL: [JobCommand; 3] = [Self::Cancel, Self::Pause, Self::Resume];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancel => "CANCEL",
            Self::Pause => "PAUSE",
            Self::Resume => "RESUME",
        }
    }

    /// Case-insensitive, also accepting the scheduler spellings
    /// `HOLD` (pause) and `RELEASE` (resume).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HOLD" => Some(Self::Pause),
            "RELEASE" => Some(Self::Resume),
            _ => Self::parse_strict(value),
        }
    }

    /// Case-insensitive, canonical names only.
    pub fn parse_strict(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CANCEL" => Some(Self::Cancel),
            "PAUSE" => Some(Self::Pause),
            "RESUME" => Some(Self::Resume),
            _ => None,
        }
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A printer as known to the native print service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDescriptor {
    pub name: String,
    pub is_default: bool,
    pub options: PrinterOptions,
}

impl PrinterDescriptor {
    /// The shape returned for a name the service does not know.
    pub fn not_found(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// A job in a printer's queue.
///
/// Times are seconds since the Unix epoch, `0` when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub id: i32,
    pub name: String,
    pub printer_name: String,
    pub user: String,
    pub format: String,
    pub priority: i32,
    pub size: i32,
    /// Never empty for a job that was found; empty means "no such job".
    pub status: Vec<JobStatus>,
    pub creation_time: i64,
    pub processing_time: i64,
    pub completed_time: i64,
}

impl JobDescriptor {
    /// The shape returned when no job with `id` is queued on `printer_name`.
    pub fn not_found(printer_name: &str, id: i32) -> Self {
        Self {
            id,
            printer_name: printer_name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_found(&self) -> bool {
        !self.status.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parse_is_case_insensitive() {
        assert_eq!(PrintFormat::parse("pdf"), Some(PrintFormat::Pdf));
        assert_eq!(PrintFormat::parse(" PostScript "), Some(PrintFormat::PostScript));
        assert_eq!(PrintFormat::parse("docx"), None);
        assert!("zpl".parse::<PrintFormat>().is_err());
    }

    #[test]
    fn only_rendered_formats_need_a_file() {
        let file_formats: Vec<_> = [
            PrintFormat::Raw,
            PrintFormat::Text,
            PrintFormat::Pdf,
            PrintFormat::Jpeg,
            PrintFormat::PostScript,
            PrintFormat::Command,
            PrintFormat::Auto,
        ]
        .into_iter()
        .filter(PrintFormat::needs_document_file)
        .collect();
        assert_eq!(
            file_formats,
            vec![PrintFormat::Pdf, PrintFormat::Jpeg, PrintFormat::PostScript]
        );
    }

    #[test]
    fn command_synonyms_only_in_lenient_parse() {
        assert_eq!(JobCommand::parse("hold"), Some(JobCommand::Pause));
        assert_eq!(JobCommand::parse("Release"), Some(JobCommand::Resume));
        assert_eq!(JobCommand::parse("cancel"), Some(JobCommand::Cancel));
        assert_eq!(JobCommand::parse_strict("HOLD"), None);
        assert_eq!(JobCommand::parse_strict("resume"), Some(JobCommand::Resume));
        assert_eq!(JobCommand::parse("restart"), None);
    }

    #[test]
    fn not_found_shapes() {
        let printer = PrinterDescriptor::not_found("Nowhere");
        assert_eq!(printer.name, "Nowhere");
        assert!(!printer.is_default);
        assert!(printer.options.is_empty());

        let job = JobDescriptor::not_found("Nowhere", 42);
        assert_eq!(job.id, 42);
        assert_eq!(job.printer_name, "Nowhere");
        assert!(!job.is_found());
        assert_eq!(job.creation_time, 0);
    }

    #[test]
    fn boundary_shape_uses_host_field_names() {
        let job = JobDescriptor {
            id: 7,
            printer_name: "Office-LaserJet".into(),
            status: vec![JobStatus::Paused, JobStatus::Printing],
            creation_time: 1_700_000_000,
            ..JobDescriptor::default()
        };
        let json = serde_json::to_value(&job).expect("serialize");
        assert_eq!(json["printerName"], "Office-LaserJet");
        assert_eq!(json["status"], serde_json::json!(["PAUSED", "PRINTING"]));
        assert_eq!(json["creationTime"], 1_700_000_000);

        let printer = PrinterDescriptor {
            name: "Office-LaserJet".into(),
            is_default: true,
            options: PrinterOptions::new(),
        };
        let json = serde_json::to_value(&printer).expect("serialize");
        assert_eq!(json["isDefault"], true);

        let format = serde_json::to_value(PrintFormat::PostScript).expect("serialize");
        assert_eq!(format, "POSTSCRIPT");
    }
}
