// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PostScript Printer Description (PPD) reader.
//
// Only the parts needed to rebuild a driver's option tree are understood:
//
//   *OpenUI *PageSize/Media Size: PickOne       opens an option
//   *DefaultPageSize: A4                        default choice (may precede the block)
//   *PageSize A4/A4: "<</PageSize[595 842]>>…"  one choice per line
//   *CloseUI: *PageSize                         closes the option
//
// `*JCLOpenUI` / `*JCLCloseUI` are treated the same way.  Invocation values may
// span several lines inside double quotes; those continuation lines are
// skipped.  Everything else (`*%` comments, constraints, fonts…) is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::DriverOptions;

/// Keyword holding the selected media size.
pub const PAGE_SIZE: &str = "PageSize";
/// Fallback keyword some drivers use instead of (or besides) `PageSize`.
pub const PAGE_REGION: &str = "PageRegion";

/// One selectable value of an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpdChoice {
    pub choice: String,
    pub text: String,
}

/// A UI option (`*OpenUI` block) and its choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpdOption {
    pub keyword: String,
    pub text: String,
    /// `PickOne`, `PickMany` or `Boolean`.
    pub ui: String,
    /// Value of the matching `*Default<keyword>` line, if any.
    pub default_choice: Option<String>,
    pub choices: Vec<PpdChoice>,
}

impl PpdOption {
    pub fn has_choice(&self, choice: &str) -> bool {
        self.choices.iter().any(|c| c.choice == choice)
    }
}

/// A parsed PPD file.
#[derive(Debug, Clone, Default)]
pub struct PpdFile {
    options: Vec<PpdOption>,
}

impl PpdFile {
    /// Read and parse a PPD from disk.  PPDs are frequently Latin-1, so the
    /// bytes are decoded lossily rather than rejected.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    /// Parse PPD text.  Fails only when the `*PPD-Adobe` header is missing.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let header = lines.by_ref().find(|l| !l.trim().is_empty()).unwrap_or("");
        if !header.trim_start_matches('\u{feff}').starts_with("*PPD-Adobe") {
            return Err(SpoolwerkError::Ppd("missing *PPD-Adobe header".into()));
        }

        let mut options: Vec<PpdOption> = Vec::new();
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut defaults: BTreeMap<String, String> = BTreeMap::new();
        let mut current: Option<usize> = None;
        let mut in_quoted_value = false;

        for raw in lines {
            if in_quoted_value {
                if raw.matches('"').count() % 2 == 1 {
                    in_quoted_value = false;
                }
                continue;
            }

            let Some(entry) = Entry::split(raw) else {
                continue;
            };
            if entry.value.matches('"').count() % 2 == 1 {
                in_quoted_value = true;
            }

            match entry.keyword {
                "OpenUI" | "JCLOpenUI" => {
                    let Some(label) = entry.option else { continue };
                    let (keyword, text) = split_translation(label.trim_start_matches('*'));
                    if keyword.is_empty() {
                        continue;
                    }
                    let slot = *index.entry(keyword.to_string()).or_insert_with(|| {
                        options.push(PpdOption {
                            keyword: keyword.to_string(),
                            text: text.to_string(),
                            ui: entry.value.trim().to_string(),
                            default_choice: None,
                            choices: Vec::new(),
                        });
                        options.len() - 1
                    });
                    current = Some(slot);
                }
                "CloseUI" | "JCLCloseUI" => current = None,
                keyword if keyword.len() > "Default".len() && keyword.starts_with("Default") => {
                    if entry.option.is_none() {
                        let value = unquote(entry.value.trim());
                        defaults.insert(keyword["Default".len()..].to_string(), value.to_string());
                    }
                }
                keyword => {
                    let Some(label) = entry.option else { continue };
                    let slot = match current {
                        Some(slot) if options[slot].keyword == keyword => slot,
                        _ => match index.get(keyword) {
                            Some(slot) => *slot,
                            None => continue,
                        },
                    };
                    let (choice, text) = split_translation(label);
                    let option = &mut options[slot];
                    if !choice.is_empty() && !option.has_choice(choice) {
                        option.choices.push(PpdChoice {
                            choice: choice.to_string(),
                            text: text.to_string(),
                        });
                    }
                }
            }
        }

        for option in &mut options {
            option.default_choice = defaults.remove(&option.keyword);
        }

        debug!(options = options.len(), "parsed PPD");
        Ok(Self { options })
    }

    pub fn options(&self) -> &[PpdOption] {
        &self.options
    }

    pub fn find_option(&self, keyword: &str) -> Option<&PpdOption> {
        self.options.iter().find(|o| o.keyword == keyword)
    }

    /// Every option with its choices, each flagged when it is the driver
    /// default.  A choice group may end up with no default at all if the PPD
    /// names a default that is not among its choices.
    pub fn driver_options(&self) -> DriverOptions {
        self.options
            .iter()
            .map(|option| {
                let choices = option
                    .choices
                    .iter()
                    .map(|c| {
                        let is_default = option.default_choice.as_deref() == Some(c.choice.as_str());
                        (c.choice.clone(), is_default)
                    })
                    .collect();
                (option.keyword.clone(), choices)
            })
            .collect()
    }

    /// Default media: `PageSize` when the driver defines it, `PageRegion`
    /// otherwise.
    pub fn page_size(&self) -> Option<String> {
        self.find_option(PAGE_SIZE)
            .or_else(|| self.find_option(PAGE_REGION))
            .and_then(|o| o.default_choice.clone())
    }
}

/// One `*Keyword Option/Text: value` line, borrowed from the source.
struct Entry<'a> {
    keyword: &'a str,
    option: Option<&'a str>,
    value: &'a str,
}

impl<'a> Entry<'a> {
    fn split(line: &'a str) -> Option<Self> {
        let body = line.strip_prefix('*')?;
        if body.starts_with('%') || body.trim_end() == "End" {
            return None;
        }

        let key_end = body
            .find(|c: char| c == ':' || c.is_ascii_whitespace())
            .unwrap_or(body.len());
        let keyword = &body[..key_end];
        let rest = &body[key_end..];

        let (option, value) = match rest.find(':') {
            Some(colon) => {
                let option = rest[..colon].trim();
                let option = (!option.is_empty()).then_some(option);
                (option, &rest[colon + 1..])
            }
            None => (None, ""),
        };

        Some(Self {
            keyword,
            option,
            value,
        })
    }
}

/// Split `Name/Translation` into its two halves.
fn split_translation(label: &str) -> (&str, &str) {
    match label.split_once('/') {
        Some((name, text)) => (name.trim(), text.trim()),
        None => (label.trim(), label.trim()),
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
