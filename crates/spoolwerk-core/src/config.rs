// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend configuration.

use serde::{Deserialize, Serialize};

/// Port the CUPS scheduler listens on unless told otherwise.
pub const DEFAULT_IPP_PORT: u16 = 631;

/// Settings shared by both backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Title given to every submitted job and document.
    pub job_title: String,
    /// Host of the CUPS scheduler.
    pub cups_server: String,
    /// Port of the CUPS scheduler.
    pub ipp_port: u16,
    /// Value sent as `requesting-user-name`.
    pub user_name: String,
    /// Prefix for temporary document and PPD files.
    pub temp_prefix: String,
    /// Destination that takes precedence over the scheduler's default
    /// (the `LPDEST` / `PRINTER` convention).
    pub default_printer_override: Option<String>,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            job_title: "Spoolwerk Print Job".into(),
            cups_server: "localhost".into(),
            ipp_port: DEFAULT_IPP_PORT,
            user_name: "anonymous".into(),
            temp_prefix: "spoolwerk_print_".into(),
            default_printer_override: None,
        }
    }
}

impl SpoolConfig {
    /// Build a configuration from the process environment, honouring the same
    /// variables libcups does: `CUPS_SERVER`, `IPP_PORT`, `LPDEST`, `PRINTER`,
    /// plus `USER` / `USERNAME` for the requesting user.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SpoolConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = non_empty("IPP_PORT").and_then(|p| p.trim().parse().ok()) {
            config.ipp_port = port;
        }

        if let Some(server) = non_empty("CUPS_SERVER") {
            let server = server.trim();
            // A domain-socket path means "the local scheduler".
            if !server.starts_with('/') {
                match server.rsplit_once(':') {
                    Some((host, port)) if port.parse::<u16>().is_ok() => {
                        config.cups_server = host.to_string();
                        config.ipp_port = port.parse().unwrap_or(config.ipp_port);
                    }
                    _ => config.cups_server = server.to_string(),
                }
            }
        }

        if let Some(user) = non_empty("USER").or_else(|| non_empty("USERNAME")) {
            config.user_name = user;
        }

        config.default_printer_override = non_empty("LPDEST").or_else(|| non_empty("PRINTER"));
        config
    }

    /// Base `http://` URI of the scheduler.
    pub fn cups_base_uri(&self) -> String {
        format!("http://{}:{}", self.cups_server, self.ipp_port)
    }
}
