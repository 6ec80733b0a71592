// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report output configuration.

use camino::Utf8PathBuf;
use serde::Deserialize;

/// Configuration for [`ReportWriter`](crate::writer::ReportWriter).
///
/// Deserializable so an embedding tool can bind it from its own
/// configuration surface; that binding is the caller's concern.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReporterConfig {
    /// Directory under which per-device report directories are created.
    pub output_dir: Utf8PathBuf,

    /// Name recorded for runs whose harness does not declare one.
    #[serde(default = "default_report_name")]
    pub report_name: String,
}

impl ReporterConfig {
    /// Creates a config writing under the given output directory, with the
    /// default report name.
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            report_name: default_report_name(),
        }
    }
}

fn default_report_name() -> String {
    "instrumentation-run".to_owned()
}
