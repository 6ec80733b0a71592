// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisting sealed runs as per-class XML report files.

use crate::{
    config::ReporterConfig,
    errors::{WriteError, WriteFailures},
    results::{RunResult, SuiteResult, TestOutcome},
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8PathBuf;
use quick_surefire::{NonSuccessKind, TestCase, TestCaseStatus, TestSuite};
use tracing::debug;

/// Destination for sealed run results.
///
/// The listener state machine only ever talks to this port, so tests can
/// aggregate runs without touching the filesystem.
pub trait ReportSink {
    /// Persists one sealed run.
    ///
    /// Implementations must attempt every suite before reporting failures.
    fn write_run(&mut self, run: &RunResult) -> Result<(), WriteFailures>;
}

/// Writes one surefire-style XML report file per test class.
///
/// Reports land under `<output-dir>/<device-dir>/TEST-<class-name>.xml`.
/// Each file is written to a temporary path and atomically renamed into
/// place, so a crash or full disk never leaves a truncated report as the
/// final artifact. Concurrent runs never contend: the device directory is
/// derived from the device serial, which is unique per run.
#[derive(Clone, Debug)]
pub struct ReportWriter {
    config: ReporterConfig,
}

impl ReportWriter {
    /// Creates a writer from the given config.
    pub fn new(config: ReporterConfig) -> Self {
        Self { config }
    }

    /// The path the given suite's report is written to.
    pub fn suite_path(&self, run: &RunResult, suite: &SuiteResult) -> Utf8PathBuf {
        self.config
            .output_dir
            .join(run.device.report_dir_name())
            .join(format!("TEST-{}.xml", suite.class_name))
    }
}

impl ReportSink for ReportWriter {
    fn write_run(&mut self, run: &RunResult) -> Result<(), WriteFailures> {
        let device_dir = self.config.output_dir.join(run.device.report_dir_name());
        std::fs::create_dir_all(&device_dir).map_err(|error| {
            WriteFailures::from(WriteError::CreateDir {
                path: device_dir.clone(),
                error,
            })
        })?;

        let mut failures = Vec::new();
        for suite in &run.suites {
            let path = device_dir.join(format!("TEST-{}.xml", suite.class_name));
            let report = build_testsuite(run, suite, &self.config);
            let atomic_file = AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite);
            match atomic_file.write(|out| report.serialize(out)) {
                Ok(()) => debug!("wrote report for `{}` to `{path}`", suite.class_name),
                Err(atomicwrites::Error::Internal(error)) => failures.push(WriteError::Write {
                    class_name: suite.class_name.clone(),
                    path,
                    error,
                }),
                Err(atomicwrites::Error::User(error)) => failures.push(WriteError::Serialize {
                    class_name: suite.class_name.clone(),
                    error,
                }),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(WriteFailures::new(failures))
        }
    }
}

/// Converts one sealed suite into its serializable report form.
fn build_testsuite(run: &RunResult, suite: &SuiteResult, config: &ReporterConfig) -> TestSuite {
    let mut out = TestSuite::new(suite.class_name.as_str());
    out.set_timestamp(run.start_time).set_time(suite.elapsed);

    let run_name = if run.name.is_empty() {
        config.report_name.as_str()
    } else {
        run.name.as_str()
    };
    out.add_property(("run.name", run_name));
    for (name, value) in &suite.properties {
        out.add_property((name.as_str(), value.as_str()));
    }
    if let Some(message) = &run.run_error {
        out.add_property(("run.failure", message.as_str()));
    }

    for case in &suite.cases {
        let status = match case.outcome {
            TestOutcome::Passed => TestCaseStatus::success(),
            TestOutcome::Failed => {
                let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
                status.set_type("test failure");
                apply_trace(&mut status, case.trace.as_deref());
                status
            }
            TestOutcome::AssumptionFailed => {
                let mut status = TestCaseStatus::skipped();
                status.set_type("test assumption failed");
                apply_trace(&mut status, case.trace.as_deref());
                status
            }
            TestOutcome::Ignored => TestCaseStatus::skipped(),
        };
        let mut testcase = TestCase::new(case.id.method_name.as_str(), status);
        testcase
            .set_classname(suite.class_name.as_str())
            .set_time(case.elapsed);
        out.add_testcase(testcase);
    }

    out
}

/// The first trace line becomes the message attribute, the full trace the
/// element text.
fn apply_trace(status: &mut TestCaseStatus, trace: Option<&str>) {
    let Some(trace) = trace else {
        return;
    };
    if let Some(first_line) = trace.lines().next() {
        status.set_message(first_line);
    }
    status.set_description(trace);
}
