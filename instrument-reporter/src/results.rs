// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The aggregate model of a finished run.

use crate::{device::DeviceInfo, events::TestIdentifier};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::time::Duration;

/// The final outcome of one test case.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestOutcome {
    /// The test ran to completion without a reported failure.
    Passed,

    /// The test failed.
    Failed,

    /// A runtime assumption did not hold, so the test was abandoned.
    ///
    /// Reported as skipped in the XML output, the JUnit convention.
    AssumptionFailed,

    /// The test was ignored without being executed.
    Ignored,
}

/// One finalized test case.
#[derive(Clone, Debug)]
pub struct TestResult {
    /// The identifier of this test case.
    pub id: TestIdentifier,

    /// The final outcome.
    pub outcome: TestOutcome,

    /// The failure or assumption-failure trace, if one was reported.
    pub trace: Option<String>,

    /// The measured time between the start and end events for this case.
    pub elapsed: Duration,

    /// Key/value annotations the harness attached to this case.
    ///
    /// The fixed report schema has no per-case property slot, so metrics are
    /// exposed here rather than serialized.
    pub metrics: IndexMap<String, String>,
}

/// All results for one test class, in first-seen arrival order.
#[derive(Clone, Debug)]
pub struct SuiteResult {
    /// The fully qualified name of the test class.
    pub class_name: String,

    /// The finalized cases of this class, in arrival order.
    pub cases: Vec<TestResult>,

    /// The suite-level elapsed time (the run-level elapsed time, stamped on
    /// every suite when the run is sealed).
    pub elapsed: Duration,

    /// Property snapshot taken at seal time: device identity plus run-level
    /// metrics.
    pub properties: IndexMap<String, String>,
}

impl SuiteResult {
    /// The total number of cases in this suite.
    pub fn tests(&self) -> usize {
        self.cases.len()
    }

    /// The number of failed cases.
    pub fn failures(&self) -> usize {
        self.count(TestOutcome::Failed)
    }

    /// The number of cases abandoned on a failed assumption.
    pub fn assumption_failures(&self) -> usize {
        self.count(TestOutcome::AssumptionFailed)
    }

    /// The number of ignored cases.
    pub fn ignored(&self) -> usize {
        self.count(TestOutcome::Ignored)
    }

    /// The number of cases reported as skipped: ignored cases plus assumption
    /// failures.
    pub fn skipped(&self) -> usize {
        self.ignored() + self.assumption_failures()
    }

    // Counts are always derived from the case list so they cannot drift.
    fn count(&self, outcome: TestOutcome) -> usize {
        self.cases
            .iter()
            .filter(|case| case.outcome == outcome)
            .count()
    }
}

/// The sealed aggregate of one device/run pair.
///
/// Built up by a [`RunListener`](crate::listener::RunListener) and immutable
/// once the run-ended event has been processed.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// The name the harness reported at run start, possibly empty.
    pub name: String,

    /// The test count declared at run start. Advisory only.
    pub expected_count: usize,

    /// The device this run executed on.
    pub device: DeviceInfo,

    /// The wall-clock time at which the run started.
    pub start_time: DateTime<FixedOffset>,

    /// The per-class suites, in first-seen order.
    pub suites: Vec<SuiteResult>,

    /// The run-level elapsed time reported by the harness.
    pub elapsed: Duration,

    /// The run-level failure message, if the run as a whole failed.
    pub run_error: Option<String>,

    /// Key/value annotations the harness attached to the run.
    pub metrics: IndexMap<String, String>,
}

impl RunResult {
    /// The total number of cases recorded across all suites.
    pub fn total_tests(&self) -> usize {
        self.suites.iter().map(SuiteResult::tests).sum()
    }
}
