// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lifecycle events delivered by an instrumentation run.

use indexmap::IndexMap;
use std::{fmt, time::Duration};

/// Uniquely identifies one test case within a run.
///
/// Equality is structural: two identifiers naming the same class and method
/// refer to the same test.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TestIdentifier {
    /// The fully qualified name of the test class.
    pub class_name: String,

    /// The name of the test method within the class.
    pub method_name: String,
}

impl TestIdentifier {
    /// Creates a new `TestIdentifier`.
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class_name, self.method_name)
    }
}

/// A lifecycle event for one device/run pair.
///
/// Events are produced by whatever drives the device (the event source) and
/// consumed by a [`RunListener`](crate::listener::RunListener). The set is
/// closed: the listener's state machine handles every variant explicitly.
#[derive(Clone, Debug)]
pub enum RunEvent {
    /// The test run started.
    RunStarted {
        /// The name the harness reports for this run.
        name: String,

        /// The number of tests the harness expects to execute.
        ///
        /// Advisory only: the actual number of observed tests may
        /// legitimately differ. Arrives as a signed value and is validated
        /// by the listener.
        expected_count: i64,
    },

    /// A test case started running.
    TestStarted {
        /// The test that started.
        id: TestIdentifier,
    },

    /// A running test case failed.
    TestFailed {
        /// The test that failed.
        id: TestIdentifier,

        /// The failure stack trace reported by the harness.
        trace: String,
    },

    /// A running test case failed an assumption and will be skipped.
    TestAssumptionFailed {
        /// The test whose assumption failed.
        id: TestIdentifier,

        /// The assumption-failure stack trace reported by the harness.
        trace: String,
    },

    /// A running test case was ignored.
    TestIgnored {
        /// The test that was ignored.
        id: TestIdentifier,
    },

    /// A test case finished running.
    TestEnded {
        /// The test that ended.
        id: TestIdentifier,

        /// Key/value annotations the harness attached to this case.
        metrics: IndexMap<String, String>,
    },

    /// The run as a whole failed.
    ///
    /// This does not end the run: a [`RunEvent::RunEnded`] is still expected
    /// afterwards.
    RunFailed {
        /// The run-level failure message.
        message: String,
    },

    /// The test run ended.
    RunEnded {
        /// The total time taken by the run, as measured by the harness.
        elapsed: Duration,

        /// Key/value annotations the harness attached to the run.
        metrics: IndexMap<String, String>,
    },
}
