// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while aggregating and persisting run results.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Malformed run-start parameters.
///
/// Fatal to the run being started (the listener stays idle) but not to the
/// process: a later, well-formed run-started event is accepted normally.
#[derive(Clone, Debug, Error)]
#[error("invalid start for run `{run_name}`: expected test count {expected_count} is negative")]
pub struct ConfigurationError {
    run_name: String,
    expected_count: i64,
}

impl ConfigurationError {
    pub(crate) fn new(run_name: impl Into<String>, expected_count: i64) -> Self {
        Self {
            run_name: run_name.into(),
            expected_count,
        }
    }

    /// The name of the rejected run.
    pub fn run_name(&self) -> &str {
        &self.run_name
    }
}

/// An error that occurred while persisting one report file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteError {
    /// The report output directory could not be created.
    #[error("error creating report directory `{path}`")]
    CreateDir {
        /// The directory being created.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The report file could not be written.
    #[error("error writing report for `{class_name}` to `{path}`")]
    Write {
        /// The class whose report failed to persist.
        class_name: String,

        /// The report path.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The report could not be serialized to XML.
    #[error("error serializing report for `{class_name}`")]
    Serialize {
        /// The class whose report failed to serialize.
        class_name: String,

        /// The underlying error.
        #[source]
        error: quick_surefire::SerializeError,
    },
}

impl WriteError {
    /// The class whose report was affected, if the failure is class-scoped.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            WriteError::CreateDir { .. } => None,
            WriteError::Write { class_name, .. } | WriteError::Serialize { class_name, .. } => {
                Some(class_name)
            }
        }
    }
}

/// One or more per-class report files could not be written.
///
/// Every class is attempted before this is surfaced, so a full disk during
/// one class's write does not discard the remaining classes.
#[derive(Debug, Error)]
#[error("failed to write {} test report file(s)", .failures.len())]
pub struct WriteFailures {
    failures: Vec<WriteError>,
}

impl WriteFailures {
    /// Creates a new `WriteFailures` from the collected per-class errors.
    pub fn new(failures: Vec<WriteError>) -> Self {
        Self { failures }
    }

    /// The collected failures, in the order the classes were attempted.
    pub fn failures(&self) -> &[WriteError] {
        &self.failures
    }

    /// Consumes self, returning the collected failures.
    pub fn into_failures(self) -> Vec<WriteError> {
        self.failures
    }
}

impl From<WriteError> for WriteFailures {
    fn from(failure: WriteError) -> Self {
        Self::new(vec![failure])
    }
}

/// An error returned while feeding an event through a
/// [`RunListener`](crate::listener::RunListener).
///
/// Protocol violations are not errors: they are logged and recovered from
/// locally. Only rejected run parameters and report-write failures surface
/// here.
#[derive(Debug, Error)]
pub enum HandleEventError {
    /// The run-started parameters were rejected.
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    /// The sealed run could not be fully persisted.
    #[error(transparent)]
    Write(#[from] WriteFailures),
}
