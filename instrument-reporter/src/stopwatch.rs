// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for tracking when a run started and how long cases take.
//!
//! Pairs a `SystemTime`-derived wall clock (for report timestamps) with an
//! `Instant` monotonic clock (for elapsed measurement), so elapsed times are
//! immune to wall-clock adjustments.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart::new()
}

/// The start state of a stopwatch.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    fn new() -> Self {
        Self {
            // These two syscalls will happen imperceptibly close to each
            // other, which is good enough for our purposes.
            start_time: Local::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }
}
