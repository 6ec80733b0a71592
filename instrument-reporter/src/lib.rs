// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Aggregation of instrumentation test lifecycle events into durable,
//! per-class surefire-style XML reports.
//!
//! A test harness running on a remote device emits an ordered stream of
//! lifecycle events. One [`RunListener`](listener::RunListener) per
//! device/run pair consumes that stream, validates protocol ordering, and
//! aggregates the results in memory. When the run ends the sealed
//! [`RunResult`](results::RunResult) is handed to a
//! [`ReportSink`](writer::ReportSink), typically the file-system backed
//! [`ReportWriter`](writer::ReportWriter), which persists one XML report per
//! test class.
//!
//! The listener never talks to a device and never decides what to run; it is
//! driven synchronously by whatever delivers the events. Multiple devices run
//! in parallel by giving each its own listener instance.

pub mod config;
pub mod device;
pub mod errors;
pub mod events;
pub mod listener;
pub mod results;
mod stopwatch;
pub mod writer;
