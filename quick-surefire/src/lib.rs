// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generate surefire-style XML test reports in Rust.
//!
//! This crate models one report file: a single `<testsuite>` root element
//! with its `<properties>` and `<testcase>` children, the conventional shape
//! consumed by CI dashboards. Suite-level counts are derived from the case
//! list at serialization time rather than stored, so they can never drift
//! from the cases actually present.

mod errors;
mod report;
mod serialize;

pub use errors::*;
pub use report::*;
