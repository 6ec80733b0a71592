// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while serializing a [`TestSuite`](crate::TestSuite).
///
/// Returned by [`TestSuite::serialize`](crate::TestSuite::serialize) and
/// [`TestSuite::to_string`](crate::TestSuite::to_string).
#[derive(Debug, Error)]
#[error("error serializing surefire report")]
pub struct SerializeError {
    #[from]
    inner: quick_xml::Error,
}
