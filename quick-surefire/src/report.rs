// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SerializeError, serialize::serialize_suite};
use chrono::{DateTime, FixedOffset};
use indexmap::map::IndexMap;
use std::{fmt, io, time::Duration};

/// A single testsuite, the root element of one surefire-style report file.
///
/// A `TestSuite` groups together the [`TestCase`] results of one test class.
/// The `tests`/`failures`/`errors`/`skipped` attributes of the serialized
/// element are computed from the case list on every serialization; they are
/// intentionally not fields of this type.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestSuite {
    /// The name of this testsuite, typically a fully qualified class name.
    pub name: XmlString,

    /// The time at which the testsuite began execution.
    pub timestamp: Option<DateTime<FixedOffset>>,

    /// The overall time taken by the testsuite.
    ///
    /// This is serialized as the number of seconds.
    pub time: Option<Duration>,

    /// The testcases that form this testsuite.
    pub testcases: Vec<TestCase>,

    /// Custom properties set during test execution, e.g. device identity.
    pub properties: Vec<Property>,

    /// Other fields that may be set as attributes, such as "hostname".
    pub extra: IndexMap<XmlString, XmlString>,
}

impl TestSuite {
    /// Creates a new `TestSuite` with the given name.
    pub fn new(name: impl Into<XmlString>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            time: None,
            testcases: vec![],
            properties: vec![],
            extra: IndexMap::new(),
        }
    }

    /// Sets the start timestamp for the testsuite.
    pub fn set_timestamp(&mut self, timestamp: impl Into<DateTime<FixedOffset>>) -> &mut Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the time taken by the testsuite.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    /// Adds a testcase to this testsuite.
    pub fn add_testcase(&mut self, testcase: TestCase) -> &mut Self {
        self.testcases.push(testcase);
        self
    }

    /// Adds several testcases to this testsuite.
    pub fn add_testcases(&mut self, testcases: impl IntoIterator<Item = TestCase>) -> &mut Self {
        for testcase in testcases {
            self.add_testcase(testcase);
        }
        self
    }

    /// Adds a property to this testsuite.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }

    /// Adds several properties to this testsuite.
    pub fn add_properties(
        &mut self,
        properties: impl IntoIterator<Item = impl Into<Property>>,
    ) -> &mut Self {
        for property in properties {
            self.add_property(property);
        }
        self
    }

    /// The total number of testcases in this suite.
    pub fn tests(&self) -> usize {
        self.testcases.len()
    }

    /// The number of testcases that failed in an expected way.
    pub fn failures(&self) -> usize {
        self.count_non_success(NonSuccessKind::Failure)
    }

    /// The number of testcases that errored in an unexpected way.
    pub fn errors(&self) -> usize {
        self.count_non_success(NonSuccessKind::Error)
    }

    /// The number of testcases that were skipped.
    pub fn skipped(&self) -> usize {
        self.testcases
            .iter()
            .filter(|testcase| matches!(testcase.status, TestCaseStatus::Skipped { .. }))
            .count()
    }

    fn count_non_success(&self, expected: NonSuccessKind) -> usize {
        self.testcases
            .iter()
            .filter(
                |testcase| matches!(testcase.status, TestCaseStatus::NonSuccess { kind, .. } if kind == expected),
            )
            .count()
    }

    /// Serializes this testsuite to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_suite(self, writer)
    }

    /// Serializes this testsuite to a string.
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|utf8_err| quick_xml::Error::from(utf8_err.utf8_error()).into())
    }
}

/// Represents a single testcase.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestCase {
    /// The name of the testcase, typically a method name.
    pub name: XmlString,

    /// The "classname" of the testcase.
    ///
    /// `classname` + `name` together should uniquely identify and locate a
    /// test within a run.
    pub classname: Option<XmlString>,

    /// The time it took to execute this testcase.
    pub time: Option<Duration>,

    /// The status of this test.
    pub status: TestCaseStatus,
}

impl TestCase {
    /// Creates a new testcase.
    pub fn new(name: impl Into<XmlString>, status: TestCaseStatus) -> Self {
        Self {
            name: name.into(),
            classname: None,
            time: None,
            status,
        }
    }

    /// Sets the classname of the test.
    pub fn set_classname(&mut self, classname: impl Into<XmlString>) -> &mut Self {
        self.classname = Some(classname.into());
        self
    }

    /// Sets the time taken by the testcase.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }
}

/// Represents the success or failure of a testcase.
#[derive(Clone, Debug)]
pub enum TestCaseStatus {
    /// This testcase passed.
    Success,

    /// This testcase did not pass.
    NonSuccess {
        /// Whether this testcase failed in an expected way (failure) or an
        /// unexpected way (error).
        kind: NonSuccessKind,

        /// The failure message.
        message: Option<XmlString>,

        /// The "type" of failure that occurred.
        ty: Option<XmlString>,

        /// The description of the failure.
        ///
        /// This is serialized as the text node of the element.
        description: Option<XmlString>,
    },

    /// This testcase was not run.
    Skipped {
        /// The skip message.
        message: Option<XmlString>,

        /// The "type" of skip that occurred.
        ty: Option<XmlString>,

        /// The description of the skip.
        ///
        /// This is serialized as the text node of the element.
        description: Option<XmlString>,
    },
}

impl TestCaseStatus {
    /// Creates a new `TestCaseStatus` that represents a successful test.
    pub fn success() -> Self {
        TestCaseStatus::Success
    }

    /// Creates a new `TestCaseStatus` that represents an unsuccessful test.
    pub fn non_success(kind: NonSuccessKind) -> Self {
        TestCaseStatus::NonSuccess {
            kind,
            message: None,
            ty: None,
            description: None,
        }
    }

    /// Creates a new `TestCaseStatus` that represents a skipped test.
    pub fn skipped() -> Self {
        TestCaseStatus::Skipped {
            message: None,
            ty: None,
            description: None,
        }
    }

    /// Sets the message. No-op if this is a success case.
    pub fn set_message(&mut self, message: impl Into<XmlString>) -> &mut Self {
        let message_mut = match self {
            TestCaseStatus::Success => return self,
            TestCaseStatus::NonSuccess { message, .. } => message,
            TestCaseStatus::Skipped { message, .. } => message,
        };
        *message_mut = Some(message.into());
        self
    }

    /// Sets the type. No-op if this is a success case.
    pub fn set_type(&mut self, ty: impl Into<XmlString>) -> &mut Self {
        let ty_mut = match self {
            TestCaseStatus::Success => return self,
            TestCaseStatus::NonSuccess { ty, .. } => ty,
            TestCaseStatus::Skipped { ty, .. } => ty,
        };
        *ty_mut = Some(ty.into());
        self
    }

    /// Sets the description (text node). No-op if this is a success case.
    pub fn set_description(&mut self, description: impl Into<XmlString>) -> &mut Self {
        let description_mut = match self {
            TestCaseStatus::Success => return self,
            TestCaseStatus::NonSuccess { description, .. } => description,
            TestCaseStatus::Skipped { description, .. } => description,
        };
        *description_mut = Some(description.into());
        self
    }
}

/// Whether a non-successful testcase failed in an expected or unexpected way.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NonSuccessKind {
    /// This is an expected failure, serialized as `failure`.
    Failure,

    /// This is an unexpected error, serialized as `error`.
    Error,
}

/// Custom properties set during test execution, e.g. device identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    /// The name of the property.
    pub name: XmlString,

    /// The value of the property.
    pub value: XmlString,
}

impl Property {
    /// Creates a new `Property` instance.
    pub fn new(name: impl Into<XmlString>, value: impl Into<XmlString>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<T> From<(T, T)> for Property
where
    T: Into<XmlString>,
{
    fn from((k, v): (T, T)) -> Self {
        Property::new(k, v)
    }
}

/// Text suitable for embedding in an XML document.
///
/// Construction strips ANSI escape sequences and non-printable control
/// characters, neither of which can be represented in XML 1.0. Markup
/// characters are left alone; the serializer escapes them.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct XmlString {
    inner: Box<str>,
}

impl XmlString {
    /// Creates a new `XmlString`, sanitizing the input.
    pub fn new(input: impl AsRef<str>) -> Self {
        let stripped = strip_ansi_escapes::strip_str(input.as_ref());
        let inner = stripped
            .replace(
                |c| matches!(c, '\x00'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f'),
                "",
            )
            .into_boxed_str();
        Self { inner }
    }

    /// Returns the sanitized text.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Converts the `XmlString` into a `String`.
    pub fn into_string(self) -> String {
        self.inner.into_string()
    }
}

impl AsRef<str> for XmlString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for XmlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for XmlString {
    fn from(s: &str) -> Self {
        XmlString::new(s)
    }
}

impl From<String> for XmlString {
    fn from(s: String) -> Self {
        XmlString::new(s)
    }
}

impl From<&String> for XmlString {
    fn from(s: &String) -> Self {
        XmlString::new(s)
    }
}

impl From<XmlString> for String {
    fn from(s: XmlString) -> Self {
        s.into_string()
    }
}
