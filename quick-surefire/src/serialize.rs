// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `TestSuite`.

use crate::{
    NonSuccessKind, Property, TestCase, TestCaseStatus, TestSuite, XmlString,
    errors::SerializeError,
};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::{io, time::Duration};

static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static PROPERTIES_TAG: &str = "properties";
static PROPERTY_TAG: &str = "property";
static FAILURE_TAG: &str = "failure";
static ERROR_TAG: &str = "error";
static SKIPPED_TAG: &str = "skipped";

pub(crate) fn serialize_suite(
    suite: &TestSuite,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', 4);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    serialize_suite_impl(suite, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent()?;
    Ok(())
}

fn serialize_suite_impl(
    suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // The counts are derived before destructuring so the attribute values can
    // never disagree with the serialized case list.
    let tests = suite.tests();
    let failures = suite.failures();
    let errors = suite.errors();
    let skipped = suite.skipped();

    // Use the destructuring syntax to ensure that all fields are handled.
    let TestSuite {
        name,
        timestamp,
        time,
        testcases,
        properties,
        extra,
    } = suite;

    let mut testsuite_tag = BytesStart::new(TESTSUITE_TAG);
    testsuite_tag.extend_attributes([
        ("name", name.as_str()),
        ("tests", tests.to_string().as_str()),
        ("failures", failures.to_string().as_str()),
        ("errors", errors.to_string().as_str()),
        ("skipped", skipped.to_string().as_str()),
    ]);
    if let Some(time) = time {
        testsuite_tag.push_attribute(("time", serialize_time(time).as_str()));
    }
    if let Some(timestamp) = timestamp {
        testsuite_tag.push_attribute(("timestamp", format!("{}", timestamp.format("%+")).as_str()));
    }
    for (k, v) in extra {
        testsuite_tag.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(testsuite_tag))?;

    if !properties.is_empty() {
        serialize_empty_start_tag(PROPERTIES_TAG, writer)?;
        for property in properties {
            serialize_property(property, writer)?;
        }
        serialize_end_tag(PROPERTIES_TAG, writer)?;
    }

    for testcase in testcases {
        serialize_testcase(testcase, writer)?;
    }

    serialize_end_tag(TESTSUITE_TAG, writer)?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

fn serialize_property(
    property: &Property,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let mut property_tag = BytesStart::new(PROPERTY_TAG);
    property_tag.extend_attributes([
        ("name", property.name.as_str()),
        ("value", property.value.as_str()),
    ]);

    writer.write_event(Event::Empty(property_tag))?;
    Ok(())
}

fn serialize_testcase(
    testcase: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestCase {
        name,
        classname,
        time,
        status,
    } = testcase;

    let mut testcase_tag = BytesStart::new(TESTCASE_TAG);
    testcase_tag.push_attribute(("name", name.as_str()));
    if let Some(classname) = classname {
        testcase_tag.push_attribute(("classname", classname.as_str()));
    }
    if let Some(time) = time {
        testcase_tag.push_attribute(("time", serialize_time(time).as_str()));
    }

    // A passed case has no children: serialize it as an empty element.
    if matches!(status, TestCaseStatus::Success) {
        writer.write_event(Event::Empty(testcase_tag))?;
        return Ok(());
    }
    writer.write_event(Event::Start(testcase_tag))?;

    match status {
        TestCaseStatus::Success => {}
        TestCaseStatus::NonSuccess {
            kind,
            message,
            ty,
            description,
        } => {
            let tag_name = match kind {
                NonSuccessKind::Failure => FAILURE_TAG,
                NonSuccessKind::Error => ERROR_TAG,
            };
            serialize_status(
                message.as_ref(),
                ty.as_ref(),
                description.as_ref(),
                tag_name,
                writer,
            )?;
        }
        TestCaseStatus::Skipped {
            message,
            ty,
            description,
        } => {
            serialize_status(
                message.as_ref(),
                ty.as_ref(),
                description.as_ref(),
                SKIPPED_TAG,
                writer,
            )?;
        }
    }

    serialize_end_tag(TESTCASE_TAG, writer)?;

    Ok(())
}

fn serialize_status(
    message: Option<&XmlString>,
    ty: Option<&XmlString>,
    description: Option<&XmlString>,
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let mut tag = BytesStart::new(tag_name);
    if let Some(message) = message {
        tag.push_attribute(("message", message.as_str()));
    }
    if let Some(ty) = ty {
        tag.push_attribute(("type", ty.as_str()));
    }

    match description {
        Some(description) => {
            writer.write_event(Event::Start(tag))?;
            writer.write_event(Event::Text(BytesText::new(description.as_str())))?;
            serialize_end_tag(tag_name, writer)?;
        }
        None => {
            writer.write_event(Event::Empty(tag))?;
        }
    }

    Ok(())
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let tag = BytesStart::new(tag_name);
    writer.write_event(Event::Start(tag))?;
    Ok(())
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let end_tag = BytesEnd::new(tag_name);
    writer.write_event(Event::End(end_tag))?;
    Ok(())
}

// Serialize time as seconds with 3 decimal points.
fn serialize_time(time: &Duration) -> String {
    format!("{:.3}", time.as_secs_f64())
}
