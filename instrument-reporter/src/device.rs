// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity of the device a run executed on.

use indexmap::IndexMap;

/// Identity of the device a test run executed on.
///
/// Captured once at run start and immutable for the lifetime of the run; the
/// owning [`RunListener`](crate::listener::RunListener) never queries device
/// state after construction.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    serial: String,
    avd_name: String,
    manufacturer: String,
    model: String,
    properties: IndexMap<String, String>,
}

impl DeviceInfo {
    /// Creates a new `DeviceInfo`.
    ///
    /// `avd_name` is empty for physical hardware. The serial number is
    /// expected to be unique across concurrently running devices.
    pub fn new(
        serial: impl Into<String>,
        avd_name: impl Into<String>,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            avd_name: avd_name.into(),
            manufacturer: manufacturer.into(),
            model: model.into(),
            properties: IndexMap::new(),
        }
    }

    /// Adds an arbitrary device property, e.g. a build fingerprint.
    pub fn add_property(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The device serial number.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// The virtual device name, empty for physical hardware.
    pub fn avd_name(&self) -> &str {
        &self.avd_name
    }

    /// The device manufacturer string.
    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// The device model string.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The open-ended device property map.
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// The directory component reports for this device are written under.
    ///
    /// The serial number is always included: it is the only identity field
    /// guaranteed unique across concurrent runs, so two emulators sharing an
    /// AVD name can never contend for the same report path.
    pub fn report_dir_name(&self) -> String {
        let raw = if self.avd_name.is_empty() {
            self.serial.clone()
        } else {
            format!("{}-{}", self.avd_name, self.serial)
        };
        sanitize_path_component(&raw)
    }

    /// The property entries recorded in every suite of a run on this device.
    ///
    /// Empty identity fields are omitted rather than serialized as empty
    /// properties.
    pub fn report_properties(&self) -> Vec<(String, String)> {
        let mut out = vec![("device.serial".to_owned(), self.serial.clone())];
        if !self.avd_name.is_empty() {
            out.push(("device.avd".to_owned(), self.avd_name.clone()));
        }
        if !self.manufacturer.is_empty() {
            out.push(("device.manufacturer".to_owned(), self.manufacturer.clone()));
        }
        if !self.model.is_empty() {
            out.push(("device.model".to_owned(), self.model.clone()));
        }
        for (name, value) in &self.properties {
            out.push((name.clone(), value.clone()));
        }
        out
    }
}

fn sanitize_path_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("emulator-5554", "", "emulator-5554"; "physical serial unchanged")]
    #[test_case("192.168.1.2:5555", "", "192.168.1.2-5555"; "tcp serial sanitized")]
    #[test_case("emulator-5554", "Pixel_6_API_33", "Pixel_6_API_33-emulator-5554"; "avd prefixed")]
    #[test_case("emulator-5556", "my avd/clone", "my-avd-clone-emulator-5556"; "avd sanitized")]
    fn report_dir_name(serial: &str, avd_name: &str, expected: &str) {
        let device = DeviceInfo::new(serial, avd_name, "Google", "Pixel 6");
        assert_eq!(device.report_dir_name(), expected);
    }

    #[test]
    fn report_properties_omit_empty_fields() {
        let mut device = DeviceInfo::new("emulator-5554", "", "", "sdk_gphone64_x86_64");
        device.add_property("ro.build.version.sdk", "33");

        assert_eq!(
            device.report_properties(),
            vec![
                ("device.serial".to_owned(), "emulator-5554".to_owned()),
                ("device.model".to_owned(), "sdk_gphone64_x86_64".to_owned()),
                ("ro.build.version.sdk".to_owned(), "33".to_owned()),
            ]
        );
    }
}
