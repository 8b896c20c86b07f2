use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize};

/// Name of the firmware version field, as exposed in validation errors and
/// on the wire.
pub const FIRMWARE_VERSION_FIELD: &str = "FirmwareVersion";

// `JSON` has no representation for NaN and infinities, which are written as
// `null`. A `null` measurement reads back as NaN.
pub(crate) fn nullable_measurement<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// A reading submitted by a device.
///
/// The firmware version is kept as the raw submitted string: a reading is
/// evaluated only after the pipeline has checked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    /// Version of the firmware the device runs.
    #[serde(rename = "FirmwareVersion")]
    #[serde(alias = "firmware_version", alias = "firmwareVersion")]
    pub firmware_version: String,
    /// Temperature, in degrees Celsius.
    #[serde(deserialize_with = "nullable_measurement")]
    pub temperature: f64,
    /// Relative humidity, in percent.
    #[serde(deserialize_with = "nullable_measurement")]
    pub humidity: f64,
    /// Device identifier, if the device reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub device_id: Option<Cow<'static, str>>,
}

impl DeviceReading {
    /// Creates a [`DeviceReading`].
    #[must_use]
    pub fn new(firmware_version: impl Into<String>, temperature: f64, humidity: f64) -> Self {
        Self {
            firmware_version: firmware_version.into(),
            temperature,
            humidity,
            device_id: None,
        }
    }

    /// Sets the device identifier.
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<Cow<'static, str>>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}
