use std::borrow::Cow;

use log::debug;

use serde::{Deserialize, Serialize};

use crate::reading::{DeviceReading, nullable_measurement};

// Physical bounds of a relative humidity value, in percent.
const RELATIVE_HUMIDITY: Limits = Limits::new(0., 100.);

/// An inclusive range with optional bounds.
///
/// An absent bound leaves that side of the range open. A value equal to a
/// bound is inside the range, while a non-finite value is always outside.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Limits {
    /// Lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub min: Option<f64>,
    /// Upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub max: Option<f64>,
}

impl Limits {
    /// Creates [`Limits`] with both bounds.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Creates [`Limits`] without any bound.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Creates [`Limits`] with only a lower bound.
    #[must_use]
    pub const fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Creates [`Limits`] with only an upper bound.
    #[must_use]
    pub const fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Whether no bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Whether `value` lies inside the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    fn validate(&self, quantity: &'static str) -> Result<(), InvalidThresholds> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(InvalidThresholds::new(format!(
                    "{quantity} bound `{bound}` is not a finite number"
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(InvalidThresholds::new(format!(
                "{quantity} lower bound `{min}` is greater than the upper bound `{max}`"
            )));
        }

        Ok(())
    }
}

/// An invalid [`Thresholds`] configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidThresholds {
    description: Cow<'static, str>,
}

impl InvalidThresholds {
    fn new(description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl std::fmt::Display for InvalidThresholds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid thresholds: {}", self.description)
    }
}

impl std::error::Error for InvalidThresholds {}

/// Alert thresholds for every measured quantity.
///
/// Thresholds come from configuration. By default no bound is set, so the
/// only active rule is the relative humidity consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    /// Temperature range, in degrees Celsius.
    #[serde(default)]
    pub temperature: Limits,
    /// Relative humidity range, in percent.
    #[serde(default)]
    pub humidity: Limits,
}

impl Thresholds {
    /// Creates [`Thresholds`] without any bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            temperature: Limits::unbounded(),
            humidity: Limits::unbounded(),
        }
    }

    /// Sets the temperature range.
    #[must_use]
    pub const fn temperature(mut self, limits: Limits) -> Self {
        self.temperature = limits;
        self
    }

    /// Sets the relative humidity range.
    #[must_use]
    pub const fn humidity(mut self, limits: Limits) -> Self {
        self.humidity = limits;
        self
    }

    /// Checks that every bound is finite and that no lower bound exceeds its
    /// upper bound.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistent range.
    pub fn validate(&self) -> Result<(), InvalidThresholds> {
        self.temperature.validate("temperature")?;
        self.humidity.validate("humidity")
    }
}

/// The kind of an [`Alert`].
///
/// Each kind is produced by exactly one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// The temperature is outside the configured range.
    TemperatureOutOfRange,
    /// The relative humidity is outside the configured range.
    HumidityOutOfRange,
    /// The relative humidity is outside its physical range, which usually
    /// points to a faulty sensor.
    HumidityImplausible,
}

impl AlertKind {
    const fn description(self) -> &'static str {
        match self {
            Self::TemperatureOutOfRange => "Temperature out of range",
            Self::HumidityOutOfRange => "Humidity out of range",
            Self::HumidityImplausible => "Implausible humidity",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// An alert raised by a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert kind.
    pub kind: AlertKind,
    /// The measured value which triggered the alert.
    #[serde(deserialize_with = "nullable_measurement")]
    pub value: f64,
    /// The range the value falls outside of.
    pub limits: Limits,
    /// Identifier of the device which sent the reading.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub device_id: Option<Cow<'static, str>>,
}

impl Alert {
    /// Creates an [`Alert`].
    #[must_use]
    pub const fn new(kind: AlertKind, value: f64, limits: Limits) -> Self {
        Self {
            kind,
            value,
            limits,
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

/// Turns a validated reading into alerts.
///
/// Implementations must be pure with respect to the reading: evaluating the
/// same reading twice yields the same alerts, in the same order. An empty
/// sequence means the reading is nominal.
pub trait AlertEvaluator {
    /// Evaluates a reading.
    fn evaluate(&self, reading: &DeviceReading) -> Vec<Alert>;
}

impl<T: AlertEvaluator + ?Sized> AlertEvaluator for &T {
    fn evaluate(&self, reading: &DeviceReading) -> Vec<Alert> {
        (**self).evaluate(reading)
    }
}

impl<T: AlertEvaluator + ?Sized> AlertEvaluator for std::sync::Arc<T> {
    fn evaluate(&self, reading: &DeviceReading) -> Vec<Alert> {
        (**self).evaluate(reading)
    }
}

impl<T: AlertEvaluator + ?Sized> AlertEvaluator for Box<T> {
    fn evaluate(&self, reading: &DeviceReading) -> Vec<Alert> {
        (**self).evaluate(reading)
    }
}

// A single rule: the quantity it reads, the range it enforces and the kind
// of alert it raises.
struct Rule {
    kind: AlertKind,
    value: f64,
    limits: Limits,
}

impl Rule {
    fn check(self) -> Option<Alert> {
        if self.limits.contains(self.value) {
            None
        } else {
            Some(Alert::new(self.kind, self.value, self.limits))
        }
    }
}

/// An [`AlertEvaluator`] comparing each measured quantity against
/// [`Thresholds`].
///
/// Rules run in a fixed order, each at most once per reading:
///
/// 1. temperature against [`Thresholds::temperature`]
/// 2. humidity against [`Thresholds::humidity`]
/// 3. humidity against its physical range, from 0 to 100 percent
///
/// A rule whose range has no bound never fires.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThresholdEvaluator {
    thresholds: Thresholds,
}

impl ThresholdEvaluator {
    /// Creates a [`ThresholdEvaluator`].
    ///
    /// # Errors
    ///
    /// Returns an error if the thresholds are inconsistent.
    pub fn new(thresholds: Thresholds) -> Result<Self, InvalidThresholds> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// Returns the thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn rules(&self, reading: &DeviceReading) -> [Rule; 3] {
        [
            Rule {
                kind: AlertKind::TemperatureOutOfRange,
                value: reading.temperature,
                limits: self.thresholds.temperature,
            },
            Rule {
                kind: AlertKind::HumidityOutOfRange,
                value: reading.humidity,
                limits: self.thresholds.humidity,
            },
            Rule {
                kind: AlertKind::HumidityImplausible,
                value: reading.humidity,
                limits: RELATIVE_HUMIDITY,
            },
        ]
    }
}

impl AlertEvaluator for ThresholdEvaluator {
    fn evaluate(&self, reading: &DeviceReading) -> Vec<Alert> {
        self.rules(reading)
            .into_iter()
            .filter(|rule| !rule.limits.is_unbounded())
            .filter_map(Rule::check)
            .map(|alert| match &reading.device_id {
                Some(device_id) => alert.device_id(device_id.clone()),
                None => alert,
            })
            .inspect(|alert| debug!("{}: {}", alert.kind, alert.value))
            .collect()
    }
}
