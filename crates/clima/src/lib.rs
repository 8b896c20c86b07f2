//! `clima` is the decision core of a climate-monitoring ingestion service.
//!
//! A device submits a reading together with a shared secret and the version
//! of the firmware it runs. Before any reading is looked at, the submission
//! goes through two gates, always in the same order:
//!
//! 1. the device secret is checked against a [`secret::SecretStore`];
//! 2. the firmware version must be a well-formed `SemVer 2.0.0` string.
//!
//! Only when both gates accept the submission is the reading handed to an
//! [`alert::AlertEvaluator`], which turns it into zero or more alerts.
//!
//! The outcome of a submission is one of three states described by
//! [`pipeline::Outcome`]. Presenting that outcome to a caller, for example as
//! an `HTTP` response, is left to the transport layer.
//!
//! This crate performs no I/O and holds no mutable state, so a single
//! [`pipeline::Pipeline`] can be shared by any number of workers.

#![deny(unsafe_code)]
#![deny(missing_docs)]

/// Alert definitions and the threshold-based evaluator.
pub mod alert;
/// Firmware version validation.
pub mod firmware;
/// The ordered validation gates and their outcomes.
pub mod pipeline;
/// Device readings.
pub mod reading;
/// Device secret validation.
pub mod secret;
/// Field-attributed validation errors.
pub mod validation;

#[cfg(test)]
pub(crate) fn serialize<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[cfg(test)]
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}
