//! `clima-client` is a library for devices submitting their readings to a
//! `clima` ingestion server.
//!
//! A [`client::Client`] is bound to one device: it knows the device secret,
//! the firmware version and, optionally, the device identifier, and attaches
//! them to every reading.
//!
//! The server answer is returned as a [`response::Response`]. When it is
//! [`response::Response::FirmwareRejected`], the running firmware version is
//! no longer accepted and the device should start its update procedure
//! before submitting further readings.

#![deny(unsafe_code)]
#![deny(missing_docs)]

/// The device client.
pub mod client;
/// Error management.
pub mod error;
/// Server responses.
pub mod response;
