//! `clima-server` exposes the `clima` pipeline over `HTTP`.
//!
//! Devices post their readings to a single ingestion route, passing their
//! secret in the `x-device-secret` header. Each reading goes through the
//! `clima` gates and, if accepted, through the alert evaluator. The outcome
//! is mapped to a response as follows:
//!
//! - an unauthorized secret yields `401 Unauthorized`
//! - a malformed firmware version yields `400 Bad Request`, with a
//!   validation error attached to the `FirmwareVersion` field
//! - an evaluated reading yields `200 OK`, with the possibly empty list of
//!   alerts as body
//!
//! A device receiving the `400` response knows its firmware version is no
//! longer accepted and can start its own update procedure.
//!
//! The server is configured either programmatically, through [`server::Server`]
//! builder methods, or from a `JSON` file through [`config::ServerConfig`].

#![deny(unsafe_code)]
#![deny(missing_docs)]

/// Server configuration.
pub mod config;
/// Error management.
pub mod error;
/// The ingestion route.
pub mod ingest;
/// Responses returned by the ingestion route.
pub mod responses;
/// The ingestion server.
pub mod server;
