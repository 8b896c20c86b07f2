use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;

use clima::alert::ThresholdEvaluator;
use clima::pipeline::Pipeline;

use axum::{Router, response::Redirect};

use serde::Serialize;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::config::{
    DEFAULT_HTTP_ADDRESS, DEFAULT_READINGS_ROUTE, DEFAULT_SERVER_PORT, ServerConfig,
    validate_route,
};
use crate::error::{Error, ErrorKind, Result};
use crate::ingest::{IngestPipeline, IngestState, SharedEvaluator, SharedSecretStore, ingest};

// Default scheme is `http`.
const DEFAULT_SCHEME: &str = "http";

// Default service name needed to compose a well-known URI.
// https://en.wikipedia.org/wiki/Well-known_URI
const DEFAULT_WELL_KNOWN_SERVICE: &str = "clima";

// Data returned when the server root is requested.
#[derive(Debug, Serialize)]
struct ServiceInfo<'a> {
    name: &'static str,
    version: &'static str,
    readings_route: &'a str,
}

struct ServerData {
    // HTTP address.
    http_address: Ipv4Addr,
    // Server port.
    port: u16,
    // Scheme.
    scheme: &'static str,
    // Well-known service.
    well_known_service: &'static str,
    // Ingestion route.
    readings_route: String,
    // Validation and evaluation pipeline.
    pipeline: IngestPipeline,
}

impl ServerData {
    fn router(self) -> Result<Router> {
        let well_known_uri = format!("/.well-known/{}", self.well_known_service);

        validate_route(&well_known_uri)?;
        validate_route(&self.readings_route)?;
        if self.readings_route == well_known_uri {
            return Err(Error::new(
                ErrorKind::Config,
                format!("The readings route `{well_known_uri}` is reserved"),
            ));
        }

        let info = ServiceInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            readings_route: &self.readings_route,
        };
        // Serializing a struct made of string slices cannot fail.
        let info = serde_json::to_value(info).unwrap_or_default();

        info!("Server route: [GET, \"/\"]");
        info!("Server route: [GET, \"{well_known_uri}\"]");
        info!("Server route: [POST, \"{}\"]", self.readings_route);

        // - Return service information when the server root is requested.
        // - Redirect the well-known URI to the server root.
        // - Accept readings on the ingestion route.
        Ok(Router::new()
            .route(
                "/",
                axum::routing::get(move || {
                    let info = info.clone();
                    async move { axum::Json(info) }
                }),
            )
            .route(
                &well_known_uri,
                axum::routing::get(move || async { Redirect::to("/") }),
            )
            .route(&self.readings_route, axum::routing::post(ingest))
            .with_state(IngestState::new(self.pipeline))
            .layer(TraceLayer::new_for_http()))
    }
}

/// The ingestion server.
pub struct Server {
    data: ServerData,
}

impl Server {
    /// Creates a [`Server`] running the given pipeline.
    #[must_use]
    pub fn new(pipeline: IngestPipeline) -> Self {
        Self {
            data: ServerData {
                http_address: DEFAULT_HTTP_ADDRESS,
                port: DEFAULT_SERVER_PORT,
                scheme: DEFAULT_SCHEME,
                well_known_service: DEFAULT_WELL_KNOWN_SERVICE,
                readings_route: DEFAULT_READINGS_ROUTE.into(),
                pipeline,
            },
        }
    }

    /// Creates a [`Server`] from a [`ServerConfig`].
    ///
    /// The pipeline authorizes the configured secrets and evaluates readings
    /// against the configured thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is not valid.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let secrets: SharedSecretStore = Arc::new(config.secret_store());
        let evaluator: SharedEvaluator = Arc::new(ThresholdEvaluator::new(config.thresholds)?);

        Ok(Self::new(Pipeline::new(secrets, evaluator))
            .address(config.address)
            .port(config.port)
            .readings_route(config.readings_route.clone()))
    }

    /// Sets the server `IPv4` address.
    #[must_use]
    pub const fn address(mut self, http_address: Ipv4Addr) -> Self {
        self.data.http_address = http_address;
        self
    }

    /// Sets the server port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.data.port = port;
        self
    }

    /// Sets the server scheme. i.e. `http`
    #[must_use]
    pub const fn scheme(mut self, scheme: &'static str) -> Self {
        self.data.scheme = scheme;
        self
    }

    /// Sets the service name used to compose the well-known `URI`.
    #[must_use]
    pub const fn well_known_service(mut self, service_name: &'static str) -> Self {
        self.data.well_known_service = service_name;
        self
    }

    /// Sets the route accepting device readings.
    #[must_use]
    pub fn readings_route(mut self, route: impl Into<String>) -> Self {
        self.data.readings_route = route.into();
        self
    }

    /// Builds the [`Router`] without starting the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the readings route or the well-known service
    /// cannot be served as a static path.
    pub fn into_router(self) -> Result<Router> {
        self.data.router()
    }

    /// Transforms the server into a [`GracefulShutdownServer`].
    ///
    /// The [`Future`] passed as input manages the graceful shutdown of
    /// the server.
    #[must_use]
    #[inline]
    pub fn with_graceful_shutdown<F>(self, signal: F) -> GracefulShutdownServer<F>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        GracefulShutdownServer {
            data: self.data,
            signal,
        }
    }

    /// Runs the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the routes are not valid or the server fails to
    /// start.
    pub async fn run(self) -> Result<()> {
        self.with_graceful_shutdown(std::future::pending())
            .run()
            .await
    }
}

/// A server with graceful shutdown.
///
/// Aside from the graceful shutdown functionality, it behaves the same as
/// [`Server`].
pub struct GracefulShutdownServer<F> {
    // Server data.
    data: ServerData,
    // Graceful shutdown signal.
    signal: F,
}

impl<F> GracefulShutdownServer<F>
where
    F: Future<Output = ()> + Send + 'static,
{
    /// Runs the server with graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the routes are not valid or the server fails to
    /// start.
    pub async fn run(self) -> Result<()> {
        // Create listener bind.
        let listener_bind = format!("{}:{}", self.data.http_address, self.data.port);
        let scheme = self.data.scheme;

        let router = self.data.router()?;

        // Create a new TCP socket which responds to the specified HTTP address
        // and port.
        let listener = tokio::net::TcpListener::bind(&listener_bind).await?;

        info!("Server reachable at this address: {scheme}://{listener_bind}");
        info!("Starting server...");

        axum::serve(listener, router)
            .with_graceful_shutdown(self.signal)
            .await?;

        info!("Server stopped");

        Ok(())
    }
}
