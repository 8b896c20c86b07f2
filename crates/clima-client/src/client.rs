use std::borrow::Cow;

use clima::reading::DeviceReading;
use clima::secret::DeviceSecret;

use tracing::{debug, warn};

use crate::error::Result;
use crate::response::Response;

// Header carrying the device secret.
const SECRET_HEADER: &str = "x-device-secret";

// Default ingestion route.
const DEFAULT_READINGS_ROUTE: &str = "/readings";

fn slash_end(s: &str) -> &str {
    if s.len() > 1 && s.ends_with('/') {
        &s[..s.len() - 1]
    } else {
        s
    }
}

fn slash_start(s: &str) -> &str {
    if s.len() > 1 && s.starts_with('/') {
        &s[1..]
    } else {
        s
    }
}

fn build_readings_url(address: &str, route: &str) -> String {
    format!("{}/{}", slash_end(address), slash_start(slash_end(route)))
}

/// A client submitting the readings of a single device.
///
/// The secret, firmware version and device identifier are attached to every
/// reading the client sends.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    address: String,
    readings_route: Cow<'static, str>,
    secret: DeviceSecret,
    firmware_version: String,
    device_id: Option<Cow<'static, str>>,
}

impl Client {
    /// Creates a [`Client`] for the server at the given address,
    /// i.e. `http://192.168.1.10:3000`.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        secret: impl Into<DeviceSecret>,
        firmware_version: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            address: address.into(),
            readings_route: Cow::Borrowed(DEFAULT_READINGS_ROUTE),
            secret: secret.into(),
            firmware_version: firmware_version.into(),
            device_id: None,
        }
    }

    /// Sets the server route accepting readings.
    #[must_use]
    pub fn readings_route(mut self, route: impl Into<Cow<'static, str>>) -> Self {
        self.readings_route = route.into();
        self
    }

    /// Sets the identifier reported with every reading.
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<Cow<'static, str>>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Changes the firmware version, for example after an update.
    pub fn set_firmware_version(&mut self, firmware_version: impl Into<String>) {
        self.firmware_version = firmware_version.into();
    }

    /// Returns the firmware version sent with readings.
    #[must_use]
    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// Returns the complete ingestion `URL`.
    #[must_use]
    pub fn readings_url(&self) -> String {
        build_readings_url(&self.address, &self.readings_route)
    }

    /// Builds the [`DeviceReading`] for the given measurements.
    #[must_use]
    pub fn reading(&self, temperature: f64, humidity: f64) -> DeviceReading {
        let reading = DeviceReading::new(self.firmware_version.clone(), temperature, humidity);
        match &self.device_id {
            Some(device_id) => reading.device_id(device_id.clone()),
            None => reading,
        }
    }

    /// Sends a temperature and humidity reading.
    ///
    /// # Errors
    ///
    /// Returns an error when the server cannot be reached, or answers with a
    /// response the client does not understand.
    pub async fn send(&self, temperature: f64, humidity: f64) -> Result<Response> {
        self.send_reading(&self.reading(temperature, humidity))
            .await
    }

    /// Sends a complete [`DeviceReading`].
    ///
    /// # Errors
    ///
    /// Returns an error when the server cannot be reached, or answers with a
    /// response the client does not understand.
    pub async fn send_reading(&self, reading: &DeviceReading) -> Result<Response> {
        let url = self.readings_url();
        debug!("Sending reading to `{url}`");

        let response = self
            .http
            .post(url)
            .header(SECRET_HEADER, self.secret.expose())
            .json(reading)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        let response = Response::parse(status, &body)?;
        match &response {
            Response::Unauthorized => warn!("The device secret was rejected"),
            Response::FirmwareRejected(_) => {
                warn!("Firmware `{}` must be updated", reading.firmware_version);
            }
            Response::Alerts(alerts) => debug!("Reading evaluated with {} alerts", alerts.len()),
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;

    use clima::alert::{AlertKind, Limits, ThresholdEvaluator, Thresholds};
    use clima::pipeline::Pipeline;
    use clima::secret::Secrets;

    use clima_server::ingest::{SharedEvaluator, SharedSecretStore};
    use clima_server::server::Server;

    use serial_test::serial;

    use tokio::sync::oneshot;

    use crate::error::ErrorKind;
    use crate::response::Response;

    use super::{Client, build_readings_url};

    const PORT: u16 = 3517;

    fn address() -> String {
        format!("http://{}", SocketAddr::from((Ipv4Addr::LOCALHOST, PORT)))
    }

    async fn with_server<F, Fut>(function: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let thresholds = Thresholds::new()
            .temperature(Limits::new(10., 30.))
            .humidity(Limits::new(20., 80.));

        let secrets: SharedSecretStore = Arc::new(Secrets::new().insert("valid-secret"));
        let evaluator: SharedEvaluator = Arc::new(ThresholdEvaluator::new(thresholds).unwrap());

        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(
            Server::new(Pipeline::new(secrets, evaluator))
                .address(Ipv4Addr::LOCALHOST)
                .port(PORT)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .run(),
        );

        // Wait for the server to accept connections.
        for _ in 0..50 {
            if tokio::net::TcpStream::connect((Ipv4Addr::LOCALHOST, PORT))
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        function().await;

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[test]
    fn readings_url() {
        assert_eq!(
            build_readings_url("http://localhost:3000", "/readings"),
            "http://localhost:3000/readings"
        );
        assert_eq!(
            build_readings_url("http://localhost:3000/", "/api/readings/"),
            "http://localhost:3000/api/readings"
        );

        let client = Client::new("http://10.0.0.2:3000", "secret", "1.0.0").readings_route("ingest");
        assert_eq!(client.readings_url(), "http://10.0.0.2:3000/ingest");
    }

    #[test]
    fn reading_metadata() {
        let client = Client::new(address(), "secret", "1.0.0").device_id("greenhouse-3");

        let reading = client.reading(21., 45.);
        assert_eq!(reading.firmware_version, "1.0.0");
        assert_eq!(reading.device_id.as_deref(), Some("greenhouse-3"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn client_against_server() {
        with_server(|| async {
            let client = Client::new(address(), "valid-secret", "1.2.3").device_id("greenhouse-3");

            // Nominal reading.
            assert_eq!(client.send(21., 45.).await.unwrap(), Response::Alerts(Vec::new()));

            // Hot and humid.
            let response = client.send(35., 85.).await.unwrap();
            let kinds: Vec<_> = response.alerts().unwrap().iter().map(|a| a.kind).collect();
            assert_eq!(
                kinds,
                [AlertKind::TemperatureOutOfRange, AlertKind::HumidityOutOfRange]
            );

            // Same reading, same answer.
            assert_eq!(client.send(35., 85.).await.unwrap(), response);
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn outdated_firmware() {
        with_server(|| async {
            let mut client = Client::new(address(), "valid-secret", "1.2");

            let response = client.send(21., 45.).await.unwrap();
            assert!(response.requires_firmware_update());
            if let Response::FirmwareRejected(errors) = response {
                assert!(errors.contains("FirmwareVersion"));
            }

            // After the update, readings are accepted again.
            client.set_firmware_version("1.3.0");
            assert_eq!(client.firmware_version(), "1.3.0");
            assert_eq!(client.send(21., 45.).await.unwrap(), Response::Alerts(Vec::new()));
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn faulty_sensor() {
        with_server(|| async {
            // An outdated device is told to update whatever it measures.
            let client = Client::new(address(), "valid-secret", "1.2");
            let response = client.send(f64::NAN, 45.).await.unwrap();
            assert!(response.requires_firmware_update());

            let client = Client::new(address(), "valid-secret", "1.2.3");
            let response = client.send(21., f64::NAN).await.unwrap();

            let alerts = response.alerts().unwrap();
            let kinds: Vec<_> = alerts.iter().map(|a| a.kind).collect();
            assert_eq!(
                kinds,
                [AlertKind::HumidityOutOfRange, AlertKind::HumidityImplausible]
            );
            assert!(alerts.iter().all(|a| a.value.is_nan()));
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn unauthorized_device() {
        with_server(|| async {
            for firmware in ["1.2.3", "1.2"] {
                let client = Client::new(address(), "bad", firmware);
                assert_eq!(client.send(21., 45.).await.unwrap(), Response::Unauthorized);
            }
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn unreachable_server() {
        let client = Client::new(address(), "valid-secret", "1.2.3");

        let error = client.send(21., 45.).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Request);
    }
}
