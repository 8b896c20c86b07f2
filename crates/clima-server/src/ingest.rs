use std::sync::Arc;

use clima::alert::AlertEvaluator;
use clima::pipeline::{Outcome, Pipeline, Submission};
use clima::reading::DeviceReading;
use clima::secret::SecretStore;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use tracing::{info, warn};

use crate::responses::IngestResponse;

/// Header carrying the device secret.
pub const SECRET_HEADER: &str = "x-device-secret";

/// A secret store shared between requests.
pub type SharedSecretStore = Arc<dyn SecretStore + Send + Sync>;

/// An alert evaluator shared between requests.
pub type SharedEvaluator = Arc<dyn AlertEvaluator + Send + Sync>;

/// The pipeline run by the ingestion route.
pub type IngestPipeline = Pipeline<SharedSecretStore, SharedEvaluator>;

#[derive(Clone)]
pub(crate) struct IngestState {
    pipeline: Arc<IngestPipeline>,
}

impl IngestState {
    pub(crate) fn new(pipeline: IngestPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

// A missing or non-UTF-8 header counts as an empty secret, which no store
// authorizes.
fn presented_secret(headers: &HeaderMap) -> &str {
    headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

// Device identifiers are escaped before being logged.
fn device_label(device_id: Option<&str>) -> String {
    format!("{:?}", device_id.unwrap_or_default())
}

pub(crate) async fn ingest(
    State(state): State<IngestState>,
    headers: HeaderMap,
    payload: Result<Json<DeviceReading>, JsonRejection>,
) -> Response {
    let secret = presented_secret(&headers);

    // Body binding errors are only reported to authorized devices.
    if !state.pipeline.secrets().is_authorized(secret) {
        warn!("Rejected reading: unauthorized device");
        return IngestResponse::from(Outcome::Unauthorized).into_response();
    }

    let reading = match payload {
        Ok(Json(reading)) => reading,
        Err(rejection) => {
            warn!("Rejected reading: {}", rejection.body_text().escape_debug());
            return rejection.into_response();
        }
    };

    let device = device_label(reading.device_id.as_deref());
    let submission = Submission::new(secret, reading);

    let outcome = state.pipeline.process(&submission);
    match &outcome {
        Outcome::Unauthorized => warn!("Rejected reading from {device}: unauthorized device"),
        Outcome::Malformed(errors) => warn!("Rejected reading from {device}: {errors}"),
        Outcome::Evaluated(alerts) if alerts.is_empty() => {
            info!("Nominal reading from {device}");
        }
        Outcome::Evaluated(alerts) => {
            for alert in alerts {
                warn!("Alert from {device}: {} ({})", alert.kind, alert.value);
            }
        }
    }

    IngestResponse::from(outcome).into_response()
}
