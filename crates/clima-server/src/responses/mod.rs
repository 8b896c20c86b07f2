/// Responses refusing a request.
pub mod error;

use clima::pipeline::Outcome;

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use self::error::{ErrorResponse, ValidationProblem};

/// The response to a submitted reading.
///
/// - [`Outcome::Unauthorized`] becomes `401 Unauthorized`
/// - [`Outcome::Malformed`] becomes `400 Bad Request` with a
///   [`ValidationProblem`] body
/// - [`Outcome::Evaluated`] becomes `200 OK` with the alerts, possibly none,
///   as body
#[derive(Debug)]
pub struct IngestResponse(Outcome);

impl IngestResponse {
    /// Returns the wrapped [`Outcome`].
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.0
    }
}

impl From<Outcome> for IngestResponse {
    fn from(outcome: Outcome) -> Self {
        Self(outcome)
    }
}

impl IntoResponse for IngestResponse {
    fn into_response(self) -> Response {
        match self.0 {
            Outcome::Unauthorized => ErrorResponse::unauthorized().into_response(),
            Outcome::Malformed(errors) => ValidationProblem::new(errors).into_response(),
            Outcome::Evaluated(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clima::alert::{Alert, AlertKind, Limits};
    use clima::pipeline::Outcome;
    use clima::validation::ValidationErrors;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::IngestResponse;

    #[test]
    fn status_codes() {
        let cases = [
            (Outcome::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                Outcome::Malformed(ValidationErrors::field("FirmwareVersion", "Invalid.")),
                StatusCode::BAD_REQUEST,
            ),
            (Outcome::Evaluated(Vec::new()), StatusCode::OK),
            (
                Outcome::Evaluated(vec![Alert::new(
                    AlertKind::TemperatureOutOfRange,
                    40.,
                    Limits::at_most(30.),
                )]),
                StatusCode::OK,
            ),
        ];

        for (outcome, status) in cases {
            let response = IngestResponse::from(outcome.clone());
            assert_eq!(response.outcome(), &outcome);

            let response = response.into_response();
            assert_eq!(response.status(), status);
        }
    }
}
