use clima::alert::Alert;
use clima::reading::FIRMWARE_VERSION_FIELD;
use clima::validation::ValidationErrors;

use reqwest::StatusCode;

use serde::Deserialize;

use tracing::warn;

use crate::error::{Error, ErrorKind, Result};

// Body of a `400 Bad Request` response.
#[derive(Deserialize)]
struct ValidationProblem {
    errors: ValidationErrors,
}

/// The server answer to a submitted reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The reading was evaluated. An empty list means the reading is nominal.
    Alerts(Vec<Alert>),
    /// The firmware version of the device was rejected.
    ///
    /// The device should update its firmware before sending other readings.
    FirmwareRejected(ValidationErrors),
    /// The device secret was rejected.
    Unauthorized,
}

impl Response {
    /// Whether the device must update its firmware.
    #[must_use]
    pub const fn requires_firmware_update(&self) -> bool {
        matches!(self, Self::FirmwareRejected(_))
    }

    /// Returns the alerts of an evaluated reading.
    #[must_use]
    pub fn alerts(&self) -> Option<&[Alert]> {
        match self {
            Self::Alerts(alerts) => Some(alerts),
            _ => None,
        }
    }

    pub(crate) fn parse(status: StatusCode, body: &[u8]) -> Result<Self> {
        match status {
            StatusCode::OK => Ok(Self::Alerts(serde_json::from_slice(body)?)),
            StatusCode::UNAUTHORIZED => Ok(Self::Unauthorized),
            StatusCode::BAD_REQUEST => match serde_json::from_slice::<ValidationProblem>(body) {
                Ok(problem) if problem.errors.contains(FIRMWARE_VERSION_FIELD) => {
                    warn!("Firmware version rejected: {}", problem.errors);
                    Ok(Self::FirmwareRejected(problem.errors))
                }
                Ok(problem) => Err(Error::new(
                    ErrorKind::UnexpectedStatus,
                    format!("Reading rejected: {}", problem.errors),
                )),
                Err(_) => Err(Error::new(
                    ErrorKind::UnexpectedStatus,
                    format!(
                        "Reading rejected: {}",
                        String::from_utf8_lossy(body)
                    ),
                )),
            },
            status => Err(Error::new(
                ErrorKind::UnexpectedStatus,
                format!(
                    "Unexpected status `{status}`: {}",
                    String::from_utf8_lossy(body)
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use clima::alert::{Alert, AlertKind, Limits};
    use clima::validation::ValidationErrors;

    use reqwest::StatusCode;

    use serde_json::json;

    use crate::error::ErrorKind;

    use super::Response;

    fn parse(status: StatusCode, body: serde_json::Value) -> crate::error::Result<Response> {
        Response::parse(status, body.to_string().as_bytes())
    }

    #[test]
    fn alerts() {
        assert_eq!(
            parse(StatusCode::OK, json!([])).unwrap(),
            Response::Alerts(Vec::new())
        );

        let response = parse(
            StatusCode::OK,
            json!([{
                "kind": "humidity-implausible",
                "value": 104.0,
                "limits": { "min": 0.0, "max": 100.0 },
            }]),
        )
        .unwrap();

        assert_eq!(
            response.alerts().unwrap(),
            [Alert::new(
                AlertKind::HumidityImplausible,
                104.,
                Limits::new(0., 100.)
            )]
        );
        assert!(!response.requires_firmware_update());
    }

    #[test]
    fn firmware_rejected() {
        let response = parse(
            StatusCode::BAD_REQUEST,
            json!({
                "title": "One or more validation errors occurred.",
                "status": 400,
                "errors": { "FirmwareVersion": ["Invalid."] },
            }),
        )
        .unwrap();

        assert_eq!(
            response,
            Response::FirmwareRejected(ValidationErrors::field("FirmwareVersion", "Invalid."))
        );
        assert!(response.requires_firmware_update());
        assert_eq!(response.alerts(), None);
    }

    #[test]
    fn unauthorized() {
        let response = parse(
            StatusCode::UNAUTHORIZED,
            json!({ "error": "Unauthorized", "code": "UNAUTHORIZED" }),
        )
        .unwrap();

        assert_eq!(response, Response::Unauthorized);
        assert!(!response.requires_firmware_update());
    }

    #[test]
    fn unexpected_responses() {
        let error = parse(
            StatusCode::BAD_REQUEST,
            json!({ "errors": { "Temperature": ["Missing."] } }),
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnexpectedStatus);

        // Plain-text body, as sent on a JSON syntax error.
        let error = Response::parse(
            StatusCode::BAD_REQUEST,
            b"Failed to parse the request body as JSON",
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnexpectedStatus);

        let error = parse(StatusCode::INTERNAL_SERVER_ERROR, json!("boom")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnexpectedStatus);

        let error = parse(StatusCode::OK, json!({ "not": "alerts" })).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::JsonResponse);
    }
}
