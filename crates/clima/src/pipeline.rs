use log::{debug, warn};

use crate::alert::{Alert, AlertEvaluator};
use crate::firmware::FirmwareVersion;
use crate::reading::{DeviceReading, FIRMWARE_VERSION_FIELD};
use crate::secret::{DeviceSecret, SecretStore};
use crate::validation::ValidationErrors;

// Gates run in this order. The first rejection ends the processing.
const GATES: [Gate; 2] = [Gate::Secret, Gate::Firmware];

/// A device submission: the presented secret and the reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Secret presented by the device.
    pub secret: DeviceSecret,
    /// Submitted reading.
    pub reading: DeviceReading,
}

impl Submission {
    /// Creates a [`Submission`].
    #[must_use]
    pub fn new(secret: impl Into<DeviceSecret>, reading: DeviceReading) -> Self {
        Self {
            secret: secret.into(),
            reading,
        }
    }
}

/// A validation stage preceding the evaluation of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The device secret must be authorized.
    Secret,
    /// The firmware version must be a well-formed semantic version.
    Firmware,
}

impl Gate {
    const fn description(self) -> &'static str {
        match self {
            Self::Secret => "Secret",
            Self::Firmware => "Firmware",
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Why a gate stopped a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The presented secret is not authorized.
    Unauthorized,
    /// The submission is not well-formed.
    Malformed(ValidationErrors),
}

/// The result of a single gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The submission proceeds to the next stage.
    Continue,
    /// The submission is stopped.
    Reject(Rejection),
}

/// The final state of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The device secret was rejected. Nothing else was checked.
    Unauthorized,
    /// The device is authorized but its firmware version is malformed.
    ///
    /// Errors are keyed by [`FIRMWARE_VERSION_FIELD`], which lets a device
    /// running outdated firmware tell this case apart from any other failure
    /// and start its update procedure.
    Malformed(ValidationErrors),
    /// Both gates passed and the reading was evaluated.
    ///
    /// An empty sequence means the reading is nominal.
    Evaluated(Vec<Alert>),
}

impl Outcome {
    /// Whether the device secret was rejected.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns the validation errors of a malformed submission.
    #[must_use]
    pub const fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Malformed(errors) => Some(errors),
            _ => None,
        }
    }

    /// Returns the alerts of an evaluated submission.
    #[must_use]
    pub fn alerts(&self) -> Option<&[Alert]> {
        match self {
            Self::Evaluated(alerts) => Some(alerts),
            _ => None,
        }
    }
}

impl From<Rejection> for Outcome {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Unauthorized => Self::Unauthorized,
            Rejection::Malformed(errors) => Self::Malformed(errors),
        }
    }
}

/// Runs submissions through the validation gates and, when they all pass,
/// through the alert evaluator.
///
/// A [`Pipeline`] holds no mutable state: it can be shared between workers
/// and processing the same submission twice yields the same outcome.
#[derive(Debug, Clone)]
pub struct Pipeline<S, E> {
    secrets: S,
    evaluator: E,
}

impl<S, E> Pipeline<S, E>
where
    S: SecretStore,
    E: AlertEvaluator,
{
    /// Creates a [`Pipeline`] from a secret store and an evaluator.
    pub const fn new(secrets: S, evaluator: E) -> Self {
        Self { secrets, evaluator }
    }

    /// Returns the secret store.
    pub const fn secrets(&self) -> &S {
        &self.secrets
    }

    /// Returns the alert evaluator.
    pub const fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Processes a submission.
    ///
    /// The evaluator is reached only if every gate lets the submission
    /// through, its alerts are returned untouched.
    pub fn process(&self, submission: &Submission) -> Outcome {
        for gate in GATES {
            if let Verdict::Reject(rejection) = self.check(gate, submission) {
                warn!("{gate} gate rejected the submission");
                return rejection.into();
            }
            debug!("{gate} gate passed");
        }

        Outcome::Evaluated(self.evaluator.evaluate(&submission.reading))
    }

    /// Runs a single gate on a submission.
    pub fn check(&self, gate: Gate, submission: &Submission) -> Verdict {
        match gate {
            Gate::Secret => {
                if self.secrets.is_authorized(submission.secret.expose()) {
                    Verdict::Continue
                } else {
                    Verdict::Reject(Rejection::Unauthorized)
                }
            }
            Gate::Firmware => match FirmwareVersion::new(submission.reading.firmware_version.as_str()) {
                Ok(_) => Verdict::Continue,
                Err(error) => Verdict::Reject(Rejection::Malformed(ValidationErrors::field(
                    FIRMWARE_VERSION_FIELD,
                    error.message(),
                ))),
            },
        }
    }
}
