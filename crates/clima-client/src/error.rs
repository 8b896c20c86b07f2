use std::borrow::Cow;

use tracing::error;

/// All possible error kinds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ErrorKind {
    /// Errors encountered when sending a reading to the server.
    Request,
    /// The server answered with a status the client does not handle.
    UnexpectedStatus,
    /// Errors encountered while parsing a `json` response.
    JsonResponse,
}

impl ErrorKind {
    pub(crate) const fn description(self) -> &'static str {
        match self {
            Self::Request => "Request",
            Self::UnexpectedStatus => "Unexpected Status",
            Self::JsonResponse => "Json Response",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Client error.
#[derive(PartialEq)]
pub struct Error {
    kind: ErrorKind,
    description: Cow<'static, str>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.format(f)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.format(f)
    }
}

impl Error {
    /// Creates an [`Error`] from an [`ErrorKind`] and a description.
    #[inline]
    pub fn new(kind: ErrorKind, description: impl Into<Cow<'static, str>>) -> Self {
        let description = description.into();
        error!("{}", description.as_ref());
        Self { kind, description }
    }

    /// Returns the [`ErrorKind`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn format(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.description)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::new(ErrorKind::JsonResponse, e.to_string())
        } else {
            Self::new(ErrorKind::Request, e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::JsonResponse, e.to_string())
    }
}

impl std::error::Error for Error {}

/// A specialized [`Result`] type for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
