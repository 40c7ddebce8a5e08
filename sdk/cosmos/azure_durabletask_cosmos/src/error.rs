// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Error types surfaced by the persistence layer.
//!
//! [`ErrorKind`] is the classification callers branch on. Failures raised by `azure_core` keep
//! their original error as the [`source`](std::error::Error::source).

use std::{borrow::Cow, fmt, time::Duration};

use azure_core::error::ErrorKind as CoreErrorKind;

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The category of an [`Error`].
///
/// Callers should branch on the kind rather than on the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The target document, procedure or collection does not exist.
    NotFound,
    /// A resource with the same id (and partition key) already exists.
    Conflict,
    /// The supplied version token no longer matches the stored one.
    VersionConflict,
    /// The request was rate limited by the service.
    Throttled {
        /// The back-off suggested by the service, if any.
        retry_after: Option<Duration>,
    },
    /// The service is temporarily unavailable.
    Unavailable,
    /// The request never produced a service response (connection reset, DNS, socket timeout).
    TransportFailure,
    /// The caller aborted the operation.
    Canceled,
    /// The request was malformed; retrying it unchanged will not help.
    InvalidRequest,
    /// A value could not be converted to or from its wire representation.
    DataConversion,
    /// A client-side failure that is neither a transport failure nor a conversion error.
    Other,
    /// Any other unsuccessful service response.
    HttpResponse {
        status: u16,
        error_code: Option<String>,
    },
}

impl ErrorKind {
    /// Maps an unsuccessful HTTP status code onto an error kind.
    pub fn from_status(status: u16, error_code: Option<String>) -> Self {
        match status {
            400 => ErrorKind::InvalidRequest,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::VersionConflict,
            429 => ErrorKind::Throttled { retry_after: None },
            503 => ErrorKind::Unavailable,
            status => ErrorKind::HttpResponse { status, error_code },
        }
    }

    /// Returns the HTTP status code associated with this kind, if it came from a service response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ErrorKind::InvalidRequest => Some(400),
            ErrorKind::NotFound => Some(404),
            ErrorKind::Conflict => Some(409),
            ErrorKind::VersionConflict => Some(412),
            ErrorKind::Throttled { .. } => Some(429),
            ErrorKind::Unavailable => Some(503),
            ErrorKind::HttpResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => f.write_str("NotFound"),
            ErrorKind::Conflict => f.write_str("Conflict"),
            ErrorKind::VersionConflict => f.write_str("VersionConflict"),
            ErrorKind::Throttled { .. } => f.write_str("Throttled"),
            ErrorKind::Unavailable => f.write_str("Unavailable"),
            ErrorKind::TransportFailure => f.write_str("TransportFailure"),
            ErrorKind::Canceled => f.write_str("Canceled"),
            ErrorKind::InvalidRequest => f.write_str("InvalidRequest"),
            ErrorKind::DataConversion => f.write_str("DataConversion"),
            ErrorKind::Other => f.write_str("Other"),
            ErrorKind::HttpResponse { status, error_code } => match error_code {
                Some(code) => write!(f, "HttpResponse({status}, {code})"),
                None => write!(f, "HttpResponse({status})"),
            },
        }
    }
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by a persistence operation.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedSource>,
}

impl Error {
    /// Creates an error of the given kind with a message.
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error of the given kind wrapping an underlying error.
    pub fn full<E>(kind: ErrorKind, source: E, message: impl Into<Cow<'static, str>>) -> Self
    where
        E: Into<BoxedSource>,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub(crate) fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "the operation was canceled by the caller")
    }

    /// The category of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The HTTP status code of the service response that caused this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        self.kind.status()
    }

    /// The back-off the service asked for, when the request was throttled.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.kind {
            ErrorKind::Throttled { retry_after } => retry_after,
            _ => None,
        }
    }

    /// Whether retrying the same request later may succeed.
    ///
    /// Rate limiting, service unavailability and transport failures are transient.
    /// Everything else is terminal.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Throttled { .. } | ErrorKind::Unavailable | ErrorKind::TransportFailure
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::full(
            ErrorKind::DataConversion,
            error,
            "failed to convert a JSON payload",
        )
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Error::full(ErrorKind::InvalidRequest, error, "invalid URL")
    }
}

impl From<azure_core::Error> for Error {
    fn from(error: azure_core::Error) -> Self {
        let kind = match (error.http_status(), error.kind()) {
            (Some(status), _) => ErrorKind::from_status(u16::from(status), None),
            (None, CoreErrorKind::Io) => ErrorKind::TransportFailure,
            (None, CoreErrorKind::DataConversion) => ErrorKind::DataConversion,
            (None, _) => ErrorKind::Other,
        };
        let message = error.to_string();
        Error::full(kind, error, message)
    }
}

impl From<Error> for azure_core::Error {
    fn from(error: Error) -> Self {
        let kind = match error.kind {
            ErrorKind::TransportFailure => CoreErrorKind::Io,
            ErrorKind::DataConversion => CoreErrorKind::DataConversion,
            _ => CoreErrorKind::Other,
        };
        let message = error.to_string();
        azure_core::Error::with_error(kind, error, message)
    }
}
