use std::io::{Error as IoError, ErrorKind as IoErrorKind};

use http::StatusCode;
use hyper::Body;
use thiserror::Error;

/// A request rejection: the status and message written back to the client.
///
/// Everything the pipeline refuses on purpose (bad method, disallowed
/// origin, root escape, unsatisfiable range, missing file, wrong target
/// type) is one of these. Filesystem errors that don't classify become the
/// generic 500; their detail stays attached for the log and never reaches
/// the client.
#[derive(Debug, Error)]
#[error("{status} {message}")]
pub struct AppError {
    status: StatusCode,
    message: String,
    #[source]
    detail: Option<IoError>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        AppError {
            status,
            message: message.into(),
            detail: None,
        }
    }

    /// Rejection for a request method this server does not serve.
    ///
    /// The status is 305, not 405; clients of this server depend on it.
    pub fn unsupported_method(method: &http::Method) -> Self {
        Self::new(StatusCode::USE_PROXY, format!("Unsupported method {}", method))
    }

    /// Rejection for a request whose `Origin` is not on the allow-list.
    pub fn invalid_origin() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Invalid origin")
    }

    /// Rejection for a target outside the served root, or one the process
    /// may not read.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden resource")
    }

    /// Rejection for a target that does not exist.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "File not found")
    }

    /// Rejection for a target that is neither a regular file nor a listable
    /// directory.
    pub fn not_a_file() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request (not a file)")
    }

    /// Rejection for a malformed or unsatisfiable `Range` header.
    pub fn invalid_range() -> Self {
        Self::new(StatusCode::RANGE_NOT_SATISFIABLE, "Invalid range")
    }

    /// The generic failure answer; the client never learns the cause.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// Classify a filesystem error into the rejection it should produce.
    ///
    /// Missing targets map to 404, which includes a path that treats an
    /// existing file as a directory. Permission problems map to 403.
    /// Anything else is unexpected and becomes a 500 carrying the error.
    pub fn from_io(err: IoError) -> Self {
        match err.kind() {
            IoErrorKind::NotFound | IoErrorKind::NotADirectory => Self::not_found(),
            IoErrorKind::PermissionDenied => Self::forbidden(),
            _ => AppError {
                detail: Some(err),
                ..Self::internal()
            },
        }
    }

    /// Status written to the client.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body written to the client.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Internal detail for the log, when the failure was not deliberate.
    pub fn detail(&self) -> Option<&IoError> {
        self.detail.as_ref()
    }

    /// Render as the HTTP response the client receives.
    pub fn into_response(self) -> http::Response<Body> {
        let mut response = http::Response::new(Body::from(self.message));
        *response.status_mut() = self.status;
        response
    }
}

/// Failure to bring the listener up. Fatal: the caller reports it and exits.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The configured host and port did not resolve to a usable address.
    #[error("cannot resolve listen address {host}:{port}")]
    Address {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Address resolution failed at the OS level.
    #[error(transparent)]
    Io(#[from] IoError),
    /// The server failed to bind or crashed while serving.
    #[error(transparent)]
    Server(#[from] hyper::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_classification() {
        let err = AppError::from_io(IoError::new(IoErrorKind::NotFound, "enoent"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "File not found");
        assert!(err.detail().is_none());

        let err = AppError::from_io(IoError::new(IoErrorKind::PermissionDenied, "eacces"));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "Forbidden resource");

        let err = AppError::from_io(IoError::new(IoErrorKind::Other, "exdev"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");
        assert!(err.detail().is_some());
    }

    #[test]
    fn non_get_methods_get_305() {
        let err = AppError::unsupported_method(&http::Method::POST);
        assert_eq!(err.status().as_u16(), 305);
        assert_eq!(err.message(), "Unsupported method POST");
    }
}
