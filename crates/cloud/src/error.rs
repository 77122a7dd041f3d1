//! Errors raised by the cloud adapters before they are mapped into
//! [`pipeline::RelayError`].

use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use thiserror::Error;

/// A failed call to a managed service or a peer relay.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The service answered with an error, e.g. `AccessDeniedException`.
    #[error("{service} returned {code}: {message}")]
    Service {
        service: &'static str,
        code: String,
        message: String,
    },

    /// The call never got a service answer: credentials could not be
    /// resolved, the connection failed or timed out, or the response could
    /// not be read.
    #[error("Request to {service} failed: {message}")]
    Request {
        service: &'static str,
        message: String,
    },

    /// The call succeeded but the service reported that it did not carry out
    /// the request (e.g. `failures` in a `RunTask` response).
    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    /// The request could not be assembled from the port's input.
    #[error("Could not build {service} request: {message}")]
    InvalidRequest {
        service: &'static str,
        message: String,
    },

    /// The HTTP client for relay-to-relay delivery could not be built.
    #[error("Could not build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl CloudError {
    /// Classifies an SDK failure, keeping the service's error code when the
    /// service answered.
    pub(crate) fn from_sdk<E, R>(service: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match err {
            SdkError::ServiceError(context) => {
                let err = context.into_err();
                Self::Service {
                    service,
                    code: err.code().unwrap_or("Unknown").to_string(),
                    message: err.message().unwrap_or("no message").to_string(),
                }
            }
            other => Self::Request {
                service,
                message: DisplayErrorContext(&other).to_string(),
            },
        }
    }

    pub(crate) fn invalid_request(service: &'static str, message: impl ToString) -> Self {
        Self::InvalidRequest {
            service,
            message: message.to_string(),
        }
    }
}
