//! Error types for the todo client.
//!
//! # Design
//! Three layers, from the wire outward:
//! - `ApiError` comes out of `TodoClient::parse_*` when a response does not
//!   carry what the operation expects.
//! - `TransportError` comes out of a `Transport` when no response arrived.
//! - `RequestError` is the outcome of one executed request (including the
//!   case where the input never made it onto the wire).
//!
//! `SyncError` is the user-facing slot the synchronizer exposes. It carries no
//! transport detail; the underlying `RequestError` is logged instead.

use thiserror::Error;

/// Errors returned by `TodoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404, the requested resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned 401, the credential is missing or no longer valid.
    #[error("not authorized")]
    Unauthorized,

    /// The server refused the payload (400 or 422). `detail` is the server's
    /// explanation when it sent one.
    #[error("request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// Any other unexpected status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// No response was received for a request.
#[derive(Debug, Clone, Error)]
#[error("transport failed: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A form failed client-side validation and was never sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Title must be 100 characters or less")]
    TitleTooLong,
    #[error("Description must be 100 characters or less")]
    DescriptionTooLong,
    #[error("Priority must be between 1 and 5")]
    PriorityOutOfRange,
    #[error("Email is required")]
    EmailRequired,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Outcome of a single request issued through a `Session`.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RequestError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RequestError::Api(ApiError::Unauthorized))
    }
}

/// The single error slot shown to the user by the list synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Failed to fetch todos")]
    FetchFailed,
    #[error("Failed to add todo")]
    CreateFailed,
    #[error("Failed to update todo")]
    UpdateFailed,
    #[error("Failed to delete todo")]
    DeleteFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_errors_render_user_facing_text() {
        assert_eq!(SyncError::FetchFailed.to_string(), "Failed to fetch todos");
        assert_eq!(SyncError::CreateFailed.to_string(), "Failed to add todo");
        assert_eq!(SyncError::UpdateFailed.to_string(), "Failed to update todo");
        assert_eq!(SyncError::DeleteFailed.to_string(), "Failed to delete todo");
    }

    #[test]
    fn request_error_is_transparent() {
        let err = RequestError::from(ApiError::HttpError {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(err.to_string(), "HTTP 500: boom");
        assert!(!err.is_unauthorized());
        assert!(RequestError::from(ApiError::Unauthorized).is_unauthorized());
    }
}
