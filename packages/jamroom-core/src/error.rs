//! Centralized error types for the Jamroom core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::crypto::CryptoError;

/// Application-wide error type for the Jamroom server.
///
/// Operations are all-or-nothing with respect to room state: any of these
/// errors means the triggering request left no partial mutation behind.
#[derive(Debug, Error)]
pub enum JamError {
    /// Client sent a malformed or incomplete payload.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested room does not exist.
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    /// Room name is already taken.
    #[error("Room '{0}' already present")]
    RoomExists(String),

    /// Another client in the room already uses this user name.
    #[error("User '{0}' is already present in the room")]
    DuplicateUser(String),

    /// The declared host is already connected.
    #[error("Host already present in room '{0}'")]
    HostAlreadyPresent(String),

    /// Guests must wait until the host has joined.
    #[error("Host is not yet present in room '{0}', please wait")]
    HostNotPresent(String),

    /// Song name already appears in the queue or is currently playing.
    #[error("Song '{0}' already suggested by {1}")]
    DuplicateSuggestion(String, String),

    /// Vote target is not in the queue.
    #[error("Song '{0}' hasn't been suggested")]
    SongNotFound(String),

    /// The user already voted for this song.
    #[error("User '{0}' has already voted for song '{1}'")]
    DuplicateVote(String, String),

    /// Skip attempted by a non-host.
    #[error("Only the host can skip a song")]
    NotHost,

    /// Skip target is not the song currently playing.
    #[error("Song '{0}' is not currently playing")]
    SongNotPlaying(String),

    /// Connection-id does not resolve to a live connection in this room.
    #[error("Unknown connection id")]
    ConnectionNotFound,

    /// Connection-id token failed to decrypt (wrong room or forged token).
    #[error("Invalid connection id token: {0}")]
    Crypto(#[from] CryptoError),

    /// Missing or malformed login credentials / bearer header.
    #[error("{0}")]
    Unauthorized(String),

    /// Valid header shape but the token is not a live session.
    #[error("{0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JamError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::RoomNotFound(_) => "room_not_found",
            Self::RoomExists(_) => "room_exists",
            Self::DuplicateUser(_) => "duplicate_user",
            Self::HostAlreadyPresent(_) => "host_already_present",
            Self::HostNotPresent(_) => "host_not_present",
            Self::DuplicateSuggestion(_, _) => "song_already_suggested",
            Self::SongNotFound(_) => "song_not_found",
            Self::DuplicateVote(_, _) => "duplicate_vote",
            Self::NotHost => "not_host",
            Self::SongNotPlaying(_) => "song_not_playing",
            Self::ConnectionNotFound => "connection_not_found",
            Self::Crypto(_) => "invalid_connection_id",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "access_denied",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RoomNotFound(_) | Self::SongNotFound(_) | Self::ConnectionNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::RoomExists(_)
            | Self::DuplicateUser(_)
            | Self::HostAlreadyPresent(_)
            | Self::HostNotPresent(_)
            | Self::DuplicateSuggestion(_, _)
            | Self::DuplicateVote(_, _)
            | Self::SongNotPlaying(_) => StatusCode::CONFLICT,
            Self::NotHost | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Crypto(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type JamResult<T> = Result<T, JamError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for JamError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_class_maps_to_404() {
        for err in [
            JamError::RoomNotFound("r".into()),
            JamError::SongNotFound("s".into()),
            JamError::ConnectionNotFound,
        ] {
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn conflict_class_maps_to_409() {
        for err in [
            JamError::RoomExists("r".into()),
            JamError::DuplicateUser("u".into()),
            JamError::HostAlreadyPresent("r".into()),
            JamError::HostNotPresent("r".into()),
            JamError::DuplicateSuggestion("s".into(), "u".into()),
            JamError::DuplicateVote("u".into(), "s".into()),
            JamError::SongNotPlaying("s".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn authorization_class_maps_to_403() {
        assert_eq!(JamError::NotHost.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(JamError::NotHost.code(), "not_host");
    }

    #[test]
    fn crypto_failure_maps_to_401() {
        let err = JamError::Crypto(CryptoError::CiphertextTooShort);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "invalid_connection_id");
    }

    #[test]
    fn host_not_present_message_tells_guests_to_wait() {
        let err = JamError::HostNotPresent("den".into());
        assert!(err.to_string().contains("please wait"));
    }
}
