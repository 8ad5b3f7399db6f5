//! Error types for Steam Web API calls.
//!
//! Errors keep enough structure for callers to tell throttling apart from
//! genuine upstream failure: a rate-limited user can be retried after a
//! backoff, an unreachable one cannot.

use serde::Serialize;
use thiserror::Error;

use crate::model::SteamId;

/// Errors that can occur while fetching a user's profile or owned games.
#[derive(Debug, Error)]
pub enum SteamError {
    /// The Steam Web API does not know this account (deleted or never existed).
    #[error("steam account {id} not found")]
    NotFound {
        /// The unknown account.
        id: SteamId,
    },

    /// The account exists but its game library is not publicly visible.
    #[error("library of steam account {id} is private")]
    PrivateLibrary {
        /// The account with a private library.
        id: SteamId,
    },

    /// The upstream service throttled the request (HTTP 429).
    #[error("steam api rate limited the request")]
    RateLimited {
        /// The Retry-After header value, if the response carried one.
        retry_after: Option<String>,
    },

    /// Network-level failure (DNS, connection refused, TLS, timeout).
    #[error("network error calling {endpoint}: {source}")]
    Network {
        /// The endpoint that failed.
        endpoint: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Unexpected HTTP error status from the upstream service.
    #[error("steam api returned HTTP {status} for {endpoint}")]
    Status {
        /// The endpoint that returned the status.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body did not match the documented envelope.
    #[error("unexpected steam api response from {endpoint}: {reason}")]
    Decode {
        /// The endpoint whose response could not be decoded.
        endpoint: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// The fetch task for this account terminated abnormally (panicked)
    /// before producing a result.
    #[error("library fetch for steam account {id} did not complete")]
    Incomplete {
        /// The account whose fetch never completed.
        id: SteamId,
    },
}

impl SteamError {
    /// Creates a network error from a reqwest error.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates a decode error.
    pub fn decode(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Classifies the error into the caller-facing failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PrivateLibrary { .. } => ErrorKind::PrivateLibrary,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Network { .. }
            | Self::Status { .. }
            | Self::Decode { .. }
            | Self::Incomplete { .. } => ErrorKind::Unreachable,
        }
    }
}

/// Caller-facing classification of a per-user fetch failure.
///
/// `RateLimited` is kept distinct from `Unreachable` so a caller can apply
/// backoff instead of treating the user as permanently unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown or deleted account.
    NotFound,
    /// Account exists but its library is inaccessible.
    PrivateLibrary,
    /// Upstream throttled the request.
    RateLimited,
    /// Network or upstream failure.
    Unreachable,
}
