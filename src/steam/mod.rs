//! Steam Web API access.
//!
//! This module defines the narrow collaborator interface the comparison
//! pipeline depends on, plus the real HTTP implementation:
//!
//! - [`ProfileSource`] - Async trait for fetching a user's profile and owned games
//! - [`SteamWebClient`] - reqwest-backed implementation against the Steam Web API
//! - [`SteamError`] / [`ErrorKind`] - Per-user fetch failures and their classification
//!
//! The trait exists so the fan-out and intersection logic can be tested with
//! in-memory fakes instead of live Steam traffic.

mod client;
mod error;

pub use client::SteamWebClient;
pub use error::{ErrorKind, SteamError};

use async_trait::async_trait;

use crate::model::{AppId, PlayerProfile, SteamId};

/// Read-only source of Steam profiles and owned-game lists.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Arc<dyn ProfileSource>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required here.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetches the public profile of one account.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::NotFound`] for unknown accounts, or a network,
    /// status, or rate-limit error when the upstream call fails.
    async fn fetch_profile(&self, id: SteamId) -> Result<PlayerProfile, SteamError>;

    /// Fetches the app IDs of all games the account owns.
    ///
    /// The returned list may contain duplicates; callers deduplicate when
    /// constructing a [`crate::model::UserLibrary`].
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::PrivateLibrary`] when the library is not
    /// publicly visible, or a network, status, or rate-limit error when
    /// the upstream call fails.
    async fn fetch_owned_games(&self, id: SteamId) -> Result<Vec<AppId>, SteamError>;
}
