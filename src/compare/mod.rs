//! Group library comparison pipeline.
//!
//! This module wires the two halves of the comparison together:
//!
//! - [`LibraryFetcher`] - Bounded concurrent fan-out over the Steam API
//! - [`games_in_common`] - Pure intersection of the fetched libraries
//! - [`CompareService`] - The single operation exposed to presentation layers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libcomparer_core::compare::{CompareService, LibraryFetcher};
//! use libcomparer_core::model::SteamId;
//! use libcomparer_core::steam::{ProfileSource, SteamWebClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client: Arc<dyn ProfileSource> = Arc::new(SteamWebClient::new("api-key")?);
//! let service = CompareService::new(LibraryFetcher::new(4)?, client);
//!
//! let outcome = service
//!     .compare(&[SteamId(76561197998255119), SteamId(76561198185968451)])
//!     .await?;
//! for game in &outcome.common {
//!     println!("{} owned by {} users", game.app_id, game.owners.len());
//! }
//! # Ok(())
//! # }
//! ```

mod fetch;
mod intersect;

pub use fetch::{DEFAULT_CONCURRENCY, FetchFailure, FetchOutcome, LibraryFetcher};
pub use intersect::games_in_common;

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::model::{GameWithOwners, SteamId};
use crate::steam::ProfileSource;

/// Error type for comparison requests.
///
/// Per-user fetch failures are NOT errors; they are reported in
/// [`CompareOutcome::failed`]. This type covers invalid input and
/// internal faults only.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// The request contained no Steam IDs at all.
    #[error("empty steam id batch: nothing to compare")]
    EmptyBatch,

    /// Invalid concurrency value provided.
    #[error("invalid concurrency value {value}: must be between 1 and 32")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Result of one comparison request.
#[derive(Debug, Serialize)]
pub struct CompareOutcome {
    /// Games owned by two or more members, sorted ascending by app ID.
    pub common: Vec<GameWithOwners>,
    /// Users excluded from the comparison, with reasons.
    pub failed: Vec<FetchFailure>,
}

/// The comparison pipeline: fan-out fetch, then intersection.
///
/// Holds an explicitly constructed [`ProfileSource`] rather than any
/// process-wide client state, so tests can substitute a fake.
pub struct CompareService {
    fetcher: LibraryFetcher,
    client: Arc<dyn ProfileSource>,
}

impl CompareService {
    /// Creates a service from a fetcher and a profile source.
    #[must_use]
    pub fn new(fetcher: LibraryFetcher, client: Arc<dyn ProfileSource>) -> Self {
        Self { fetcher, client }
    }

    /// Compares the libraries of the given users.
    ///
    /// Fetches every distinct user's library concurrently, then computes
    /// the games owned by two or more of them. Users whose fetch failed are
    /// listed in [`CompareOutcome::failed`] and excluded from the
    /// intersection; they never abort the request.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::EmptyBatch`] for an empty ID list, before
    /// any upstream call is made.
    #[instrument(skip(self), fields(requested = ids.len()))]
    pub async fn compare(&self, ids: &[SteamId]) -> Result<CompareOutcome, CompareError> {
        if ids.is_empty() {
            return Err(CompareError::EmptyBatch);
        }

        let outcome = self.fetcher.fetch_libraries(ids, &self.client).await?;
        let common = games_in_common(&outcome.libraries);

        info!(
            libraries = outcome.libraries.len(),
            failed = outcome.failures.len(),
            common = common.len(),
            "comparison complete"
        );

        Ok(CompareOutcome {
            common,
            failed: outcome.failures,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::model::{AppId, PlayerProfile};
    use crate::steam::SteamError;

    /// Fake source where a fixed set of users exists, each owning app 100
    /// plus their own ID as an app.
    struct CannedSource {
        known: Vec<u64>,
    }

    #[async_trait]
    impl ProfileSource for CannedSource {
        async fn fetch_profile(&self, id: SteamId) -> Result<PlayerProfile, SteamError> {
            if self.known.contains(&id.0) {
                Ok(PlayerProfile {
                    id,
                    persona_name: format!("user-{id}"),
                })
            } else {
                Err(SteamError::NotFound { id })
            }
        }

        async fn fetch_owned_games(&self, id: SteamId) -> Result<Vec<AppId>, SteamError> {
            #[allow(clippy::cast_possible_truncation)]
            Ok(vec![AppId(100), AppId(id.0 as u32)])
        }
    }

    fn service(known: Vec<u64>) -> CompareService {
        CompareService::new(
            LibraryFetcher::new(4).unwrap(),
            Arc::new(CannedSource { known }),
        )
    }

    #[tokio::test]
    async fn test_compare_empty_batch_is_invalid_input() {
        let result = service(vec![1, 2]).compare(&[]).await;
        assert!(matches!(result, Err(CompareError::EmptyBatch)));
    }

    #[tokio::test]
    async fn test_compare_finds_shared_game() {
        let outcome = service(vec![1, 2])
            .compare(&[SteamId(1), SteamId(2)])
            .await
            .unwrap();

        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.common.len(), 1);
        assert_eq!(outcome.common[0].app_id, AppId(100));
        assert_eq!(outcome.common[0].owners, vec![SteamId(1), SteamId(2)]);
    }

    #[tokio::test]
    async fn test_compare_single_user_yields_no_common_games() {
        let outcome = service(vec![1]).compare(&[SteamId(1)]).await.unwrap();
        assert!(outcome.common.is_empty());
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_compare_partial_failure_reports_failed_user() {
        // User 9 is unknown; user 1 succeeds. One library alone yields no
        // intersection, but the request itself must succeed.
        let outcome = service(vec![1])
            .compare(&[SteamId(1), SteamId(9)])
            .await
            .unwrap();

        assert!(outcome.common.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, SteamId(9));
    }

    #[tokio::test]
    async fn test_compare_all_failures_yields_empty_common() {
        let outcome = service(vec![])
            .compare(&[SteamId(1), SteamId(2)])
            .await
            .unwrap();
        assert!(outcome.common.is_empty());
        assert_eq!(outcome.failed.len(), 2);
    }

    #[tokio::test]
    async fn test_compare_outcome_serializes() {
        let outcome = service(vec![1, 2, 9])
            .compare(&[SteamId(1), SteamId(2)])
            .await
            .unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["common"][0]["app_id"], 100);
        assert_eq!(json["common"][0]["owners"], serde_json::json!([1, 2]));
        assert_eq!(json["failed"], serde_json::json!([]));
    }
}
