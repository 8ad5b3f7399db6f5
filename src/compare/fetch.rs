//! Concurrent per-user library fetching.
//!
//! The [`LibraryFetcher`] fans out one fetch task per distinct Steam ID,
//! capped by a semaphore so large groups don't hammer the Steam API, and
//! collects every outcome before returning. One user's failure never aborts
//! the batch: successes and failures come back side by side.

use std::collections::HashSet;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::model::{SteamId, UserLibrary};
use crate::steam::{ProfileSource, SteamError};

use super::CompareError;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 32;

/// Default number of simultaneous Steam API fetches.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A user whose fetch failed, with the reason.
///
/// Serializes as `{"id": ..., "kind": ..., "message": ...}` so presenters can
/// show both a machine-readable kind and a human-readable explanation.
#[derive(Debug)]
pub struct FetchFailure {
    /// The account that could not be fetched.
    pub id: SteamId,
    /// Why the fetch failed.
    pub error: SteamError,
}

impl Serialize for FetchFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FetchFailure", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("kind", &self.error.kind())?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}

/// Result of one fan-out pass: every successfully fetched library plus every
/// per-user failure, both in first-seen input order.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Libraries of users whose profile and games were both fetched.
    pub libraries: Vec<UserLibrary>,
    /// Users excluded from the comparison, with the reason each failed.
    pub failures: Vec<FetchFailure>,
}

/// Bounded concurrent fetcher for per-user libraries.
///
/// # Concurrency Model
///
/// - Each user's fetch runs in its own Tokio task
/// - A semaphore permit is acquired before dispatching each fetch
/// - Permits are released automatically when fetches complete (RAII)
/// - Tasks live in a [`JoinSet`], so cancelling the overall call aborts
///   any in-flight fetches instead of leaving them running
/// - All fetches are joined before results are assembled; the intersection
///   never runs on a partially-populated library set
///
/// # Ordering
///
/// Results are slotted by input index, so output order follows the input
/// ID order regardless of which fetches complete first.
#[derive(Debug)]
pub struct LibraryFetcher {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
}

impl LibraryFetcher {
    /// Creates a fetcher with the specified concurrency limit.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-32).
    pub fn new(concurrency: usize) -> Result<Self, CompareError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(CompareError::InvalidConcurrency { value: concurrency });
        }

        debug!(concurrency, "creating library fetcher");

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetches the library of every distinct user in `ids` concurrently.
    ///
    /// Duplicate IDs are fetched once; fetching the same user twice would
    /// waste an upstream call and count them as two owners of every game
    /// they own. No retries are attempted: a failed fetch is terminal for
    /// that user within this pass.
    ///
    /// Every distinct input user lands in exactly one of
    /// [`FetchOutcome::libraries`] or [`FetchOutcome::failures`]; a fetch
    /// task that panics is reported as [`SteamError::Incomplete`] rather
    /// than silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::SemaphoreClosed`] if the semaphore is closed,
    /// which indicates a bug. Individual fetch failures do NOT error; they
    /// are reported in [`FetchOutcome::failures`].
    #[instrument(skip(self, client), fields(requested = ids.len()))]
    pub async fn fetch_libraries(
        &self,
        ids: &[SteamId],
        client: &Arc<dyn ProfileSource>,
    ) -> Result<FetchOutcome, CompareError> {
        let distinct = dedup_preserving_order(ids);
        if distinct.len() < ids.len() {
            debug!(
                distinct = distinct.len(),
                dropped = ids.len() - distinct.len(),
                "dropped duplicate steam ids from batch"
            );
        }

        info!(users = distinct.len(), "starting library fan-out");

        let mut tasks: JoinSet<(usize, Result<UserLibrary, SteamError>)> = JoinSet::new();

        for (index, &id) in distinct.iter().enumerate() {
            // Acquire semaphore permit (blocks if at concurrency limit)
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| CompareError::SemaphoreClosed)?;

            let client = Arc::clone(client);
            tasks.spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;
                (index, fetch_one(client.as_ref(), id).await)
            });
        }

        // Wait for all fetches; slot results by input index so the outcome
        // order does not depend on completion order.
        let mut slots: Vec<Option<Result<UserLibrary, SteamError>>> =
            (0..distinct.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                // Task panics are logged but don't fail the batch
                Err(e) => warn!(error = %e, "library fetch task panicked"),
            }
        }

        let mut outcome = FetchOutcome::default();
        for (id, slot) in distinct.into_iter().zip(slots) {
            match slot {
                Some(Ok(library)) => outcome.libraries.push(library),
                Some(Err(error)) => {
                    warn!(steam_id = %id, error = %error, "excluding user from comparison");
                    outcome.failures.push(FetchFailure { id, error });
                }
                // Slot never filled: the task panicked. Report the user
                // instead of letting them vanish from the outcome.
                None => {
                    warn!(steam_id = %id, "fetch task did not complete");
                    outcome.failures.push(FetchFailure {
                        id,
                        error: SteamError::Incomplete { id },
                    });
                }
            }
        }

        info!(
            fetched = outcome.libraries.len(),
            failed = outcome.failures.len(),
            "library fan-out complete"
        );

        Ok(outcome)
    }
}

impl Default for LibraryFetcher {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Fetches one user's profile and owned games.
///
/// Either call failing excludes the user; the error says which.
async fn fetch_one(client: &dyn ProfileSource, id: SteamId) -> Result<UserLibrary, SteamError> {
    let profile = client.fetch_profile(id).await?;
    let apps = client.fetch_owned_games(id).await?;
    debug!(
        steam_id = %id,
        persona_name = %profile.persona_name,
        library_size = apps.len(),
        "fetched user library"
    );
    Ok(UserLibrary::new(profile, apps))
}

fn dedup_preserving_order(ids: &[SteamId]) -> Vec<SteamId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::model::{AppId, PlayerProfile};

    /// In-memory ProfileSource for exercising the fan-out without a server.
    ///
    /// Odd IDs get a small extra delay so completion order differs from
    /// dispatch order.
    struct FakeSource {
        profile_calls: AtomicUsize,
        games_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_games_for: Option<SteamId>,
        profile_delay_ms: Option<u64>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                profile_calls: AtomicUsize::new(0),
                games_calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_games_for: None,
                profile_delay_ms: None,
            }
        }

        fn failing_games_for(id: SteamId) -> Self {
            Self {
                fail_games_for: Some(id),
                ..Self::new()
            }
        }

        /// Every profile fetch takes the same fixed delay, for tests that
        /// need fetches to still be in flight at a known point in time.
        fn with_profile_delay(delay_ms: u64) -> Self {
            Self {
                profile_delay_ms: Some(delay_ms),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ProfileSource for FakeSource {
        async fn fetch_profile(&self, id: SteamId) -> Result<PlayerProfile, SteamError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let delay = self
                .profile_delay_ms
                .unwrap_or(if id.0 % 2 == 1 { 20 } else { 1 });
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(PlayerProfile {
                id,
                persona_name: format!("user-{id}"),
            })
        }

        async fn fetch_owned_games(&self, id: SteamId) -> Result<Vec<AppId>, SteamError> {
            self.games_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_games_for == Some(id) {
                return Err(SteamError::PrivateLibrary { id });
            }
            #[allow(clippy::cast_possible_truncation)]
            Ok(vec![AppId(100), AppId(id.0 as u32)])
        }
    }

    fn source(fake: impl ProfileSource + 'static) -> Arc<dyn ProfileSource> {
        Arc::new(fake)
    }

    #[test]
    fn test_fetcher_new_valid_concurrency() {
        assert_eq!(LibraryFetcher::new(1).unwrap().concurrency(), 1);
        assert_eq!(LibraryFetcher::new(4).unwrap().concurrency(), 4);
        assert_eq!(LibraryFetcher::new(32).unwrap().concurrency(), 32);
    }

    #[test]
    fn test_fetcher_new_invalid_concurrency() {
        assert!(matches!(
            LibraryFetcher::new(0),
            Err(CompareError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            LibraryFetcher::new(33),
            Err(CompareError::InvalidConcurrency { value: 33 })
        ));
    }

    #[test]
    fn test_fetcher_default_uses_default_concurrency() {
        assert_eq!(LibraryFetcher::default().concurrency(), DEFAULT_CONCURRENCY);
    }

    #[tokio::test]
    async fn test_fetch_libraries_returns_input_order() {
        let fetcher = LibraryFetcher::new(8).unwrap();
        // Mixed parity so completion order differs from input order
        let ids = [SteamId(1), SteamId(2), SteamId(3), SteamId(4)];
        let outcome = fetcher
            .fetch_libraries(&ids, &source(FakeSource::new()))
            .await
            .unwrap();

        let order: Vec<SteamId> = outcome.libraries.iter().map(UserLibrary::owner).collect();
        assert_eq!(order, ids);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_libraries_deduplicates_input_ids() {
        let calls = Arc::new(FakeSource::new());
        let client: Arc<dyn ProfileSource> = calls.clone();

        let fetcher = LibraryFetcher::new(4).unwrap();
        let ids = [SteamId(1), SteamId(2), SteamId(1), SteamId(1)];
        let outcome = fetcher.fetch_libraries(&ids, &client).await.unwrap();

        assert_eq!(outcome.libraries.len(), 2);
        assert_eq!(calls.profile_calls.load(Ordering::SeqCst), 2);
        assert_eq!(calls.games_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_libraries_isolates_failures() {
        let fetcher = LibraryFetcher::new(4).unwrap();
        let ids = [SteamId(1), SteamId(2), SteamId(3)];
        let outcome = fetcher
            .fetch_libraries(&ids, &source(FakeSource::failing_games_for(SteamId(2))))
            .await
            .unwrap();

        assert_eq!(outcome.libraries.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, SteamId(2));
        assert!(matches!(
            outcome.failures[0].error,
            SteamError::PrivateLibrary { id: SteamId(2) }
        ));
    }

    #[tokio::test]
    async fn test_fetch_libraries_respects_concurrency_cap() {
        let calls = Arc::new(FakeSource::new());
        let client: Arc<dyn ProfileSource> = calls.clone();

        let fetcher = LibraryFetcher::new(2).unwrap();
        let ids: Vec<SteamId> = (1..=10).map(SteamId).collect();
        fetcher.fetch_libraries(&ids, &client).await.unwrap();

        assert!(
            calls.max_in_flight.load(Ordering::SeqCst) <= 2,
            "observed more in-flight fetches than the cap"
        );
    }

    #[tokio::test]
    async fn test_cancelled_fetch_aborts_in_flight_requests() {
        let calls = Arc::new(FakeSource::with_profile_delay(200));
        let client: Arc<dyn ProfileSource> = calls.clone();

        let fetcher = LibraryFetcher::new(1).unwrap();
        let ids: Vec<SteamId> = (1..=5).map(SteamId).collect();

        // Time the whole batch out while the first fetch is still sleeping;
        // the elapsed timeout drops the fetch future and with it the JoinSet.
        let timed_out = tokio::time::timeout(
            Duration::from_millis(50),
            fetcher.fetch_libraries(&ids, &client),
        )
        .await
        .is_err();
        assert!(timed_out, "fetch finished before it could be cancelled");

        // Let any aborts settle, then verify no further fetches ran. With
        // the 200ms per-profile delay, live tasks would have kept counting.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_drop = calls.profile_calls.load(Ordering::SeqCst);
        assert!(after_drop < ids.len(), "all fetches dispatched despite cancellation");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(
            calls.profile_calls.load(Ordering::SeqCst),
            after_drop,
            "fetches kept running after the future was dropped"
        );
        assert_eq!(
            calls.games_calls.load(Ordering::SeqCst),
            0,
            "owned games fetched after cancellation"
        );
    }

    /// Source whose profile fetch panics for one account.
    struct PanickingSource {
        panic_for: SteamId,
    }

    #[async_trait]
    impl ProfileSource for PanickingSource {
        async fn fetch_profile(&self, id: SteamId) -> Result<PlayerProfile, SteamError> {
            assert_ne!(id, self.panic_for, "synthetic fetch panic");
            Ok(PlayerProfile {
                id,
                persona_name: format!("user-{id}"),
            })
        }

        async fn fetch_owned_games(&self, id: SteamId) -> Result<Vec<AppId>, SteamError> {
            #[allow(clippy::cast_possible_truncation)]
            Ok(vec![AppId(id.0 as u32)])
        }
    }

    #[tokio::test]
    async fn test_panicked_task_is_reported_not_dropped() {
        let fetcher = LibraryFetcher::new(4).unwrap();
        let ids = [SteamId(1), SteamId(2), SteamId(3)];
        let outcome = fetcher
            .fetch_libraries(
                &ids,
                &source(PanickingSource {
                    panic_for: SteamId(2),
                }),
            )
            .await
            .unwrap();

        // Every requested user is accounted for, the panicked one as a failure
        assert_eq!(outcome.libraries.len() + outcome.failures.len(), ids.len());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, SteamId(2));
        assert!(matches!(
            outcome.failures[0].error,
            SteamError::Incomplete { id: SteamId(2) }
        ));
    }

    #[tokio::test]
    async fn test_fetch_libraries_empty_input_yields_empty_outcome() {
        let fetcher = LibraryFetcher::new(4).unwrap();
        let outcome = fetcher
            .fetch_libraries(&[], &source(FakeSource::new()))
            .await
            .unwrap();
        assert!(outcome.libraries.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_fetch_failure_serializes_kind_and_message() {
        let failure = FetchFailure {
            id: SteamId(9),
            error: SteamError::PrivateLibrary { id: SteamId(9) },
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["kind"], "private_library");
        assert!(json["message"].as_str().unwrap().contains("private"));
    }
}
