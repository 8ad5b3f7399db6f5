//! Ownership index and multi-owner filtering.
//!
//! This is the pure half of the comparison: given already-fetched libraries,
//! find every game owned by two or more members. It never fails; an empty or
//! single-library input just yields an empty result.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{AppId, GameWithOwners, SteamId, UserLibrary};

/// Computes the games owned by two or more of the given libraries.
///
/// Results are sorted ascending by app ID, and each owner list ascending by
/// account ID, so output is identical for any permutation of the input
/// libraries and for repeated calls on the same input.
#[must_use]
pub fn games_in_common(libraries: &[UserLibrary]) -> Vec<GameWithOwners> {
    let mut index: BTreeMap<AppId, Vec<SteamId>> = BTreeMap::new();

    for library in libraries {
        // Library app sets are deduplicated on construction, so each owner
        // lands at most once per app.
        for &app_id in &library.apps {
            index.entry(app_id).or_default().push(library.owner());
        }
    }

    debug!(
        libraries = libraries.len(),
        combined_apps = index.len(),
        "built ownership index"
    );

    index
        .into_iter()
        .filter(|(_, owners)| owners.len() >= 2)
        .map(|(app_id, mut owners)| {
            owners.sort_unstable();
            GameWithOwners { app_id, owners }
        })
        .collect()
}
