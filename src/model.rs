//! Shared data model for library comparison.
//!
//! All identifiers are opaque values issued by Steam; nothing here mutates
//! or recycles them. A [`UserLibrary`] is built once per request from raw
//! upstream rows and is immutable afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Opaque 64-bit Steam account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SteamId(pub u64);

impl std::fmt::Display for SteamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque Steam application (game) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u32);

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A Steam user's public profile as returned by the player summaries endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerProfile {
    /// The account the profile belongs to.
    pub id: SteamId,
    /// Display name chosen by the user.
    pub persona_name: String,
}

/// One member's owned-game set, paired with their profile.
///
/// The set representation guarantees each [`AppId`] appears at most once,
/// even when the upstream response contains duplicate rows. Without that
/// guarantee a user would show up more than once in an owner list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLibrary {
    /// Profile of the owning user.
    pub profile: PlayerProfile,
    /// Deduplicated set of owned app IDs.
    pub apps: BTreeSet<AppId>,
}

impl UserLibrary {
    /// Builds a library from raw upstream rows, deduplicating app IDs.
    #[must_use]
    pub fn new(profile: PlayerProfile, apps: impl IntoIterator<Item = AppId>) -> Self {
        Self {
            profile,
            apps: apps.into_iter().collect(),
        }
    }

    /// The owning user's account ID.
    #[must_use]
    pub fn owner(&self) -> SteamId {
        self.profile.id
    }
}

/// A game owned by two or more members of the compared group.
///
/// Serializes as `{"app_id": <integer>, "owners": [<integer>, ...]}`.
/// `owners` is sorted ascending by account ID and always has at least
/// two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameWithOwners {
    /// The shared game.
    pub app_id: AppId,
    /// Accounts that own it, sorted ascending.
    pub owners: Vec<SteamId>,
}
