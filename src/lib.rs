//! Group Library Comparer Core Library
//!
//! This library answers one question for a group of Steam users: which games
//! in their libraries are owned by more than one member, and by whom. It sits
//! in front of the read-only Steam Web API and aggregates per-user lookups.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`model`] - Shared data model (IDs, profiles, libraries, results)
//! - [`steam`] - Steam Web API collaborator trait and HTTP client
//! - [`compare`] - Concurrent fan-out fetch and library intersection

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compare;
pub mod model;
pub mod steam;

// Re-export commonly used types
pub use compare::{
    CompareError, CompareOutcome, CompareService, DEFAULT_CONCURRENCY, FetchFailure, FetchOutcome,
    LibraryFetcher, games_in_common,
};
pub use model::{AppId, GameWithOwners, PlayerProfile, SteamId, UserLibrary};
pub use steam::{ErrorKind, ProfileSource, SteamError, SteamWebClient};
