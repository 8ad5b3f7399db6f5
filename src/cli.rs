//! CLI argument definitions using clap derive macros.

use clap::Parser;

use libcomparer_core::DEFAULT_CONCURRENCY;

/// Compare Steam group members' game libraries.
///
/// Fetches each member's owned games from the Steam Web API and prints the
/// games owned by two or more members, with their owners, as JSON.
#[derive(Parser, Debug)]
#[command(name = "libcomparer")]
#[command(author, version, about)]
pub struct Args {
    /// 64-bit Steam IDs of the group members (or pipe them via stdin)
    pub steam_ids: Vec<u64>,

    /// Steam Web API key (defaults to the STEAM_API_KEY environment variable)
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// Maximum concurrent Steam API fetches (1-32)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: u8,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
