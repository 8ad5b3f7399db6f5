//! CLI entry point for the group library comparer.

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use libcomparer_core::{
    CompareService, LibraryFetcher, ProfileSource, SteamId, SteamWebClient,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    info!("Group library comparer starting");

    // Read input: from positional args or stdin
    let steam_ids = if args.steam_ids.is_empty() {
        read_ids_from_stdin()?
    } else {
        args.steam_ids.iter().copied().map(SteamId).collect()
    };

    // An empty batch is invalid input, not a no-op: scripts piping an empty
    // list must see a failure.
    if steam_ids.is_empty() {
        bail!(
            "no steam ids provided: pass them as arguments or pipe via stdin \
             (example: libcomparer 76561197998255119 76561198185968451)"
        );
    }

    debug!(ids = steam_ids.len(), "parsed input");

    let api_key = match args.api_key {
        Some(key) => key,
        None => std::env::var("STEAM_API_KEY")
            .context("no API key: pass --api-key or set STEAM_API_KEY")?,
    };

    let client: Arc<dyn ProfileSource> =
        Arc::new(SteamWebClient::new(api_key).context("failed to construct Steam client")?);
    let fetcher = LibraryFetcher::new(usize::from(args.concurrency))?;
    let service = CompareService::new(fetcher, client);

    let outcome = service.compare(&steam_ids).await?;

    for failure in &outcome.failed {
        warn!(steam_id = %failure.id, error = %failure.error, "user excluded from comparison");
    }

    info!(
        common = outcome.common.len(),
        failed = outcome.failed.len(),
        "comparison complete"
    );

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

/// Reads whitespace-separated Steam IDs from a piped stdin.
fn read_ids_from_stdin() -> Result<Vec<SteamId>> {
    if io::stdin().is_terminal() {
        return Ok(Vec::new());
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let mut ids = Vec::new();
    for token in buffer.split_whitespace() {
        match token.parse::<u64>() {
            Ok(id) => ids.push(SteamId(id)),
            Err(_) => bail!("invalid steam id in input: {token:?}"),
        }
    }
    Ok(ids)
}
