//! Ticket Bot Example
//!
//! A demonstration of the Wicket interaction core, driven by recorded
//! interaction events instead of a live gateway connection.
//!
//! # Session
//!
//! `fixtures/session.json` replays a short ticket lifecycle in the seeded
//! support server:
//!
//! ```text
//! carol  /ticket open        -> panel with close / claim / rename / priority
//! carol  [close]             -> refused, Support required
//! bob    [claim:1]           -> Support through the Staff role grant
//! carol  [priority] high     -> select menu
//! carol  [rename] -> modal   -> modal submission
//! carol  [old-button]        -> catch-all handler
//! alice  /admin grant carol  -> owner is Admin; grant overwrites the cache
//! carol  [close]             -> now allowed, edits the panel in place
//! carol  /ping (DM)          -> DM-enabled command
//! ```
//!
//! Every response call is printed instead of being sent.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package ticket-bot -- \
//!     --config demos/ticket_bot/wicket.toml demos/ticket_bot/fixtures/session.json
//! ```

mod handlers;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use wicket::core::{Interaction, PremiumTier};
use wicket::framework::{MemoryPermissionCache, PermissionCache, PermissionResolver};
use wicket::runtime::WicketRuntime;

use crate::store::{ConsoleApi, FixedPremium, MemoryGrants, MemoryGuilds};

/// Replays recorded interactions through the Wicket runtime.
#[derive(Parser, Debug)]
#[command(name = "ticket-bot", version, about)]
struct Args {
    /// JSON files holding one interaction or an array of them.
    #[arg(required = true)]
    fixtures: Vec<PathBuf>,

    /// Configuration file (defaults to `wicket.toml` in the working directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `development`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Pause between interactions, in milliseconds.
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Premium tier reported for every guild.
    #[arg(long, value_parser = parse_tier, default_value = "none")]
    premium: PremiumTier,
}

fn parse_tier(value: &str) -> Result<PremiumTier, String> {
    match value {
        "none" => Ok(PremiumTier::None),
        "premium" => Ok(PremiumTier::Premium),
        "whitelabel" => Ok(PremiumTier::Whitelabel),
        other => Err(format!("unknown premium tier `{other}`")),
    }
}

/// Reads every interaction of one fixture file, skipping undecodable ones.
async fn read_fixture(path: &Path) -> Result<Vec<Interaction>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let events = match value {
        serde_json::Value::Array(events) => events,
        single => vec![single],
    };
    Ok(events
        .into_iter()
        .enumerate()
        .filter_map(|(index, event)| match Interaction::from_value(event) {
            Ok(interaction) => Some(interaction),
            Err(e) => {
                warn!(file = %path.display(), index, error = %e, "Skipping fixture event");
                None
            }
        })
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Collaborators shared between the runtime and the admin commands.
    let guilds = Arc::new(MemoryGuilds::seeded());
    let grants = Arc::new(MemoryGrants::seeded());
    let cache: Arc<dyn PermissionCache> = Arc::new(MemoryPermissionCache::default());
    let resolver = Arc::new(PermissionResolver::new(
        guilds.clone(),
        grants.clone(),
        cache.clone(),
    ));

    let mut builder = WicketRuntime::builder()
        .registry(handlers::registry(resolver))
        .interaction_api(Arc::new(ConsoleApi::default()))
        .guild_data(guilds)
        .grant_store(grants)
        .premium_lookup(Arc::new(FixedPremium(args.premium)))
        .permission_cache(cache);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    let mut interactions = Vec::new();
    for path in &args.fixtures {
        interactions.extend(read_fixture(path).await?);
    }
    info!(count = interactions.len(), "Loaded fixture interactions");

    let (tx, rx) = mpsc::channel(16);
    let delay = Duration::from_millis(args.delay_ms);
    let feeder = tokio::spawn(async move {
        for interaction in interactions {
            if tx.send(interaction).await.is_err() {
                break;
            }
            tokio::time::sleep(delay).await;
        }
    });

    runtime.run(rx).await?;
    feeder.abort();

    Ok(())
}
