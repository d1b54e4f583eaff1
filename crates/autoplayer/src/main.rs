//! Headless autoplayer CLI.
//!
//! Usage:
//!   autoplayer decide --snapshot state.json [--policy terrain]
//!   autoplayer simulate --snapshot state.json --ticks 600 [--record run.json]
//!   autoplayer health [--decision-url http://localhost:5001]
//!
//! Snapshot files use the game-state endpoint's JSON format, so a response
//! captured from a running game can be fed in directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use autoplayer::config::{AutoplayConfig, PolicyChoice};
use autoplayer::driver::Autoplayer;
use autoplayer::logging;
use autoplayer::recording::verify_tape;
use autoplayer_core::feed::{FetchTrigger, SnapshotCell};
use autoplayer_core::snapshot::WorldSnapshot;
use autoplayer_remote::wire::parse_game_state;
use autoplayer_remote::RemotePolicy;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autoplayer")]
#[command(about = "Frame-accurate autoplayer for a 2D platformer")]
struct Cli {
    /// JSON config file, layered under AUTOPLAYER_* environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive (overrides the configured one)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the maneuver a policy picks for a snapshot
    Decide {
        /// Game-state JSON file
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long, value_enum)]
        policy: Option<PolicyChoice>,
    },
    /// Run dynamic playback against a fixed snapshot
    Simulate {
        /// Game-state JSON file, republished at the fetch cadence
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long, default_value_t = 600)]
        ticks: u64,
        #[arg(long, value_enum)]
        policy: Option<PolicyChoice>,
        /// Write the recorded session here as JSON
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Check that the decision service is up
    Health {
        #[arg(long)]
        decision_url: Option<String>,
    },
}

/// Fetch trigger that republishes one snapshot on every request.
struct FixedSnapshot {
    cell: Arc<SnapshotCell>,
    snapshot: WorldSnapshot,
}

impl FetchTrigger for FixedSnapshot {
    fn request_fetch(&self) -> bool {
        self.cell.publish(self.snapshot.clone());
        true
    }
}

fn load_snapshot(path: &Path) -> anyhow::Result<Option<WorldSnapshot>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot file {}", path.display()))?;
    parse_game_state(&body).with_context(|| format!("failed to parse {}", path.display()))
}

fn decide(config: &AutoplayConfig, snapshot: &Path) -> anyhow::Result<()> {
    let snapshot = load_snapshot(snapshot)?;
    let mut policy = config.build_policy()?;
    let maneuver = policy.decide(snapshot.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&maneuver)?);
    Ok(())
}

fn simulate(
    config: &AutoplayConfig,
    snapshot: &Path,
    ticks: u64,
    record: Option<&Path>,
) -> anyhow::Result<()> {
    let Some(snapshot) = load_snapshot(snapshot)? else {
        bail!("snapshot file holds no game state");
    };

    let mut player = Autoplayer::new(config.build_policy()?, config.fetch_interval_ticks);
    player.set_trigger(Box::new(FixedSnapshot {
        cell: player.feed(),
        snapshot,
    }));
    player.start_recording();
    player.start_dynamic();

    let mut decisions = 0u64;
    let mut active_ticks = 0u64;
    for _ in 0..ticks {
        if !player.tick().is_none() {
            active_ticks += 1;
        }
        if player.diagnostics().decision.is_some() {
            decisions += 1;
        }
    }

    let log = player
        .finish_recording()
        .context("recorder was not attached")?;
    let verify = verify_tape(&log);

    let summary = serde_json::json!({
        "policy": player.sequencer().policy_name(),
        "ticks": ticks,
        "ticks_with_input": active_ticks,
        "decisions": decisions,
        "failed_decisions": player.sequencer().failed_decisions(),
        "tape_runs": log.tape.len(),
        "tape_verified": verify.is_ok(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = record {
        let json = serde_json::to_string_pretty(&log)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write recording {}", path.display()))?;
    }
    if let Some(divergence) = verify.first_divergence {
        bail!(
            "tape diverged at tick {}: expected {}, got {}",
            divergence.tick,
            divergence.expected,
            divergence.actual
        );
    }
    Ok(())
}

fn health(config: &AutoplayConfig) -> anyhow::Result<()> {
    let policy = RemotePolicy::new(&config.decision_url, config.http_timeout())?;
    policy
        .health()
        .with_context(|| format!("decision service at {} is not healthy", policy.base_url()))?;
    println!("{}: healthy", policy.base_url());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AutoplayConfig::load(cli.config.as_deref())?;
    if let Some(filter) = cli.log {
        config.log_filter = filter;
    }
    logging::init(&config.log_filter, config.debug_log_path.as_deref());

    match cli.command {
        Command::Decide { snapshot, policy } => {
            if let Some(policy) = policy {
                config.policy = policy;
            }
            decide(&config, &snapshot)
        }
        Command::Simulate {
            snapshot,
            ticks,
            policy,
            record,
        } => {
            if let Some(policy) = policy {
                config.policy = policy;
            }
            simulate(&config, &snapshot, ticks, record.as_deref())
        }
        Command::Health { decision_url } => {
            if let Some(url) = decision_url {
                config.decision_url = url;
            }
            health(&config)
        }
    }
}
