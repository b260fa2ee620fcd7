//! Strictly Arena - CLI
//!
//! Plays, stores and replays five-in-a-row matches.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::sync::Arc;
use strictly_arena::{
    Agent, ArenaConfig, MatchRegistry, MatchStore, RandomAgent, Seating, SqliteStore, play_series,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    EnvFilter::new("info,strictly_arena=debug,strictly_gomoku=debug")
                }),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ArenaConfig::from_file(path)?,
        None => ArenaConfig::default(),
    }
    .with_env_overrides();
    if let Some(path) = cli.db_path {
        config = config.with_database_path(path);
    }

    match cli.command {
        Command::Selfplay { seed, series } => run_selfplay(config, seed, series).await,
        Command::Replay { match_id } => run_replay(config, &match_id).await,
        Command::List => run_list(config).await,
        Command::Config => {
            config.validate()?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Plays `series` self-play series and reports each result.
#[instrument(skip(config))]
async fn run_selfplay(config: ArenaConfig, seed: Option<u64>, series: u32) -> Result<()> {
    let store = SqliteStore::open(config.database_path()).await?;
    let registry = MatchRegistry::new(Arc::new(store), *config.actor());
    let settings = config.selfplay();

    for round in 0..series {
        let mut rules = config.match_config().clone();
        if let Some(seed) = seed {
            rules.seed = seed.wrapping_add(u64::from(round));
        }
        let seating = Seating::new(settings.first().clone(), settings.second().clone());
        let handle = registry.create(rules, seating).await?;

        let agent_seed = settings.agent_seed().wrapping_add(u64::from(round) * 2);
        let mut agents: [Box<dyn Agent>; 2] = [
            Box::new(RandomAgent::new(settings.first().clone(), agent_seed)),
            Box::new(RandomAgent::new(settings.second().clone(), agent_seed + 1)),
        ];
        let report = play_series(&handle, &mut agents, settings.limits()).await?;
        registry.close(handle.match_id()).await;

        println!("match {}", report.match_id());
        for game in report.games() {
            println!(
                "  game {}: {} ({}, {} moves)",
                game.game_number(),
                game.winner().map_or("draw".to_string(), |s| s.to_string()),
                game.reason(),
                game.moves()
            );
        }
        println!(
            "  winner: {} after {} rejected actions",
            report.winner_name().as_deref().unwrap_or("none"),
            report.rejections()
        );
    }
    info!(series, "Self-play finished");
    Ok(())
}

/// Rebuilds a stored match and prints its current board.
#[instrument(skip(config))]
async fn run_replay(config: ArenaConfig, match_id: &str) -> Result<()> {
    let store = SqliteStore::open(config.database_path()).await?;
    let registry = MatchRegistry::new(Arc::new(store), *config.actor());
    let handle = registry
        .hydrate(match_id)
        .await
        .with_context(|| format!("Failed to rebuild match '{}'", match_id))?;
    let snapshot = handle.snapshot().await?;
    registry.close(match_id).await;

    println!("{}", snapshot.board);
    println!(
        "game {} | to move: {} | seats {}-{} | winner: {}",
        snapshot.game_number,
        snapshot.side_to_move,
        snapshot.scores.first,
        snapshot.scores.second,
        snapshot.series_winner.map_or("none".to_string(), |s| s.to_string())
    );
    Ok(())
}

/// Prints stored matches.
#[instrument(skip(config))]
async fn run_list(config: ArenaConfig) -> Result<()> {
    let store = SqliteStore::open(config.database_path()).await?;
    let matches = store.list_matches().await?;
    for summary in &matches {
        println!(
            "{}  {}  winner={}  moves={}",
            summary.match_id,
            summary.status.to_db_string(),
            summary.winner.map_or("-".to_string(), |s| s.to_string()),
            summary.total_moves
        );
    }
    info!(count = matches.len(), "Matches listed");
    Ok(())
}
