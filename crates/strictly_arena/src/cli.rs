//! Command-line interface for strictly_arena.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Arena - five-in-a-row match host
#[derive(Parser, Debug)]
#[command(name = "strictly_arena")]
#[command(about = "Host, persist and replay five-in-a-row matches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the arena config file; defaults apply when absent
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the database path from the config
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a series between two random agents and store it
    Selfplay {
        /// Seed for the match's random draws (overrides the config)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of series to play
        #[arg(short, long, default_value = "1")]
        series: u32,
    },

    /// Rebuild a stored match from its moves and print the board
    Replay {
        /// Match identifier
        #[arg(long)]
        match_id: String,
    },

    /// List stored matches
    List,

    /// Validate the config and print it with defaults filled in
    Config,
}
