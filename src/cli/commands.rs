use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fogmate")]
#[command(about = "A fog-of-war chess server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the game server
    ///
    /// Examples:
    ///   fogmate serve
    ///   fogmate serve --bind 0.0.0.0:3001
    ///   fogmate serve --config ./fogmate.toml
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(short, long)]
        bind: Option<String>,
        /// Configuration file. Defaults to config.toml in the platform config directory
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
