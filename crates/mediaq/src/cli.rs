use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mediaq::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "mediaq")]
#[command(about = "Media download queue: fetch, relocate, notify and expire", long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "MEDIAQ_CONFIG")]
    pub config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the download worker until Ctrl-C
    Worker,
    /// Serve the HTTP intake and download endpoints
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Queue every request in a double-space separated list file
    Import { file: PathBuf },
    /// Print job counts by status
    Status,
}
