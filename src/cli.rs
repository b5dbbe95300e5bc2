use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mkvert")]
#[command(author, version, about = "Convert MKV files to M4V, keeping their subtitles")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, short_alias = 's', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a file to M4V and mux its subtitles into the result
    Convert {
        /// Source file (".mkv" is appended when there is no extension)
        #[arg(required = true)]
        source: PathBuf,

        /// Already-encoded target; only the subtitles are muxed into it
        target: Option<PathBuf>,

        /// Re-encode even when the streams could be copied
        #[arg(long)]
        force_transcode: bool,
    },

    /// Show a file's tracks and what convert would do with it
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,
}
