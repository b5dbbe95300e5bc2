use mkvert::{config, logging, tools};
use mkvert_av::{EncodeOptions, WriterSink};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mp4maker")]
#[command(author, version, about = "Encode video files to M4V with iPod/Apple TV profiles")]
struct Cli {
    /// Enable two-pass encoding
    #[arg(short = '2', long)]
    two_pass: bool,

    /// Encoder profile (ipod, appletv-hd)
    #[arg(short, long)]
    profile: Option<String>,

    /// Video bitrate override in kbit/s
    #[arg(long, value_name = "KBPS")]
    bitrate: Option<u32>,

    /// Continue with the next file after a failure
    #[arg(long)]
    keep_going: bool,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Input files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(cli.verbose, false);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            println!("ERROR");
            ExitCode::FAILURE
        }
    }
}

/// Encode every input in order. Returns whether all of them succeeded.
fn run(cli: &Cli) -> Result<bool> {
    let config = config::load_config_or_default(cli.config.as_deref())?;

    let options = EncodeOptions {
        profile: cli
            .profile
            .clone()
            .unwrap_or_else(|| config.encode.profile.clone()),
        two_pass: cli.two_pass || config.encode.two_pass,
        bitrate: cli.bitrate,
    };

    println!("Using {} profile.", options.profile);
    if options.two_pass {
        println!("Two-pass encoding enabled.");
    }

    let encoder = tools::encoder(&config);
    let mut failed = 0;

    for input in &cli.inputs {
        println!("Encoding {}", input.with_extension("m4v").display());

        let result = encoder
            .encode(input, &options, &mut WriterSink::stdout())
            .with_context(|| format!("Failed to encode {}", input.display()));

        match result {
            Ok(output) => tracing::info!("Wrote {}", output.display()),
            Err(e) if cli.keep_going => {
                tracing::error!("{:#}", e);
                println!("ERROR");
                failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if failed > 0 {
        tracing::warn!("{} of {} files failed", failed, cli.inputs.len());
    }
    Ok(failed == 0)
}
