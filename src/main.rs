mod cli;

use mkvert::{config, logging, tools};
use mkvert_av::{
    check_tools, decide, Container, MediaFile, Pipeline, PipelineOptions, Strategy,
    SubtitleKind, Track, TrackList, WriterSink,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Convert {
            source,
            target,
            force_transcode,
        } => convert(
            &source,
            target.as_deref(),
            force_transcode,
            cli.config.as_deref(),
        ),
        Commands::Probe { file, json } => probe_file(&file, json, cli.config.as_deref()),
        Commands::CheckTools => run_check_tools(cli.config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            println!("ERROR");
            ExitCode::FAILURE
        }
    }
}

fn convert(
    source: &Path,
    target: Option<&Path>,
    force_transcode: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let source = MediaFile::resolve(source, Container::Mkv)?;
    let target = target
        .map(|t| MediaFile::resolve(t, Container::M4v))
        .transpose()?;

    let external = tools::external_tools(&config);
    let options = PipelineOptions {
        target: Container::M4v,
        force_transcode,
    };

    tracing::info!("Converting {}", source);
    let outcome = Pipeline::new(&external, options)
        .process(
            &source,
            target.as_ref().map(MediaFile::path),
            &mut WriterSink::stdout(),
        )
        .with_context(|| format!("Failed to convert {}", source))?;

    match outcome.subtitles {
        SubtitleKind::None => tracing::info!("Wrote {}", outcome.target.display()),
        kind => tracing::info!(
            "Wrote {} with {} subtitles",
            outcome.target.display(),
            kind
        ),
    }
    Ok(())
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    file: &'a Path,
    container: Container,
    tracks: Vec<Track>,
    subtitles: SubtitleKind,
    strategy: Strategy,
}

fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let source = MediaFile::resolve(file, Container::Mkv)?;
    if !source.path().exists() {
        anyhow::bail!("File does not exist: {:?}", source.path());
    }

    let external = tools::external_tools(&config);
    let tracks = TrackList::identify(&external, &source)?;
    let report = ProbeReport {
        file: source.path(),
        container: source.container(),
        tracks: tracks.tracks(),
        subtitles: tracks.subtitle_kind(),
        strategy: decide(&source, Container::M4v, &tracks, false),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&report)?;
        println!("{}", json_str);
    } else {
        println!("File: {}", report.file.display());
        println!("Container: {}", report.container);

        println!("\nTracks: {}", report.tracks.len());
        for track in &report.tracks {
            println!("  [{}] {:?} {}", track.id, track.kind, track.codec);
        }

        println!("\nSubtitles: {}", report.subtitles);
        println!("Convert would {}", report.strategy);
    }

    Ok(())
}

fn run_check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let report = check_tools(&config.tools.paths);
    let all_ok = tools::write_tool_report(&mut std::io::stdout(), &report)?;

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}
