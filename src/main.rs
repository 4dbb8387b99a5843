// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, Level};

use trackseq::sequencer::SequencerTiming;
use trackseq::synth::LogBackend;
use trackseq::{Engine, EngineConfig, Song, Synthesizer};

fn print_usage() {
    println!("trackseq - Step-sequencer tracker");
    println!();
    println!("Usage: trackseq [OPTIONS]");
    println!();
    println!("Plays a demo arrangement through the logging synthesizer.");
    println!();
    println!("Options:");
    println!("  --config <PATH>   Load engine settings from a YAML or TOML file");
    println!("  --bars <N>        Number of bars to play (default 2)");
    println!("  --tempo <BPM>     Override the configured tempo");
    println!("  --print-config    Print the effective settings as YAML and exit");
    println!("  --verbose         Log transport changes");
    println!("  --trace           Log every note and frame");
    println!("  --help            Show this help message");
}

#[derive(Debug)]
struct Options {
    config: Option<PathBuf>,
    bars: usize,
    tempo: Option<f64>,
    print_config: bool,
    level: Level,
}

fn parse_args(args: &[String]) -> Result<Option<Options>> {
    let mut options = Options {
        config: None,
        bars: 2,
        tempo: None,
        print_config: false,
        level: Level::INFO,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--bars" => {
                let value = iter.next().ok_or_else(|| anyhow!("--bars needs a number"))?;
                options.bars = value
                    .parse()
                    .map_err(|_| anyhow!("Invalid bar count: {}", value))?;
            }
            "--tempo" => {
                let value = iter.next().ok_or_else(|| anyhow!("--tempo needs a BPM value"))?;
                options.tempo = Some(
                    value
                        .parse()
                        .map_err(|_| anyhow!("Invalid tempo: {}", value))?,
                );
            }
            "--print-config" => options.print_config = true,
            "--verbose" => options.level = options.level.max(Level::DEBUG),
            "--trace" => options.level = Level::TRACE,
            "--help" | "-h" => return Ok(None),
            other => {
                eprintln!("Unknown option: {}", other);
                return Ok(None);
            }
        }
    }
    Ok(Some(options))
}

/// Two channels of material: a bass line on every bar and alternating
/// melody patterns on the second channel.
fn build_demo(song: &mut Song) -> trackseq::Result<()> {
    let bass = song.new_pattern(0)?;
    for (step, key) in [36, 36, 43, 41].into_iter().enumerate() {
        song.add_note(0, bass, step as f64 * 2.0, key, 1.5)?;
    }
    for bar in 0..song.length() {
        song.set_pattern(0, bar, bass)?;
    }

    if song.channels().len() < 2 {
        return Ok(());
    }

    let call = song.new_pattern(1)?;
    for (time, key) in [(0.0, 60), (1.0, 64), (2.0, 67), (3.0, 72), (4.0, 67), (6.0, 64)] {
        song.add_note(1, call, time, key, 0.5)?;
    }
    let answer = song.new_pattern(1)?;
    for (time, key, length) in [(0.0, 62, 1.0), (2.0, 65, 1.0), (4.0, 69, 3.0)] {
        song.add_note(1, answer, time, key, length)?;
    }
    for bar in 0..song.length() {
        let pattern = if bar % 2 == 0 { call } else { answer };
        song.set_pattern(1, bar, pattern)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(options) = parse_args(&args)? else {
        print_usage();
        return Ok(());
    };

    tracing_subscriber::fmt()
        .with_max_level(options.level)
        .with_target(false)
        .init();

    let mut config = match &options.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(tempo) = options.tempo {
        config.tempo = tempo;
    }
    config.validate().context("Invalid settings")?;

    if options.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let mut song = config.build_song()?;
    build_demo(&mut song).context("Failed to build demo arrangement")?;

    let seconds_per_bar = SequencerTiming::with_tempo(song.tempo()).seconds_per_bar();
    let run_time = Duration::from_secs_f64(seconds_per_bar * options.bars as f64);
    info!(
        channels = song.channels().len(),
        length = song.length(),
        tempo = song.tempo(),
        bars = options.bars,
        "playing demo"
    );

    let (engine, mut events) = Engine::spawn(song, &config);
    let mut synth = Synthesizer::new(LogBackend).with_volume(config.volume);
    let player = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            synth.handle_event(&event);
        }
    });

    engine.play().await?;
    tokio::time::sleep(run_time).await;
    let song = engine.shutdown().await?;
    info!(position = song.position(), "stopped");

    // Dropping the song closes the event stream
    drop(song);
    player.await.context("Synth task failed")?;
    Ok(())
}
