use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use warsim::RunOptions;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a wargame command script", long_about = None)]
struct Args {
    /// Built-in scenario (lite-1941) or path to a scenario JSON file
    #[arg(long, default_value = "lite-1941")]
    scenario: String,

    /// Dice seed for a new game
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Engine settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Command script, one JSON command per line
    #[arg(short, long)]
    commands: Option<PathBuf>,

    /// Write events as JSON lines to this file
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Save the final game state here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume from a save instead of starting fresh
    #[arg(long)]
    load: Option<PathBuf>,

    /// Victory preset to play with
    #[arg(long)]
    victory_rule: Option<String>,

    /// Stop at the first rejected command
    #[arg(long)]
    strict: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let summary = warsim::run(&RunOptions {
        scenario: args.scenario,
        seed: args.seed,
        config: args.config,
        commands: args.commands,
        events: args.events,
        save: args.save,
        load: args.load,
        victory_rule: args.victory_rule,
        strict: args.strict,
    })?;

    println!("{}", summary);
    Ok(())
}
