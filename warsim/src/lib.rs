//! Headless hotseat driver: load a scenario (or a save), replay a command
//! script, write the event log and a save.

pub mod script;

use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use warsim_core::{CommandError, EventLogObserver, Game, Phase, SimConfig, Victory};

/// What to run. Mirrors the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Built-in scenario name or path to a scenario file
    pub scenario: String,
    pub seed: u64,
    /// JSON `SimConfig` file
    pub config: Option<PathBuf>,
    /// JSONL command script
    pub commands: Option<PathBuf>,
    /// JSONL event log output
    pub events: Option<PathBuf>,
    pub save: Option<PathBuf>,
    /// Resume from a save instead of the scenario setup
    pub load: Option<PathBuf>,
    pub victory_rule: Option<String>,
    /// Fail on the first rejected command
    pub strict: bool,
}

/// Where the game stands after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub scenario: String,
    pub applied: usize,
    pub rejected: usize,
    pub round: u32,
    pub faction: String,
    pub phase: Phase,
    pub winner: Option<Victory>,
    pub checksum: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.scenario)?;
        writeln!(
            f,
            "Commands: {} applied, {} rejected",
            self.applied, self.rejected
        )?;
        writeln!(f, "Round {}, {}, {}", self.round, self.faction, self.phase)?;
        if let Some(winner) = &self.winner {
            writeln!(f, "Winner: {} ({})", winner.coalition, winner.reason)?;
        }
        write!(f, "Checksum: {:016x}", self.checksum)
    }
}

fn load_config(opts: &RunOptions) -> Result<SimConfig> {
    let Some(path) = &opts.config else {
        return Ok(SimConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {:?}", path))
}

fn open_game(opts: &RunOptions) -> Result<Game> {
    let rules = wardata::scenario::resolve(&opts.scenario)
        .with_context(|| format!("Failed to load scenario '{}'", opts.scenario))?;
    let config = load_config(opts)?;

    match &opts.load {
        Some(path) => {
            let blob = fs::read(path).with_context(|| format!("Failed to read save {:?}", path))?;
            Game::deserialize(rules, config, &blob)
                .with_context(|| format!("Failed to restore {:?}", path))
        }
        None => Ok(Game::new(rules, config, opts.seed)),
    }
}

/// Run a session end to end.
pub fn run(opts: &RunOptions) -> Result<Summary> {
    let mut game = open_game(opts)?;

    if let Some(path) = &opts.events {
        let observer = EventLogObserver::file(path)
            .with_context(|| format!("Failed to create event log {:?}", path))?;
        game.register_observer(Box::new(observer));
    }

    if let Some(rule) = &opts.victory_rule {
        game.set_victory_rule(rule)
            .with_context(|| format!("Cannot select victory rule '{}'", rule))?;
    }

    let commands = match &opts.commands {
        Some(path) => script::load_script(path)?,
        None => Vec::new(),
    };

    let mut applied = 0;
    let mut rejected = 0;
    for entry in &commands {
        match game.apply(&entry.command) {
            Ok(events) => {
                applied += 1;
                log::debug!("line {}: {} events", entry.line, events.len());
            }
            Err(CommandError::Rejected(e)) => {
                rejected += 1;
                if opts.strict {
                    bail!("line {}: {} rejected: {}", entry.line, entry.command.name(), e);
                }
                log::warn!("line {}: {} rejected: {}", entry.line, entry.command.name(), e);
            }
            Err(e) => return Err(anyhow!(e).context(format!("line {}", entry.line))),
        }
    }

    if let Some(path) = &opts.save {
        let blob = game.serialize().context("Failed to serialize game")?;
        fs::write(path, blob).with_context(|| format!("Failed to write save {:?}", path))?;
        log::info!("Saved game to {:?}", path);
    }

    Ok(Summary {
        scenario: game.rules().name().to_string(),
        applied,
        rejected,
        round: game.round(),
        faction: game.current_faction().clone(),
        phase: game.phase(),
        winner: game.winner().cloned(),
        checksum: game.checksum(),
    })
}
