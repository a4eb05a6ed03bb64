//! # Warsim Core
//!
//! Deterministic rules engine for a five-faction, two-coalition territorial
//! wargame.
//!
//! The engine is command driven: every player action is a [`Command`] run
//! against the [`WorldState`] by [`execute_command`]. The [`Game`] facade
//! wraps that with all-or-nothing semantics, invariant checking and event
//! delivery.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │   Player    │────▶│   Command    │────▶│ execute_command │
//! │ (script/UI) │     │              │     │ (on a clone)    │
//! └─────────────┘     └──────────────┘     └────────┬────────┘
//!                                                   │
//!                     ┌──────────────┐     ┌────────▼────────┐
//!                     │  Observers   │◀────│  invariants ok? │
//!                     │  (events)    │     │  commit state   │
//!                     └──────────────┘     └─────────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`WorldState`] | Ownership, stacks, unit arena, treasuries, dice |
//! | [`Command`] | Player actions (move, load, purchase, end phase, ...) |
//! | [`Game`] | Facade: apply commands, query state, save and load |
//! | [`GameEvent`] | Structured record of everything a command changed |
//! | [`SimObserver`] | Receives events after each committed command |
//!
//! Rule values (unit stats, map, victory presets) come from
//! [`wardata::Rules`]; the phase sequence, coalition pairing and dice
//! mechanics are fixed here.

pub mod config;
pub mod game;
pub mod input;
pub mod invariants;
pub mod observer;
pub mod persist;
pub mod rng;
pub mod state;
pub mod step;
pub mod systems;
pub mod testing;

pub use config::SimConfig;
pub use game::{CommandError, Game, TerritoryView};
pub use input::Command;
pub use invariants::{check_invariants, InvariantViolation};
pub use observer::{
    DestroyCause, DieRoll, EventLogObserver, GameEvent, LoggedEvent, ObserverError,
    ObserverRegistry, SimObserver,
};
pub use persist::{load_state, save_state, PersistError};
pub use rng::DiceRng;
pub use state::{
    PendingBattle, Phase, PurchaseEntry, Unit, UnitId, Victory, WorldState,
};
pub use step::{execute_command, ActionError};
pub use systems::{
    AutoCasualties, BattleOutcome, BattleResult, CasualtyCandidate, CasualtySelector, Side,
};
