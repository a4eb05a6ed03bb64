//! Rule systems. Each takes the world state by `&mut` and reports what it
//! changed as [`crate::observer::GameEvent`]s.

pub mod combat;
pub mod economy;
pub mod landing;
pub mod movement;
pub mod turn;
pub mod victory;

pub use combat::{
    auto_casualties, resolve_battle, AutoCasualties, BattleOutcome, BattleResult,
    CasualtyCandidate, CasualtySelector, Side,
};
pub use economy::{collect_income, mobilize};
pub use landing::enforce_landing;
pub use movement::{apply_move, propose_move, reset_movement, MoveKind};
pub use turn::end_phase;
pub use victory::evaluate;
