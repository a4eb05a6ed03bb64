//! Game mechanic constants (defines).
//!
//! Values that are fixed by the ruleset rather than by scenario data.

/// Dice constants
pub mod dice {
    /// Faces on the combat die (rolls are 1..=SIDES)
    pub const SIDES: u8 = 6;
}

/// Combat constants
pub mod combat {
    /// Safety cap on rounds in a single battle.
    pub const MAX_ROUNDS: u32 = 20;
}

/// Unit defaults applied when a unit type omits the field
pub mod unit {
    /// Hit points of an ordinary unit
    pub const DEFAULT_HIT_POINTS: u8 = 1;
}

/// Save format constants
pub mod save {
    /// Bumped whenever the serialized world state changes shape.
    pub const FORMAT_VERSION: u32 = 1;
}
