//! Deterministic dice.
//!
//! SplitMix64: 8 bytes of state, trivially serializable, identical output on
//! every platform. The seed and draw count ride along in saves so a restored
//! game rolls exactly the dice the uninterrupted one would have.

use serde::{Deserialize, Serialize};
use wardata::defines;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceRng {
    seed: u64,
    state: u64,
    draws: u64,
}

impl DiceRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            state: seed,
            draws: 0,
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        self.draws += 1;
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Roll one die, 1..=SIDES.
    pub fn roll_die(&mut self) -> u8 {
        (self.next_u64() % defines::dice::SIDES as u64) as u8 + 1
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    /// Values drawn since seeding.
    pub fn draws(&self) -> u64 {
        self.draws
    }
}
