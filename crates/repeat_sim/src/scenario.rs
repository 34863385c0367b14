//! Seeded edit scripts.
//!
//! A scenario is a list of rounds. Each round edits the item list and then
//! synchronizes it, optionally interrupting the pass after a few frames.

use crate::seed::SimSeed;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One list edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edit {
    /// Insert a new item at a position (clamped to the length)
    Insert {
        /// Target position
        at: usize,
        /// New item
        item: u32,
    },
    /// Remove the item at a position (modulo the length)
    Remove {
        /// Target position
        at: usize,
    },
    /// Move an item between positions (both modulo the length)
    Move {
        /// Source position
        from: usize,
        /// Destination position
        to: usize,
    },
    /// Swap the item at a position for a new one
    Replace {
        /// Target position
        at: usize,
        /// New item
        item: u32,
    },
    /// Reverse the whole list
    Reverse,
    /// Shuffle the whole list
    Shuffle {
        /// Shuffle seed
        seed: u64,
    },
    /// Remove every item
    Clear,
}

impl Edit {
    /// Apply the edit to `items`
    pub fn apply(&self, items: &mut Vec<u32>) {
        let len = items.len();
        match *self {
            Edit::Insert { at, item } => items.insert(at.min(len), item),
            Edit::Remove { at } if len > 0 => {
                items.remove(at % len);
            }
            Edit::Move { from, to } if len > 0 => {
                let item = items.remove(from % len);
                items.insert(to % len, item);
            }
            Edit::Replace { at, item } if len > 0 => items[at % len] = item,
            Edit::Reverse => items.reverse(),
            Edit::Shuffle { seed } => items.shuffle(&mut ChaCha8Rng::seed_from_u64(seed)),
            Edit::Clear => items.clear(),
            Edit::Remove { .. } | Edit::Move { .. } | Edit::Replace { .. } => {}
        }
    }
}

/// What happens to a round's pass before it completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interruption {
    /// Run the pass to completion
    None,
    /// Let the next round's pass supersede it after some frames
    Restart {
        /// Frames delivered before moving on
        after_frames: u32,
    },
    /// Abort it after some frames
    Abort {
        /// Frames delivered before aborting
        after_frames: u32,
    },
}

/// Edits plus interruption of one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Edits applied before synchronizing
    pub edits: Vec<Edit>,
    /// Interruption of the round's pass
    pub interruption: Interruption,
}

impl Round {
    /// Apply every edit of the round to `items`
    pub fn apply(&self, items: &mut Vec<u32>) {
        for edit in &self.edits {
            edit.apply(items);
        }
    }
}

/// A full edit script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Rounds in order
    pub rounds: Vec<Round>,
}

impl Scenario {
    /// Item list after each round
    #[must_use]
    pub fn sequences(&self) -> Vec<Vec<u32>> {
        let mut items = Vec::new();
        self.rounds
            .iter()
            .map(|round| {
                round.apply(&mut items);
                items.clone()
            })
            .collect()
    }

    /// Number of rounds with an interruption
    #[must_use]
    pub fn interrupted_rounds(&self) -> usize {
        self.rounds
            .iter()
            .filter(|round| round.interruption != Interruption::None)
            .count()
    }
}

/// Shape of generated scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioModel {
    /// Number of rounds
    pub rounds: usize,
    /// Maximum edits per round
    pub max_edits: usize,
    /// Upper bound on the list length
    pub max_len: usize,
    /// Probability that a round is superseded mid-pass
    pub restart_probability: f64,
    /// Probability that a round is aborted mid-pass
    pub abort_probability: f64,
    /// Maximum frames delivered before an interruption
    pub max_frames_before_interrupt: u32,
}

impl ScenarioModel {
    /// Create a model with default probabilities
    #[must_use]
    pub fn new(rounds: usize) -> Self {
        Self {
            rounds,
            max_edits: 6,
            max_len: 48,
            restart_probability: 0.25,
            abort_probability: 0.1,
            max_frames_before_interrupt: 3,
        }
    }

    /// Set the list length bound
    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Set interruption probabilities
    #[must_use]
    pub fn with_interruptions(mut self, restart: f64, abort: f64) -> Self {
        self.restart_probability = restart;
        self.abort_probability = abort;
        self
    }

    /// Generate a scenario from `seed`
    #[must_use]
    pub fn generate(&self, seed: &SimSeed) -> Scenario {
        let mut rng = seed.derive("scenario").rng();
        let mut items = Vec::new();
        let mut next_item = 0u32;
        let mut rounds = Vec::with_capacity(self.rounds);

        for round_index in 0..self.rounds {
            // the first round fills the list so later edits have material
            let edit_count = if round_index == 0 {
                self.max_len / 2
            } else {
                rng.gen_range(1..=self.max_edits.max(1))
            };
            let mut edits = Vec::with_capacity(edit_count);
            for _ in 0..edit_count {
                let edit = self.random_edit(&mut rng, items.len(), &mut next_item, round_index == 0);
                edit.apply(&mut items);
                edits.push(edit);
            }
            let interruption = self.random_interruption(&mut rng);
            rounds.push(Round { edits, interruption });
        }

        Scenario { rounds }
    }

    fn random_edit(&self, rng: &mut ChaCha8Rng, len: usize, next_item: &mut u32, fill: bool) -> Edit {
        let mut fresh = || {
            let item = *next_item;
            *next_item += 1;
            item
        };
        if fill || len == 0 {
            return Edit::Insert {
                at: rng.gen_range(0..=len),
                item: fresh(),
            };
        }

        let position = rng.gen_range(0..len);
        match rng.gen_range(0..100u32) {
            0..=29 if len < self.max_len => Edit::Insert {
                at: rng.gen_range(0..=len),
                item: fresh(),
            },
            0..=49 => Edit::Remove { at: position },
            50..=74 => Edit::Move {
                from: position,
                to: rng.gen_range(0..len),
            },
            75..=89 => Edit::Replace {
                at: position,
                item: fresh(),
            },
            90..=94 => Edit::Reverse,
            95..=98 => Edit::Shuffle { seed: rng.gen_range(0..u64::MAX) },
            _ => Edit::Clear,
        }
    }

    fn random_interruption(&self, rng: &mut ChaCha8Rng) -> Interruption {
        let roll: f64 = rng.gen_range(0.0..1.0);
        let after_frames = rng.gen_range(0..=self.max_frames_before_interrupt);
        if roll < self.abort_probability {
            Interruption::Abort { after_frames }
        } else if roll < self.abort_probability + self.restart_probability {
            Interruption::Restart { after_frames }
        } else {
            Interruption::None
        }
    }
}

impl Default for ScenarioModel {
    fn default() -> Self {
        Self::new(16)
    }
}
