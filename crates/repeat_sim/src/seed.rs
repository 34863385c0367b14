//! Seeds for reproducible simulations.
//!
//! A seed is a `u64`, optionally named by the string it was hashed from so
//! failing runs can be reported the way they were requested. Independent
//! random streams of one run come from [`SimSeed::derive`].

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;

/// Seed of one simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimSeed {
    /// Value the random streams are seeded with
    pub value: u64,
    /// String the value was hashed from, if any
    pub label: Option<String>,
}

impl SimSeed {
    /// Seed with a literal value
    #[must_use]
    pub fn from_literal(value: u64) -> Self {
        Self { value, label: None }
    }

    /// Seed hashed from a string
    #[must_use]
    pub fn from_string(label: impl Into<String>) -> Self {
        let label = label.into();
        let mut hasher = fnv::FnvHasher::default();
        hasher.write(label.as_bytes());
        Self {
            value: hasher.finish(),
            label: Some(label),
        }
    }

    /// Seed of the named stream within this run
    #[must_use]
    pub fn derive(&self, stream: &str) -> Self {
        let mut hasher = fnv::FnvHasher::default();
        hasher.write_u64(self.value);
        hasher.write(stream.as_bytes());
        Self::from_literal(hasher.finish())
    }

    /// RNG seeded with the value
    #[must_use]
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.value)
    }
}

impl Default for SimSeed {
    fn default() -> Self {
        Self::from_literal(42)
    }
}

impl fmt::Display for SimSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({:?})", self.value, label),
            None => write!(f, "{}", self.value),
        }
    }
}
