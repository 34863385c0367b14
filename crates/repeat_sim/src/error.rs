//! Simulation errors.

use repeat_core::CoreError;

/// Result type of simulation runs
pub type SimOutcome<T> = Result<T, SimError>;

/// Why a simulation run failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The repeat rejected an operation
    #[error("round {round}: repeat error: {source}")]
    Repeat {
        /// Round number
        round: usize,
        /// Underlying error
        #[source]
        source: CoreError,
    },

    /// The repeat diverged from the reference rendering
    #[error("round {round}: {detail}")]
    Divergence {
        /// Round number
        round: usize,
        /// What differed
        detail: String,
    },
}

impl SimError {
    /// Round the error happened in
    #[must_use]
    pub fn round(&self) -> usize {
        match self {
            Self::Repeat { round, .. } | Self::Divergence { round, .. } => *round,
        }
    }
}

/// Attach a round number to repeat errors
pub(crate) trait InRound<T> {
    fn in_round(self, round: usize) -> SimOutcome<T>;
}

impl<T> InRound<T> for Result<T, CoreError> {
    fn in_round(self, round: usize) -> SimOutcome<T> {
        self.map_err(|source| SimError::Repeat { round, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_error_display() {
        let err = SimError::Divergence {
            round: 3,
            detail: "attached 2, expected 3".to_string(),
        };
        assert_eq!(err.to_string(), "round 3: attached 2, expected 3");
        assert_eq!(err.round(), 3);
    }

    #[test]
    fn test_in_round() {
        let result: Result<(), CoreError> = Err(CoreError::MissingIdentitySelector);
        let err = result.in_round(7).unwrap_err();
        assert_eq!(err.round(), 7);
        assert!(err.to_string().starts_with("round 7: repeat error"));
    }
}
