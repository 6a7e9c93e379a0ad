use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{algorithms::Diagnostics, traits::Status, Float};

/// The lifecycle of an [`EMTrainer`](crate::algorithms::EMTrainer) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingState {
    /// No run has been started.
    #[default]
    Uninitialized,
    /// The model has been seeded (or copied from the prior) and no step has run yet.
    Initialized,
    /// At least one EM step has completed and no terminator has fired.
    Iterating,
    /// The log-likelihood changed by less than the convergence threshold.
    Converged,
    /// The iteration budget ran out before convergence. This is a normal terminal state.
    Exhausted,
    /// A user-supplied terminator ended the run.
    Stopped,
}

impl Display for TrainingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initialized => "Initialized",
            Self::Iterating => "Iterating",
            Self::Converged => "Converged",
            Self::Exhausted => "Exhausted",
            Self::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// A status struct tracking the progress of an EM training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EMStatus {
    /// A [`String`] message that can be set by terminators.
    pub message: String,
    /// The current [`TrainingState`].
    pub state: TrainingState,
    /// Flag that says whether or not the log-likelihood converged.
    pub converged: bool,
    /// The number of completed EM steps.
    pub iterations: usize,
    /// The number of training samples.
    pub n_samples: usize,
    /// The average log-likelihood computed during the most recent E-step.
    pub log_likelihood: Float,
    /// The average log-likelihood of the step before the most recent one ([`None`] until two
    /// steps have run).
    pub previous_log_likelihood: Option<Float>,
    /// The average log-likelihood of every completed step.
    pub log_likelihood_history: Vec<Float>,
    /// The diagnostics of the most recent M-step.
    pub diagnostics: Diagnostics,
}

impl Status for EMStatus {
    fn reset(&mut self) {
        *self = Self::default();
    }
    fn converged(&self) -> bool {
        self.converged
    }
    fn message(&self) -> &str {
        &self.message
    }
    fn update_message(&mut self, message: &str) {
        self.message = message.to_string();
    }
}

impl EMStatus {
    /// Record the outcome of one EM step.
    pub fn record_step(&mut self, log_likelihood: Float, diagnostics: Diagnostics) {
        if !self.log_likelihood_history.is_empty() {
            self.previous_log_likelihood = Some(self.log_likelihood);
        }
        self.log_likelihood = log_likelihood;
        self.log_likelihood_history.push(log_likelihood);
        self.diagnostics = diagnostics;
        self.iterations += 1;
        self.state = TrainingState::Iterating;
    }
    /// Marks the run as converged.
    pub fn set_converged(&mut self) {
        self.converged = true;
        self.state = TrainingState::Converged;
    }
    /// Moves the run into a terminal `state` with the given message.
    pub fn finish(&mut self, state: TrainingState, message: &str) {
        self.state = state;
        self.update_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_step_tracks_history() {
        let mut status = EMStatus::default();
        assert_eq!(status.state, TrainingState::Uninitialized);
        status.record_step(-3.0, Diagnostics::default());
        assert_eq!(status.previous_log_likelihood, None);
        status.record_step(-2.0, Diagnostics::default());
        assert_eq!(status.previous_log_likelihood, Some(-3.0));
        assert_eq!(status.log_likelihood, -2.0);
        assert_eq!(status.log_likelihood_history, vec![-3.0, -2.0]);
        assert_eq!(status.iterations, 2);
        assert_eq!(status.state, TrainingState::Iterating);
        status.set_converged();
        assert!(Status::converged(&status));
        status.reset();
        assert_eq!(status.iterations, 0);
        assert!(status.log_likelihood_history.is_empty());
    }
}
