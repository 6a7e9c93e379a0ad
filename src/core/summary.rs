use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{Diagnostics, TrainingState},
    Float,
};

/// A struct that holds the results of a training run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrainingSummary {
    /// A message describing why training stopped.
    pub message: String,
    /// The state of the trainer when it stopped.
    pub state: TrainingState,
    /// Flag that says whether or not the log-likelihood converged.
    pub converged: bool,
    /// The number of completed EM iterations.
    pub iterations: usize,
    /// The average log-likelihood of the training data computed during the last E-step.
    ///
    /// This is the likelihood of the parameters *before* the last M-step.
    pub log_likelihood: Float,
    /// The average log-likelihood of every E-step, in order.
    pub log_likelihood_history: Vec<Float>,
    /// The number of training samples.
    pub n_samples: usize,
    /// The number of mixture components.
    pub n_components: usize,
    /// The dimension of the samples.
    pub n_inputs: usize,
    /// The diagnostics of the last M-step.
    pub diagnostics: Diagnostics,
}

impl Display for TrainingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title = format!(
            "╒══════════════════════════════════════════════════════════════════════════╕
│{:^74}│",
            "TRAINING RESULTS",
        );
        let status = format!(
            "╞════════════════════════╤══════════════════════════╤══════════════════════╡
│ Status: {:<14} │ avg ln L: {:>+14.6E} │ #iterations: {:>7} │",
            self.state.to_string(),
            self.log_likelihood,
            self.iterations,
        );
        let shape = format!(
            "├────────────────────────┼──────────────────────────┼──────────────────────┤
│ #samples: {:>12} │ #components: {:>11} │ #inputs: {:>11} │",
            self.n_samples, self.n_components, self.n_inputs,
        );
        let diagnostics = format!(
            "├────────────────────────┴──────────────────────────┴──────────────────────┤
│ Below threshold: {:<55} │
│ Floored variances: {:<53} │",
            format!("{:?}", self.diagnostics.below_threshold),
            self.diagnostics.floored_variances,
        );
        let message = format!(
            "├──────────────────────────────────────────────────────────────────────────┤
│ Message: {:<63} │
└──────────────────────────────────────────────────────────────────────────┘",
            self.message,
        );
        write!(f, "{title}\n{status}\n{shape}\n{diagnostics}\n{message}")
    }
}
