use crate::{
    algorithms::mstep::{
        check_statistics, floor_variances, Diagnostics, ParameterUpdate, UpdateOptions,
    },
    core::{utils::maybe_warn, SufficientStatistics},
    traits::{Dataset, Initializer, MStep, Mixture},
    Float, GmmResult,
};

/// The maximum-likelihood M-step.
///
/// Every parameter is re-estimated purely from the accumulated statistics:
/// ```math
/// w_k' = \frac{n_k}{T}, \quad
/// \mu_k' = \frac{\texttt{sum\_px}_k}{n_k}, \quad
/// \sigma_k'^2 = \frac{\texttt{sum\_pxx}_k}{n_k} - (\mu_k')^2
/// ```
/// A component without responsibility mass keeps its previous weight and the weights are then
/// renormalized, so the other weights are rescaled and no longer equal $`n_k / T`$ exactly. A
/// component below the responsibility threshold keeps its previous mean and variance. Such
/// components are reported as candidates for reseeding.
#[derive(Debug, Clone, Default)]
pub struct MaximumLikelihood {
    options: UpdateOptions,
    initializer: Option<Box<dyn Initializer>>,
}

impl MaximumLikelihood {
    /// Seed the model with `initializer` before the first step. Without an initializer, training
    /// starts from the current parameters of the model.
    pub fn with_initializer<I: Initializer + 'static>(mut self, initializer: I) -> Self {
        self.initializer = Some(Box::new(initializer));
        self
    }
    /// Start training from the current parameters of the model.
    pub fn without_initializer(mut self) -> Self {
        self.initializer = None;
        self
    }
    /// Set the [`UpdateOptions`].
    pub fn with_options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }
    /// The [`UpdateOptions`] in use.
    pub const fn options(&self) -> &UpdateOptions {
        &self.options
    }
}

impl MStep for MaximumLikelihood {
    fn initialize(
        &mut self,
        model: &mut dyn Mixture,
        dataset: &dyn Dataset,
        _prior: Option<&dyn Mixture>,
    ) -> GmmResult<()> {
        if let Some(initializer) = &mut self.initializer {
            initializer.initialize(model, dataset)?;
        }
        Ok(())
    }

    fn compute_update(
        &mut self,
        stats: &SufficientStatistics,
        model: &dyn Mixture,
        _prior: Option<&dyn Mixture>,
    ) -> GmmResult<ParameterUpdate> {
        check_statistics(stats, model)?;
        let n = stats.n();
        let total = stats.n_samples() as Float;
        let below_threshold = self.options.below_threshold(stats);
        let mut update = ParameterUpdate::default();

        if self.options.update_weights() {
            let mut weights = model.weights().clone();
            for (k, w) in weights.iter_mut().enumerate() {
                if n[k] > 0.0 {
                    *w = n[k] / total;
                }
            }
            weights /= weights.sum();
            update.weights = Some(weights);
        }

        let mut means = model.means().clone();
        if self.options.update_means() {
            for k in 0..means.nrows() {
                if below_threshold.contains(&k) {
                    continue;
                }
                means.set_row(k, &stats.sum_px().row(k).unscale(n[k]));
            }
        }

        let mut floored_variances = 0;
        if self.options.update_variances() {
            let mut variances = model.variances().clone();
            for k in 0..variances.nrows() {
                if below_threshold.contains(&k) {
                    continue;
                }
                for d in 0..variances.ncols() {
                    let mu = means[(k, d)];
                    variances[(k, d)] = stats.sum_pxx()[(k, d)] / n[k] - mu * mu;
                }
            }
            floored_variances = floor_variances(&mut variances, self.options.variance_floor());
            update.variances = Some(variances);
        }
        if self.options.update_means() {
            update.means = Some(means);
        }

        if !below_threshold.is_empty() {
            maybe_warn(&format!(
                "component(s) {below_threshold:?} received too little responsibility and kept their previous parameters"
            ));
        }
        update.diagnostics = Diagnostics {
            below_threshold,
            floored_variances,
        };
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::KMeansInitializer, core::GaussianMixture, DMatrix, DVector, GmmError};
    use approx::assert_relative_eq;

    fn one_dimensional() -> (GaussianMixture, Vec<Vec<Float>>) {
        (
            GaussianMixture::new(1, 1),
            vec![vec![1.0], vec![2.0], vec![3.0], vec![6.0]],
        )
    }

    #[test]
    fn test_single_component_update_is_sample_moments() {
        let (mut model, data) = one_dimensional();
        let mut stats = SufficientStatistics::new(1, 1);
        stats.accumulate(&model, &data).unwrap();
        let mut ml = MaximumLikelihood::default();
        let update = ml.compute_update(&stats, &model, None).unwrap();
        update.apply(&mut model).unwrap();
        assert_relative_eq!(model.weights()[0], 1.0);
        assert_relative_eq!(model.means()[(0, 0)], 3.0, epsilon = 1e-12);
        // (1 + 4 + 9 + 36) / 4 - 9
        assert_relative_eq!(model.variances()[(0, 0)], 3.5, epsilon = 1e-12);
        assert!(update.diagnostics.below_threshold.is_empty());
    }

    #[test]
    fn test_starved_component_keeps_previous_parameters() {
        // component 1 is so far away that it receives no responsibility at all
        let model = GaussianMixture::from_parameters(
            DVector::from_vec(vec![0.5, 0.5]),
            DMatrix::from_column_slice(2, 1, &[0.0, 1.0e6]),
            DMatrix::from_column_slice(2, 1, &[1.0, 2.0]),
        )
        .unwrap();
        let data = vec![vec![-1.0], vec![0.0], vec![1.0]];
        let mut stats = SufficientStatistics::new(2, 1);
        stats.accumulate(&model, &data).unwrap();
        assert_eq!(stats.n()[1], 0.0);
        let update = MaximumLikelihood::default()
            .compute_update(&stats, &model, None)
            .unwrap();
        assert_eq!(update.diagnostics.below_threshold, vec![1]);
        let means = update.means.as_ref().unwrap();
        let variances = update.variances.as_ref().unwrap();
        let weights = update.weights.as_ref().unwrap();
        assert_eq!(means[(1, 0)], 1.0e6);
        assert_eq!(variances[(1, 0)], 2.0);
        assert_relative_eq!(means[(0, 0)], 0.0, epsilon = 1e-12);
        // weights (1, 0.5) renormalized
        assert_relative_eq!(weights[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(weights[1], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(weights.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_variance_is_floored() {
        let model = GaussianMixture::new(1, 2);
        let data = vec![vec![1.0, 0.0], vec![1.0, 2.0]];
        let mut stats = SufficientStatistics::new(1, 2);
        stats.accumulate(&model, &data).unwrap();
        let options = UpdateOptions::default().with_variance_floor(1e-3);
        let update = MaximumLikelihood::default()
            .with_options(options)
            .compute_update(&stats, &model, None)
            .unwrap();
        let variances = update.variances.unwrap();
        assert_eq!(variances[(0, 0)], 1e-3);
        assert_relative_eq!(variances[(0, 1)], 1.0, epsilon = 1e-12);
        assert_eq!(update.diagnostics.floored_variances, 1);
    }

    #[test]
    fn test_disabled_updates_are_not_staged() {
        let (model, data) = one_dimensional();
        let mut stats = SufficientStatistics::new(1, 1);
        stats.accumulate(&model, &data).unwrap();
        let options = UpdateOptions::default()
            .with_update_weights(false)
            .with_update_means(false);
        let update = MaximumLikelihood::default()
            .with_options(options)
            .compute_update(&stats, &model, None)
            .unwrap();
        assert!(update.weights.is_none());
        assert!(update.means.is_none());
        // variance around the unchanged mean of zero
        assert_relative_eq!(
            update.variances.unwrap()[(0, 0)],
            12.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_initializer_runs_on_initialize() {
        let mut model = GaussianMixture::new(2, 1);
        let data = vec![vec![-5.0], vec![-5.5], vec![5.0], vec![5.5]];
        let mut ml = MaximumLikelihood::default().with_initializer(KMeansInitializer::default());
        ml.initialize(&mut model, &data, None).unwrap();
        let mut centers = vec![model.means()[(0, 0)], model.means()[(1, 0)]];
        centers.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(centers[0], -5.25, epsilon = 1e-12);
        assert_relative_eq!(centers[1], 5.25, epsilon = 1e-12);

        let mut untouched = GaussianMixture::new(2, 1);
        MaximumLikelihood::default()
            .initialize(&mut untouched, &data, None)
            .unwrap();
        assert_eq!(untouched, GaussianMixture::new(2, 1));
    }

    #[test]
    fn test_statistics_must_match_model() {
        let model = GaussianMixture::new(2, 1);
        let result = MaximumLikelihood::default().compute_update(
            &SufficientStatistics::new(2, 1),
            &model,
            None,
        );
        assert_eq!(result.unwrap_err(), GmmError::EmptyStatistics);
    }
}
