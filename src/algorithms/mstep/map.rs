use crate::{
    algorithms::mstep::{
        check_statistics, floor_variances, Diagnostics, ParameterUpdate, UpdateOptions,
    },
    core::SufficientStatistics,
    traits::{Dataset, MStep, Mixture},
    DMatrix, DVector, Float, GmmError, GmmResult,
};

/// The default relevance factor $`r`$.
pub const DEFAULT_RELEVANCE_FACTOR: Float = 4.0;

/// The Maximum A Posteriori adaptation M-step of Reynolds et al.[^1]
///
/// Training starts from a copy of the prior model. Each step blends the statistics of the new
/// data with the frozen prior using the adaptation coefficient
/// ```math
/// \alpha_k = \frac{n_k}{n_k + r}
/// ```
/// or a fixed $`\alpha`$ shared by every component when fixed adaptation is enabled. With
/// $`E_k[x] = \texttt{sum\_px}_k / n_k`$ and $`E_k[x^2] = \texttt{sum\_pxx}_k / n_k`$:
/// ```math
/// \begin{aligned}
/// w_k' &= \gamma \left(\alpha_k \frac{n_k}{T} + (1 - \alpha_k) w_k^{\text{prior}}\right) \\
/// \mu_k' &= \alpha_k E_k[x] + (1 - \alpha_k) \mu_k^{\text{prior}} \\
/// \sigma_k'^2 &= \alpha_k E_k[x^2] + (1 - \alpha_k)\left(\sigma_k^{2,\text{prior}} + (\mu_k^{\text{prior}})^2\right) - (\mu_k')^2
/// \end{aligned}
/// ```
/// where $`\gamma`$ renormalizes the weights to sum to one. A component whose responsibility mass
/// is below the threshold keeps the prior mean, and its variance becomes the prior variance
/// recentred on the new mean, $`\sigma_k^{2,\text{prior}} + (\mu_k^{\text{prior}})^2 - (\mu_k')^2`$.
///
/// [^1]: [D. A. Reynolds, T. F. Quatieri, and R. B. Dunn, ‘Speaker Verification Using Adapted Gaussian Mixture Models’, Digital Signal Processing, vol. 10, no. 1–3, pp. 19–41, 2000.](https://doi.org/10.1006/dspr.1999.0361)
#[derive(Debug, Clone)]
pub struct MapAdaptation {
    options: UpdateOptions,
    relevance_factor: Float,
    fixed_alpha: Option<Float>,
    alpha: DVector<Float>,
}

impl Default for MapAdaptation {
    fn default() -> Self {
        Self::new(DEFAULT_RELEVANCE_FACTOR)
    }
}

impl MapAdaptation {
    /// Create a MAP strategy with relevance factor `relevance_factor`.
    ///
    /// # Panics
    ///
    /// This method will panic if $`r <= 0`$.
    pub fn new(relevance_factor: Float) -> Self {
        assert!(
            relevance_factor > 0.0,
            "the relevance factor must be strictly positive"
        );
        Self {
            options: UpdateOptions::default(),
            relevance_factor,
            fixed_alpha: None,
            alpha: DVector::zeros(0),
        }
    }
    /// Use the same adaptation coefficient `alpha` for every component regardless of its
    /// responsibility mass.
    ///
    /// # Panics
    ///
    /// This method will panic if `alpha` is not in $`[0, 1]`$.
    pub fn with_fixed_adaptation(mut self, alpha: Float) -> Self {
        assert!(
            (0.0..=1.0).contains(&alpha),
            "the fixed adaptation coefficient must be in [0, 1]"
        );
        self.fixed_alpha = Some(alpha);
        self
    }
    /// Go back to data-dependent adaptation coefficients.
    pub const fn without_fixed_adaptation(mut self) -> Self {
        self.fixed_alpha = None;
        self
    }
    /// Set the [`UpdateOptions`].
    pub fn with_options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }
    /// The relevance factor $`r`$.
    pub const fn relevance_factor(&self) -> Float {
        self.relevance_factor
    }
    /// The fixed adaptation coefficient, if fixed adaptation is enabled.
    pub const fn fixed_adaptation(&self) -> Option<Float> {
        self.fixed_alpha
    }
    /// The [`UpdateOptions`] in use.
    pub const fn options(&self) -> &UpdateOptions {
        &self.options
    }
    /// The adaptation coefficients $`\alpha_k`$ of the most recent M-step (empty before the
    /// first one).
    pub const fn adaptation_coefficients(&self) -> &DVector<Float> {
        &self.alpha
    }

    fn adaptation_coefficient(&self, n_k: Float) -> Float {
        self.fixed_alpha
            .unwrap_or_else(|| n_k / (n_k + self.relevance_factor))
    }
}

fn check_prior<'a>(
    prior: Option<&'a dyn Mixture>,
    model: &dyn Mixture,
) -> GmmResult<&'a dyn Mixture> {
    let prior = prior.ok_or(GmmError::MissingPriorModel)?;
    if prior.shape() != model.shape() {
        return Err(GmmError::PriorShape {
            expected: model.shape(),
            found: prior.shape(),
        });
    }
    Ok(prior)
}

impl MStep for MapAdaptation {
    /// Copy the weights, means and variances of the prior into `model`.
    fn initialize(
        &mut self,
        model: &mut dyn Mixture,
        _dataset: &dyn Dataset,
        prior: Option<&dyn Mixture>,
    ) -> GmmResult<()> {
        let prior = check_prior(prior, model)?;
        model.copy_parameters_from(prior)?;
        self.alpha = DVector::zeros(model.n_components());
        Ok(())
    }

    fn compute_update(
        &mut self,
        stats: &SufficientStatistics,
        model: &dyn Mixture,
        prior: Option<&dyn Mixture>,
    ) -> GmmResult<ParameterUpdate> {
        let prior = check_prior(prior, model)?;
        check_statistics(stats, model)?;
        let (n_components, n_inputs) = model.shape();
        let n = stats.n();
        let total = stats.n_samples() as Float;
        let alpha = n.map(|n_k| self.adaptation_coefficient(n_k));
        let below_threshold = self.options.below_threshold(stats);
        let mut update = ParameterUpdate::default();

        if self.options.update_weights() {
            let prior_weights = prior.weights();
            let mut weights = DVector::from_iterator(
                n_components,
                (0..n_components)
                    .map(|k| alpha[k] * n[k] / total + (1.0 - alpha[k]) * prior_weights[k]),
            );
            weights /= weights.sum();
            update.weights = Some(weights);
        }

        let prior_means = prior.means();
        let means = if self.options.update_means() {
            let mut means = prior_means.clone();
            for k in 0..n_components {
                if below_threshold.contains(&k) {
                    continue;
                }
                for d in 0..n_inputs {
                    means[(k, d)] = alpha[k] * stats.sum_px()[(k, d)] / n[k]
                        + (1.0 - alpha[k]) * prior_means[(k, d)];
                }
            }
            Some(means)
        } else {
            None
        };

        let mut floored_variances = 0;
        if self.options.update_variances() {
            let prior_variances = prior.variances();
            // variances are centred on the new means when those are being updated
            let centres = means.as_ref().unwrap_or_else(|| model.means());
            let mut variances = DMatrix::zeros(n_components, n_inputs);
            for k in 0..n_components {
                let skip = below_threshold.contains(&k);
                for d in 0..n_inputs {
                    let prior_second_moment =
                        prior_variances[(k, d)] + prior_means[(k, d)] * prior_means[(k, d)];
                    let centre = centres[(k, d)];
                    variances[(k, d)] = if skip {
                        prior_second_moment - centre * centre
                    } else {
                        alpha[k] * stats.sum_pxx()[(k, d)] / n[k]
                            + (1.0 - alpha[k]) * prior_second_moment
                            - centre * centre
                    };
                }
            }
            floored_variances = floor_variances(&mut variances, self.options.variance_floor());
            update.variances = Some(variances);
        }
        update.means = means;

        update.diagnostics = Diagnostics {
            below_threshold,
            floored_variances,
        };
        self.alpha = alpha;
        Ok(update)
    }
}
