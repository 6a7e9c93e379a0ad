use logsumexp::LogSumExp;
use serde::{Deserialize, Serialize};

use crate::{
    core::mixture::LogGaussianTerms,
    traits::{Dataset, Mixture},
    DMatrix, DVector, Float, GmmError, GmmResult,
};

/// Number of samples accumulated sequentially before partial statistics are combined pairwise.
const BLOCK_SIZE: usize = 4096;

/// Per-component zeroth, first and second responsibility-weighted moments of a dataset.
///
/// For component $`k`$ and responsibilities $`p(k|x)`$:
/// ```math
/// n_k = \sum_x p(k|x), \quad
/// \texttt{sum\_px}_k = \sum_x p(k|x)\,x, \quad
/// \texttt{sum\_pxx}_k = \sum_x p(k|x)\,x \odot x
/// ```
/// together with the sample count $`T`$ and the total log-likelihood $`\sum_x \ln p(x)`$ of the
/// model which produced the responsibilities. Moments are stored as `n_components x n_inputs`
/// matrices, matching the layout of [`Mixture::means`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficientStatistics {
    n: DVector<Float>,
    sum_px: DMatrix<Float>,
    sum_pxx: DMatrix<Float>,
    n_samples: usize,
    log_likelihood: Float,
}

impl Default for SufficientStatistics {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl SufficientStatistics {
    /// Create zeroed statistics for `n_components` components in `n_inputs` dimensions.
    pub fn new(n_components: usize, n_inputs: usize) -> Self {
        Self {
            n: DVector::zeros(n_components),
            sum_px: DMatrix::zeros(n_components, n_inputs),
            sum_pxx: DMatrix::zeros(n_components, n_inputs),
            n_samples: 0,
            log_likelihood: 0.0,
        }
    }

    /// Reshape the storage to `n_components x n_inputs` and zero every moment.
    pub fn resize(&mut self, n_components: usize, n_inputs: usize) {
        if self.shape() == (n_components, n_inputs) {
            self.reset();
        } else {
            *self = Self::new(n_components, n_inputs);
        }
    }

    /// Zero every moment without changing the shape.
    pub fn reset(&mut self) {
        self.n.fill(0.0);
        self.sum_px.fill(0.0);
        self.sum_pxx.fill(0.0);
        self.n_samples = 0;
        self.log_likelihood = 0.0;
    }

    /// The `(components, inputs)` shape of the statistics.
    pub fn shape(&self) -> (usize, usize) {
        self.sum_px.shape()
    }

    /// The responsibility mass $`n_k`$ of each component.
    pub const fn n(&self) -> &DVector<Float> {
        &self.n
    }

    /// The responsibility-weighted sums of samples (one row per component).
    pub const fn sum_px(&self) -> &DMatrix<Float> {
        &self.sum_px
    }

    /// The responsibility-weighted sums of squared samples (one row per component).
    pub const fn sum_pxx(&self) -> &DMatrix<Float> {
        &self.sum_pxx
    }

    /// The number of accumulated samples $`T`$.
    pub const fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// The total log-likelihood of the accumulated samples.
    pub const fn log_likelihood(&self) -> Float {
        self.log_likelihood
    }

    /// The mean log-likelihood per accumulated sample.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::EmptyStatistics`] if no samples have been accumulated.
    pub fn average_log_likelihood(&self) -> GmmResult<Float> {
        if self.n_samples == 0 {
            return Err(GmmError::EmptyStatistics);
        }
        Ok(self.log_likelihood / self.n_samples as Float)
    }

    /// Add the moments of `other` to these statistics.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::StatisticsShape`] if the two sets of statistics have different shapes.
    pub fn merge(&mut self, other: &Self) -> GmmResult<()> {
        if other.shape() != self.shape() {
            return Err(GmmError::StatisticsShape {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        self.n += &other.n;
        self.sum_px += &other.sum_px;
        self.sum_pxx += &other.sum_pxx;
        self.n_samples += other.n_samples;
        self.log_likelihood += other.log_likelihood;
        Ok(())
    }

    /// Run an E-step: compute the responsibilities of every component of `model` for every sample
    /// of `dataset` and add the resulting moments to these statistics.
    ///
    /// Responsibilities are evaluated in log space and normalized with log-sum-exp. Samples are
    /// processed in fixed-size blocks whose partial statistics are then summed pairwise.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::StatisticsShape`] if these statistics do not have the shape of `model`,
    /// [`GmmError::EmptyDataset`] for an empty dataset, [`GmmError::SampleDimension`] or
    /// [`GmmError::NonFiniteSample`] for a malformed sample, and [`GmmError::InvalidParameters`]
    /// if the model assigns a non-finite log-likelihood to a sample. The statistics are left
    /// unchanged on error.
    pub fn accumulate(&mut self, model: &dyn Mixture, dataset: &dyn Dataset) -> GmmResult<()> {
        if model.shape() != self.shape() {
            return Err(GmmError::StatisticsShape {
                expected: model.shape(),
                found: self.shape(),
            });
        }
        if dataset.is_empty() {
            return Err(GmmError::EmptyDataset);
        }
        let terms = LogGaussianTerms::new(model.weights(), model.means(), model.variances());
        let mut partials = (0..dataset.len())
            .step_by(BLOCK_SIZE)
            .map(|start| {
                let end = usize::min(start + BLOCK_SIZE, dataset.len());
                self.accumulate_block(&terms, dataset, start..end)
            })
            .collect::<GmmResult<Vec<Self>>>()?;
        while partials.len() > 1 {
            let mut pairs = Vec::with_capacity((partials.len() + 1) / 2);
            let mut iter = partials.into_iter();
            while let Some(mut left) = iter.next() {
                if let Some(right) = iter.next() {
                    left.merge(&right)?;
                }
                pairs.push(left);
            }
            partials = pairs;
        }
        for partial in &partials {
            self.merge(partial)?;
        }
        Ok(())
    }

    fn accumulate_block(
        &self,
        terms: &LogGaussianTerms<'_>,
        dataset: &dyn Dataset,
        indices: std::ops::Range<usize>,
    ) -> GmmResult<Self> {
        let (n_components, n_inputs) = self.shape();
        let mut block = Self::new(n_components, n_inputs);
        let mut log_joint = DVector::zeros(n_components);
        for index in indices {
            let x = dataset.sample(index);
            if x.len() != n_inputs {
                return Err(GmmError::SampleDimension {
                    index,
                    expected: n_inputs,
                    found: x.len(),
                });
            }
            if x.iter().any(|value| !value.is_finite()) {
                return Err(GmmError::NonFiniteSample { index });
            }
            terms.log_joint(x, &mut log_joint);
            let log_px = LogSumExp::ln_sum_exp(log_joint.iter());
            if !log_px.is_finite() {
                return Err(GmmError::InvalidParameters {
                    reason: format!("the log-likelihood of sample #{index} is {log_px}"),
                });
            }
            for k in 0..n_components {
                let p = Float::exp(log_joint[k] - log_px);
                block.n[k] += p;
                for (d, &x_d) in x.iter().enumerate() {
                    let px = p * x_d;
                    block.sum_px[(k, d)] += px;
                    block.sum_pxx[(k, d)] += px * x_d;
                }
            }
            block.n_samples += 1;
            block.log_likelihood += log_px;
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GaussianMixture;
    use approx::assert_relative_eq;
    use fastrand::Rng;

    fn model() -> GaussianMixture {
        GaussianMixture::from_parameters(
            DVector::from_vec(vec![0.3, 0.7]),
            DMatrix::from_row_slice(2, 2, &[-2.0, 1.0, 3.0, 0.0]),
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.5, 1.0]),
        )
        .unwrap()
    }

    #[test]
    fn test_resize_and_reset() {
        let mut stats = SufficientStatistics::default();
        assert_eq!(stats.shape(), (0, 0));
        stats.resize(3, 2);
        assert_eq!(stats.shape(), (3, 2));
        assert_eq!(stats.n().len(), 3);
        let data = vec![vec![0.0, 0.0, 0.0]];
        let gmm = GaussianMixture::new(3, 3);
        stats.resize(3, 3);
        stats.accumulate(&gmm, &data).unwrap();
        assert_eq!(stats.n_samples(), 1);
        stats.resize(3, 3);
        assert_eq!(stats, SufficientStatistics::new(3, 3));
    }

    #[test]
    fn test_responsibilities_sum_to_sample_count() {
        let gmm = model();
        let data = gmm.sample(500, &mut Rng::with_seed(1));
        let mut stats = SufficientStatistics::new(2, 2);
        stats.accumulate(&gmm, &data).unwrap();
        assert_eq!(stats.n_samples(), 500);
        assert_relative_eq!(stats.n().sum(), 500.0, epsilon = 1e-9);
        assert!(stats.n().iter().all(|n_k| *n_k >= 0.0));
    }

    #[test]
    fn test_single_component_moments() {
        let gmm = GaussianMixture::new(1, 2);
        let data = vec![vec![1.0, 2.0], vec![3.0, -1.0], vec![-0.5, 0.5]];
        let mut stats = SufficientStatistics::new(1, 2);
        stats.accumulate(&gmm, &data).unwrap();
        assert_relative_eq!(stats.n()[0], 3.0);
        assert_relative_eq!(stats.sum_px()[(0, 0)], 3.5);
        assert_relative_eq!(stats.sum_px()[(0, 1)], 1.5);
        assert_relative_eq!(stats.sum_pxx()[(0, 0)], 10.25);
        assert_relative_eq!(stats.sum_pxx()[(0, 1)], 5.25);
        assert_relative_eq!(
            stats.average_log_likelihood().unwrap(),
            gmm.average_log_likelihood(&data).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_far_samples_are_assigned_to_nearest_component() {
        let gmm = GaussianMixture::from_parameters(
            DVector::from_vec(vec![0.5, 0.5]),
            DMatrix::from_column_slice(2, 1, &[-100.0, 100.0]),
            DMatrix::from_element(2, 1, 1.0),
        )
        .unwrap();
        let data = vec![vec![-99.0], vec![-101.0], vec![100.0]];
        let mut stats = SufficientStatistics::new(2, 1);
        stats.accumulate(&gmm, &data).unwrap();
        assert_relative_eq!(stats.n()[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.n()[1], 1.0, epsilon = 1e-12);
        assert!(stats.log_likelihood().is_finite());
    }

    #[test]
    fn test_block_reduction_matches_single_pass() {
        let gmm = model();
        let data = gmm.sample(3 * BLOCK_SIZE + 17, &mut Rng::with_seed(2));
        let mut stats = SufficientStatistics::new(2, 2);
        stats.accumulate(&gmm, &data).unwrap();

        let terms = LogGaussianTerms::new(gmm.weights(), gmm.means(), gmm.variances());
        let single = SufficientStatistics::new(2, 2)
            .accumulate_block(&terms, &data, 0..data.len())
            .unwrap();
        assert_eq!(stats.n_samples(), single.n_samples());
        assert!(stats.n().relative_eq(single.n(), 1e-9, 1e-9));
        assert!(stats.sum_px().relative_eq(single.sum_px(), 1e-9, 1e-9));
        assert!(stats.sum_pxx().relative_eq(single.sum_pxx(), 1e-9, 1e-9));
        assert_relative_eq!(
            stats.log_likelihood(),
            single.log_likelihood(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_merge_of_halves_equals_whole() {
        let gmm = model();
        let data = gmm.sample(200, &mut Rng::with_seed(3));
        let (left, right) = data.split_at(120);
        let mut whole = SufficientStatistics::new(2, 2);
        whole.accumulate(&gmm, &data).unwrap();
        let mut first = SufficientStatistics::new(2, 2);
        first.accumulate(&gmm, &left.to_vec()).unwrap();
        let mut second = SufficientStatistics::new(2, 2);
        second.accumulate(&gmm, &right.to_vec()).unwrap();
        second.merge(&first).unwrap();
        assert_eq!(second.n_samples(), 200);
        assert!(second.n().relative_eq(whole.n(), 1e-10, 1e-10));
        assert!(second.sum_pxx().relative_eq(whole.sum_pxx(), 1e-10, 1e-10));
    }

    #[test]
    fn test_merge_rejects_other_shapes() {
        let mut stats = SufficientStatistics::new(2, 2);
        assert_eq!(
            stats.merge(&SufficientStatistics::new(2, 3)).unwrap_err(),
            GmmError::StatisticsShape {
                expected: (2, 2),
                found: (2, 3)
            }
        );
    }

    #[test]
    fn test_errors_leave_statistics_unchanged() {
        let gmm = model();
        let mut stats = SufficientStatistics::new(2, 2);
        stats.accumulate(&gmm, &vec![vec![0.0, 1.0]]).unwrap();
        let before = stats.clone();

        let empty: Vec<Vec<Float>> = Vec::new();
        assert_eq!(
            stats.accumulate(&gmm, &empty).unwrap_err(),
            GmmError::EmptyDataset
        );
        let ragged = vec![vec![0.0, 1.0], vec![1.0, 2.0, 3.0]];
        assert_eq!(
            stats.accumulate(&gmm, &ragged).unwrap_err(),
            GmmError::SampleDimension {
                index: 1,
                expected: 2,
                found: 3
            }
        );
        let nan = vec![vec![0.0, 1.0], vec![0.0, 1.0], vec![Float::NAN, 0.0]];
        assert_eq!(
            stats.accumulate(&gmm, &nan).unwrap_err(),
            GmmError::NonFiniteSample { index: 2 }
        );
        assert!(matches!(
            stats.accumulate(&GaussianMixture::new(3, 2), &ragged),
            Err(GmmError::StatisticsShape { .. })
        ));
        assert_eq!(stats, before);
        assert_eq!(
            SufficientStatistics::new(2, 2)
                .average_log_likelihood()
                .unwrap_err(),
            GmmError::EmptyStatistics
        );
    }
}
