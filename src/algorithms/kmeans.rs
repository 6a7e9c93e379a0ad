use fastrand::Rng;

use crate::{
    algorithms::mstep::DEFAULT_VARIANCE_FLOOR,
    core::utils::{maybe_warn, sample_indices},
    traits::{Dataset, Initializer, Mixture},
    DMatrix, DVector, Float, GmmError, GmmResult,
};

/// Seeds a [`Mixture`] with Lloyd's k-means algorithm.
///
/// The centroids start at distinct samples chosen at random (Forgy initialization) and are refined
/// for a fixed number of iterations or until no assignment changes. The resulting clusters give
/// the means, the fraction of samples in each cluster gives the weights (an empty cluster counts
/// as holding one sample), and the per-dimension variance of each cluster gives the variances.
/// Clusters with fewer than two members use the variance of the whole dataset instead.
#[derive(Debug, Clone)]
pub struct KMeansInitializer {
    n_iterations: usize,
    seed: u64,
    variance_floor: Float,
}

impl Default for KMeansInitializer {
    fn default() -> Self {
        Self {
            n_iterations: 50,
            seed: 0,
            variance_floor: DEFAULT_VARIANCE_FLOOR,
        }
    }
}

impl KMeansInitializer {
    /// Set the maximum number of Lloyd iterations (default = `50`).
    ///
    /// # Panics
    ///
    /// This method will panic if `n_iterations` is zero.
    pub fn with_iterations(mut self, n_iterations: usize) -> Self {
        assert!(n_iterations > 0, "k-means needs at least one iteration");
        self.n_iterations = n_iterations;
        self
    }
    /// Set the seed of the random number generator used to pick the initial centroids
    /// (default = `0`).
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    /// Set the lower bound applied to the estimated variances (default =
    /// [`DEFAULT_VARIANCE_FLOOR`]).
    ///
    /// # Panics
    ///
    /// This method will panic if the floor is not strictly positive and finite.
    pub fn with_variance_floor(mut self, value: Float) -> Self {
        assert!(
            value > 0.0 && value.is_finite(),
            "the variance floor must be strictly positive"
        );
        self.variance_floor = value;
        self
    }

    fn nearest(centroids: &DMatrix<Float>, x: &[Float]) -> usize {
        let mut best = 0;
        let mut best_distance = Float::INFINITY;
        for (k, centroid) in centroids.row_iter().enumerate() {
            let distance = centroid
                .iter()
                .zip(x)
                .map(|(c, x_d)| (x_d - c).powi(2))
                .sum::<Float>();
            if distance < best_distance {
                best = k;
                best_distance = distance;
            }
        }
        best
    }
}

fn validate_dataset(dataset: &dyn Dataset, n_inputs: usize) -> GmmResult<()> {
    if dataset.is_empty() {
        return Err(GmmError::EmptyDataset);
    }
    for index in 0..dataset.len() {
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
    }
    Ok(())
}

impl Initializer for KMeansInitializer {
    fn initialize(&mut self, model: &mut dyn Mixture, dataset: &dyn Dataset) -> GmmResult<()> {
        let (n_components, n_inputs) = model.shape();
        validate_dataset(dataset, n_inputs)?;
        let n_samples = dataset.len();
        if n_samples < n_components {
            maybe_warn(&format!(
                "k-means was given {n_samples} sample(s) for {n_components} clusters, some centroids will coincide"
            ));
        }
        let mut rng = Rng::with_seed(self.seed);
        let seeds = sample_indices(n_samples, n_components, &mut rng);
        let mut centroids = DMatrix::zeros(n_components, n_inputs);
        for k in 0..n_components {
            let x = dataset.sample(seeds[k % seeds.len()]);
            centroids.row_mut(k).iter_mut().zip(x).for_each(|(c, x_d)| *c = *x_d);
        }

        let mut labels = vec![usize::MAX; n_samples];
        let mut counts = vec![0usize; n_components];
        for _ in 0..self.n_iterations {
            let mut changed = false;
            for (index, label) in labels.iter_mut().enumerate() {
                let nearest = Self::nearest(&centroids, dataset.sample(index));
                if *label != nearest {
                    *label = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            let mut sums = DMatrix::<Float>::zeros(n_components, n_inputs);
            counts.fill(0);
            for (index, &label) in labels.iter().enumerate() {
                counts[label] += 1;
                sums.row_mut(label)
                    .iter_mut()
                    .zip(dataset.sample(index))
                    .for_each(|(s, x_d)| *s += x_d);
            }
            for (k, &count) in counts.iter().enumerate() {
                if count > 0 {
                    centroids.set_row(k, &sums.row(k).unscale(count as Float));
                }
            }
        }

        // pooled variance of the whole dataset
        let mut global_mean = DVector::<Float>::zeros(n_inputs);
        for index in 0..n_samples {
            global_mean += DVector::from_column_slice(dataset.sample(index));
        }
        global_mean.unscale_mut(n_samples as Float);
        let mut global_variance = DVector::<Float>::zeros(n_inputs);
        let mut scatter = DMatrix::<Float>::zeros(n_components, n_inputs);
        for (index, &label) in labels.iter().enumerate() {
            for (d, x_d) in dataset.sample(index).iter().enumerate() {
                global_variance[d] += (x_d - global_mean[d]).powi(2);
                scatter[(label, d)] += (x_d - centroids[(label, d)]).powi(2);
            }
        }
        global_variance.unscale_mut(n_samples as Float);

        let mut variances = DMatrix::zeros(n_components, n_inputs);
        for k in 0..n_components {
            for d in 0..n_inputs {
                let v = if counts[k] >= 2 {
                    scatter[(k, d)] / counts[k] as Float
                } else {
                    global_variance[d]
                };
                variances[(k, d)] = Float::max(v, self.variance_floor);
            }
        }
        let occupancy = DVector::from_iterator(
            n_components,
            counts.iter().map(|&count| usize::max(count, 1) as Float),
        );
        let weights = occupancy.unscale(occupancy.sum());

        model.set_weights(&weights)?;
        model.set_means(&centroids)?;
        model.set_variances(&variances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GaussianMixture;
    use approx::assert_relative_eq;

    fn clusters() -> Vec<Vec<Float>> {
        vec![
            vec![-10.0, 0.0],
            vec![-11.0, 1.0],
            vec![-9.0, -1.0],
            vec![10.0, 5.0],
            vec![12.0, 5.0],
        ]
    }

    fn sorted_by_first_mean(model: &GaussianMixture) -> Vec<usize> {
        let mut order = vec![0, 1];
        order.sort_by(|a, b| model.means()[(*a, 0)].total_cmp(&model.means()[(*b, 0)]));
        order
    }

    #[test]
    fn test_recovers_separated_clusters() {
        let mut model = GaussianMixture::new(2, 2);
        KMeansInitializer::default()
            .initialize(&mut model, &clusters())
            .unwrap();
        let order = sorted_by_first_mean(&model);
        let (left, right) = (order[0], order[1]);
        assert_relative_eq!(model.means()[(left, 0)], -10.0, epsilon = 1e-12);
        assert_relative_eq!(model.means()[(left, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(model.means()[(right, 0)], 11.0, epsilon = 1e-12);
        assert_relative_eq!(model.weights()[left], 0.6, epsilon = 1e-12);
        assert_relative_eq!(model.weights()[right], 0.4, epsilon = 1e-12);
        assert_relative_eq!(model.variances()[(left, 0)], 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(model.variances()[(right, 0)], 1.0, epsilon = 1e-12);
        // no spread in the second dimension of the right cluster
        assert_eq!(model.variances()[(right, 1)], DEFAULT_VARIANCE_FLOOR);
        assert!(model.validate(1e-12).is_ok());
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = GaussianMixture::new(3, 2).sample(300, &mut Rng::with_seed(4));
        let mut first = GaussianMixture::new(3, 2);
        let mut second = GaussianMixture::new(3, 2);
        KMeansInitializer::default()
            .with_seed(9)
            .initialize(&mut first, &data)
            .unwrap();
        KMeansInitializer::default()
            .with_seed(9)
            .initialize(&mut second, &data)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_more_clusters_than_samples() {
        let data = vec![vec![1.0], vec![3.0]];
        let mut model = GaussianMixture::new(3, 1);
        KMeansInitializer::default()
            .initialize(&mut model, &data)
            .unwrap();
        assert!(model.validate(1e-12).is_ok());
        // singleton and empty clusters fall back to the global variance
        assert!(model
            .variances()
            .iter()
            .all(|v| (*v - 1.0).abs() < 1e-12));
        // two occupied clusters and one empty cluster with a pseudo-count
        let mut weights: Vec<Float> = model.weights().iter().copied().collect();
        weights.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(weights[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(weights[2], 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_data() {
        let mut model = GaussianMixture::new(2, 2);
        let empty: Vec<Vec<Float>> = Vec::new();
        assert_eq!(
            KMeansInitializer::default()
                .initialize(&mut model, &empty)
                .unwrap_err(),
            GmmError::EmptyDataset
        );
        let ragged = vec![vec![0.0, 0.0], vec![1.0]];
        assert!(matches!(
            KMeansInitializer::default().initialize(&mut model, &ragged),
            Err(GmmError::SampleDimension { index: 1, .. })
        ));
        assert_eq!(model, GaussianMixture::new(2, 2));
    }
}
