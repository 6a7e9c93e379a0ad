use crate::{DMatrix, DVector, Float};

/// An ordered, finite collection of fixed-length samples which can be scanned any number of times.
///
/// The E-step re-scans the whole dataset on every iteration by index, so implementors only need
/// cheap random access to each sample as a contiguous slice.
pub trait Dataset {
    /// The number of samples.
    fn len(&self) -> usize;
    /// Returns `true` if the dataset holds no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The dimension of the samples (`0` for an empty dataset).
    fn n_inputs(&self) -> usize;
    /// The sample at `index`.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `index >= self.len()`.
    fn sample(&self, index: usize) -> &[Float];
}

impl Dataset for [Vec<Float>] {
    fn len(&self) -> usize {
        <[Vec<Float>]>::len(self)
    }
    fn n_inputs(&self) -> usize {
        self.first().map_or(0, Vec::len)
    }
    fn sample(&self, index: usize) -> &[Float] {
        &self[index]
    }
}

impl Dataset for Vec<Vec<Float>> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }
    fn n_inputs(&self) -> usize {
        Dataset::n_inputs(self.as_slice())
    }
    fn sample(&self, index: usize) -> &[Float] {
        &self[index]
    }
}

impl Dataset for [DVector<Float>] {
    fn len(&self) -> usize {
        <[DVector<Float>]>::len(self)
    }
    fn n_inputs(&self) -> usize {
        self.first().map_or(0, |x| x.len())
    }
    fn sample(&self, index: usize) -> &[Float] {
        self[index].as_slice()
    }
}

impl Dataset for Vec<DVector<Float>> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }
    fn n_inputs(&self) -> usize {
        Dataset::n_inputs(self.as_slice())
    }
    fn sample(&self, index: usize) -> &[Float] {
        self[index].as_slice()
    }
}

/// A `D x N` matrix whose *columns* are the samples. Columns are contiguous in nalgebra's
/// column-major storage, so no copy is needed.
impl Dataset for DMatrix<Float> {
    fn len(&self) -> usize {
        self.ncols()
    }
    fn n_inputs(&self) -> usize {
        self.nrows()
    }
    fn sample(&self, index: usize) -> &[Float] {
        let n_inputs = self.nrows();
        &self.as_slice()[index * n_inputs..(index + 1) * n_inputs]
    }
}
