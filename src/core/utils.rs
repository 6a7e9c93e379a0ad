use crate::Float;
use fastrand::Rng;
use fastrand_contrib::RngExt;
use parking_lot::{const_mutex, Mutex, MutexGuard};

/// Draw `amount` distinct indices from `0..length` in random order.
///
/// Returns fewer than `amount` indices if `length < amount`.
pub(crate) fn sample_indices(length: usize, amount: usize, rng: &mut Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..length).collect();
    let amount = amount.min(length);
    // partial Fisher-Yates
    for i in 0..amount {
        let j = rng.usize(i..length);
        indices.swap(i, j);
    }
    indices.truncate(amount);
    indices
}

/// Weighted index selection on a random number generator.
pub trait RandChoice {
    /// Pick an index with probability proportional to its weight, or [`None`] if `weights` is
    /// empty.
    fn choice_weighted(&mut self, weights: &[Float]) -> Option<usize>;
}

impl RandChoice for Rng {
    fn choice_weighted(&mut self, weights: &[Float]) -> Option<usize> {
        let total = weights.iter().sum();
        let u: Float = self.range(0.0, total);
        let mut cumulative = 0.0;
        weights.iter().position(|&weight| {
            cumulative += weight;
            u <= cumulative
        })
    }
}

/// Draws of [`Float`] values which follow the `f32` feature.
pub trait SampleFloat {
    /// Uniform draw from `[lower, upper)`.
    fn range(&mut self, lower: Float, upper: Float) -> Float;
    /// Draw from $`\mathcal{N}(\mu, \sigma^2)`$.
    fn normal(&mut self, mu: Float, sigma: Float) -> Float;
}
impl SampleFloat for Rng {
    #[cfg(not(feature = "f32"))]
    fn range(&mut self, lower: Float, upper: Float) -> Float {
        self.f64_range(lower..upper)
    }
    #[cfg(feature = "f32")]
    fn range(&mut self, lower: Float, upper: Float) -> Float {
        self.f32_range(lower..upper)
    }
    #[cfg(not(feature = "f32"))]
    fn normal(&mut self, mu: Float, sigma: Float) -> Float {
        self.f64_normal(mu, sigma)
    }
    #[cfg(feature = "f32")]
    fn normal(&mut self, mu: Float, sigma: Float) -> Float {
        self.f32_normal(mu, sigma)
    }
}

/// Environment variable which pins warnings on (`1`) or off (`0`).
pub const WARNINGS_ENV: &str = "GMM_ADAPT_WARNINGS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WarningSource {
    Default,
    Environment,
    Caller,
}

#[derive(Debug, Clone, Copy)]
struct WarningPolicy {
    enabled: bool,
    source: WarningSource,
    env_checked: bool,
}

impl WarningPolicy {
    const INITIAL: Self = Self {
        enabled: true,
        source: WarningSource::Default,
        env_checked: false,
    };

    fn lock() -> MutexGuard<'static, Self> {
        let mut policy = WARNING_POLICY.lock();
        if !policy.env_checked {
            policy.env_checked = true;
            match std::env::var(WARNINGS_ENV).as_deref() {
                Ok("0") => policy.pin(false, WarningSource::Environment),
                Ok("1") => policy.pin(true, WarningSource::Environment),
                _ => {}
            }
        }
        policy
    }

    fn pin(&mut self, enabled: bool, source: WarningSource) {
        self.enabled = enabled;
        self.source = source;
    }

    // only the first caller override sticks, and never over the environment
    fn request(enabled: bool) {
        let mut policy = Self::lock();
        if policy.source == WarningSource::Default {
            policy.pin(enabled, WarningSource::Caller);
        }
    }
}

static WARNING_POLICY: Mutex<WarningPolicy> = const_mutex(WarningPolicy::INITIAL);

/// Turn warnings on, unless an earlier call of [`disable_warnings`] or `GMM_ADAPT_WARNINGS=0`
/// already turned them off.
pub fn enable_warnings() {
    WarningPolicy::request(true);
}

/// Turn warnings off, unless an earlier call of [`enable_warnings`] or `GMM_ADAPT_WARNINGS=1`
/// already turned them on.
pub fn disable_warnings() {
    WarningPolicy::request(false);
}

/// Whether [`maybe_warn`] currently prints.
///
/// Warnings are on by default. The [`WARNINGS_ENV`] variable wins over everything else, and
/// otherwise the first call of [`enable_warnings`] or [`disable_warnings`] decides for the rest of
/// the process.
pub fn should_warn() -> bool {
    WarningPolicy::lock().enabled
}

/// Print `msg` to stderr if [`should_warn`].
pub fn maybe_warn(msg: &str) {
    if should_warn() {
        eprintln!("Warning: {msg}");
    }
}
