use std::sync::Arc;

use rayon::prelude::*;
use tessera_tensor::Tensor;

use crate::error::TensorOpsError;

/// Controls how vectorized operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run on the calling thread when the estimated cost (`n * flops`) is at or
    /// below [`VectorizeConfig::threshold`], else on the Rayon global pool.
    #[default]
    Auto,

    /// Run sequentially on the calling thread.
    ///
    /// Useful for debugging or when the caller already runs inside a parallel
    /// loop.
    Serial,

    /// Always use the Rayon global thread pool.
    Parallel,

    /// Always use a private thread pool with `n` threads.
    ///
    /// The pool is built once, when the [`Vectorizer`] is created.
    Fixed(usize),
}

/// Tuning knobs for the [`Vectorizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorizeConfig {
    /// Cost (`n * flops`) above which [`ExecutionStrategy::Auto`] goes parallel.
    pub threshold: usize,
    /// Number of chunks the index range is split into. 0 uses one chunk per
    /// thread of the pool in use.
    pub num_threads: usize,
    /// Lower bound on the number of indexes handed to a single task.
    pub min_chunk_len: usize,
}

impl Default for VectorizeConfig {
    fn default() -> Self {
        Self {
            threshold: 300,
            num_threads: 0,
            min_chunk_len: 1,
        }
    }
}

/// Runs a per-index function over `0..n`, serially or across a thread pool.
///
/// The function must be safe to call concurrently for different indexes and
/// must not depend on the order in which indexes run. Every entry point blocks
/// until all indexes are done.
///
/// # Examples
///
/// ```
/// use tessera_tensor_ops::vectorize::Vectorizer;
///
/// let vz = Vectorizer::default();
/// let squares = vz.map(1000, 1, |i| i * i);
/// assert_eq!(squares[999], 998_001);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    strategy: ExecutionStrategy,
    config: VectorizeConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Vectorizer {
    /// Creates a vectorizer.
    ///
    /// # Errors
    ///
    /// Returns [`TensorOpsError::InvalidThreadCount`] for `Fixed(0)` and
    /// [`TensorOpsError::ThreadPool`] if the private pool can not be built.
    pub fn new(
        strategy: ExecutionStrategy,
        config: VectorizeConfig,
    ) -> Result<Self, TensorOpsError> {
        let pool = match strategy {
            ExecutionStrategy::Fixed(0) => return Err(TensorOpsError::InvalidThreadCount(0)),
            ExecutionStrategy::Fixed(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| TensorOpsError::ThreadPool(e.to_string()))?;
                log::debug!("built a private pool with {n} threads");
                Some(Arc::new(pool))
            }
            _ => None,
        };
        Ok(Self {
            strategy,
            config,
            pool,
        })
    }

    /// A vectorizer that never leaves the calling thread.
    pub fn serial() -> Self {
        Self {
            strategy: ExecutionStrategy::Serial,
            ..Default::default()
        }
    }

    /// The execution strategy.
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// The tuning configuration.
    pub fn config(&self) -> &VectorizeConfig {
        &self.config
    }

    /// Returns true if a call over `n` indexes costing `flops` each would run
    /// in parallel.
    pub fn is_parallel(&self, n: usize, flops: usize) -> bool {
        if n < 2 {
            return false;
        }
        match self.strategy {
            ExecutionStrategy::Serial => false,
            ExecutionStrategy::Parallel | ExecutionStrategy::Fixed(_) => true,
            ExecutionStrategy::Auto => n.saturating_mul(flops.max(1)) > self.config.threshold,
        }
    }

    fn chunk_len(&self, n: usize) -> usize {
        let threads = match (self.config.num_threads, &self.pool) {
            (0, Some(pool)) => pool.current_num_threads(),
            (0, None) => rayon::current_num_threads(),
            (t, _) => t,
        };
        n.div_ceil(threads.max(1)).max(self.config.min_chunk_len).max(1)
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Calls `f` for every index in `0..n`.
    ///
    /// # Arguments
    ///
    /// * `n` - The number of indexes.
    /// * `flops` - The estimated cost of one call, used by the serial/parallel decision.
    /// * `f` - The per-index function.
    pub fn for_each<F>(&self, n: usize, flops: usize, f: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        if !self.is_parallel(n, flops) {
            (0..n).for_each(f);
            return;
        }
        let chunk = self.chunk_len(n);
        log::trace!("for_each over {n} indexes in chunks of {chunk}");
        self.install(|| (0..n).into_par_iter().with_min_len(chunk).for_each(&f));
    }

    /// Calls `f` for every index in `0..n` and collects the results in index
    /// order.
    pub fn map<R, F>(&self, n: usize, flops: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        if !self.is_parallel(n, flops) {
            return (0..n).map(f).collect();
        }
        let chunk = self.chunk_len(n);
        log::trace!("map over {n} indexes in chunks of {chunk}");
        self.install(|| (0..n).into_par_iter().with_min_len(chunk).map(&f).collect())
    }

    /// Calls `f(idx, tensors)` for every index in `0..n`.
    ///
    /// This is the general form used by registered functions: `f` reads its
    /// inputs from `tensors` and writes its outputs through them.
    pub fn vectorize<F>(&self, n: usize, flops: usize, f: F, tensors: &[&dyn Tensor])
    where
        F: Fn(usize, &[&dyn Tensor]) + Send + Sync,
    {
        self.for_each(n, flops, |i| f(i, tensors));
    }
}

/// The usual length function for [`Vectorizer::vectorize`]: the largest
/// number of elements among `tensors`.
pub fn n_from_max(tensors: &[&dyn Tensor]) -> usize {
    tensors.iter().map(|t| t.len()).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tessera_tensor::{Float64, Int, Values};

    use super::*;

    #[test]
    fn test_threshold_decision() {
        let vz = Vectorizer::default();
        assert!(!vz.is_parallel(300, 1));
        assert!(vz.is_parallel(301, 1));
        assert!(vz.is_parallel(31, 10));
        assert!(!vz.is_parallel(1, 1000));
        assert!(!Vectorizer::serial().is_parallel(1_000_000, 100));
    }

    #[test]
    fn test_map_keeps_order() -> Result<(), TensorOpsError> {
        for strategy in [
            ExecutionStrategy::Serial,
            ExecutionStrategy::Auto,
            ExecutionStrategy::Parallel,
            ExecutionStrategy::Fixed(3),
        ] {
            let vz = Vectorizer::new(strategy, VectorizeConfig::default())?;
            let out = vz.map(5000, 1, |i| 2 * i);
            assert_eq!(out, (0..5000).map(|i| 2 * i).collect::<Vec<_>>(), "{strategy:?}");
        }
        Ok(())
    }

    #[test]
    fn test_for_each_visits_every_index_once() -> Result<(), TensorOpsError> {
        let config = VectorizeConfig {
            num_threads: 7,
            min_chunk_len: 16,
            ..Default::default()
        };
        let vz = Vectorizer::new(ExecutionStrategy::Parallel, config)?;
        let total = AtomicUsize::new(0);
        let count = AtomicUsize::new(0);
        vz.for_each(10_000, 1, |i| {
            total.fetch_add(i, Ordering::Relaxed);
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 10_000);
        assert_eq!(total.load(Ordering::Relaxed), 10_000 * 9_999 / 2);
        Ok(())
    }

    #[test]
    fn test_fixed_zero_threads() {
        let res = Vectorizer::new(ExecutionStrategy::Fixed(0), VectorizeConfig::default());
        assert!(matches!(res, Err(TensorOpsError::InvalidThreadCount(0))));
    }

    #[test]
    fn test_vectorize_writes_through_tensors() -> Result<(), TensorOpsError> {
        let a = Float64::from_vec((0..1000).map(f64::from).collect());
        let out = Int::new(&[1000]);
        let vz = Vectorizer::new(ExecutionStrategy::Parallel, VectorizeConfig::default())?;
        let n = n_from_max(&[&a, &out]);
        vz.vectorize(
            n,
            1,
            |i, ts| ts[1].set_float_1d(i, ts[0].float_1d(i) * 3.0),
            &[&a, &out],
        );
        assert_eq!(out.int_1d(999), 2997);
        assert_eq!(out.len(), 1000);
        out.set_num_rows(0);
        assert_eq!(n_from_max(&[&out]), 0);
        Ok(())
    }
}
