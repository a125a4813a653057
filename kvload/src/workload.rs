//! A module for defining a [`Workload`] that issues randomized key-value traffic.

use std::thread::available_parallelism;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::Distribution;
use rand_distr::weighted::WeightedIndex;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::request::{Request, Task};

/// Upper bound for [`WorkloadBuilder::concurrency`].
///
/// In-flight requests are bounded by a semaphore whose permits are acquired all at once when a
/// run ends, so the limit must fit both the semaphore and a `u32` permit count.
pub const MAX_CONCURRENCY: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// A builder for creating a [`Workload`].
#[derive(Debug)]
pub struct WorkloadBuilder {
    name: String,
    concurrency: usize,
    seed: u64,

    set_weight: u8,
    get_weight: u8,
    delete_weight: u8,
}

impl WorkloadBuilder {
    /// The maximum number of concurrent requests that can be in flight within this workload.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The ratio between sets, gets and deletes.
    pub fn task_weights(mut self, sets: u8, gets: u8, deletes: u8) -> Self {
        self.set_weight = sets;
        self.get_weight = gets;
        self.delete_weight = deletes;
        self
    }

    /// Seeds the RNG that drives task selection and key generation.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Creates the workload instance.
    ///
    /// Fails if all task weights are zero. Concurrency is clamped to `1..=MAX_CONCURRENCY`.
    pub fn build(self) -> Result<Workload> {
        // Weights are summed internally, widen them so any mix of `u8` weights fits.
        let task_distribution = WeightedIndex::new([
            u32::from(self.set_weight),
            u32::from(self.get_weight),
            u32::from(self.delete_weight),
        ])?;

        Ok(Workload {
            name: self.name,
            concurrency: self.concurrency.clamp(1, MAX_CONCURRENCY),
            rng: SmallRng::seed_from_u64(self.seed),
            task_distribution,
        })
    }
}

/// A named mix of `set`, `get` and `delete` tasks that can be run against a remote.
#[derive(Debug)]
pub struct Workload {
    /// Name of the workload for identification in logs and reports.
    pub(crate) name: String,
    /// The maximum number of concurrent requests within this workload.
    pub(crate) concurrency: usize,

    /// The RNG driving task selection and all generated keys and values.
    rng: SmallRng,
    /// Selects the next task according to the configured weights.
    task_distribution: WeightedIndex<u32>,
}

impl Workload {
    /// Constructs a new workload builder with the given name.
    ///
    /// All tasks are weighted equally by default.
    pub fn builder(name: impl Into<String>) -> WorkloadBuilder {
        WorkloadBuilder {
            name: name.into(),
            concurrency: available_parallelism().map_or(1, |n| n.get()),
            seed: rand::random(),

            set_weight: 1,
            get_weight: 1,
            delete_weight: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Picks the next task by weight and generates a fresh request for it.
    ///
    /// Keys for `get` and `delete` are random and independent of earlier `set` requests.
    pub fn next_request(&mut self) -> Request {
        let task = Task::ALL[self.task_distribution.sample(&mut self.rng)];
        Request::for_task(task, &mut self.rng)
    }
}
