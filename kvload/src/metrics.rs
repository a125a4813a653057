//! Latency and failure statistics collected while running workloads.

use std::fmt;
use std::time::Duration;

use anyhow::{Result, anyhow};
use bytesize::ByteSize;
use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::http::{Outcome, Reply};
use crate::request::Task;

/// Statistics for a single task.
#[derive(Default)]
pub struct TaskMetrics {
    /// Latencies of successful requests, in seconds.
    timing: DDSketch,
    failures: u64,
}

impl TaskMetrics {
    fn merge(&mut self, other: &TaskMetrics) -> Result<()> {
        self.timing
            .merge(&other.timing)
            .map_err(|err| anyhow!("failed to merge latency sketches: {err:?}"))?;
        self.failures += other.failures;
        Ok(())
    }
}

impl fmt::Debug for TaskMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskMetrics")
            .field("ops", &self.timing.count())
            .field("failures", &self.failures)
            .finish()
    }
}

/// Statistics of one workload, or the totals across workloads.
#[derive(Debug, Default)]
pub struct WorkloadMetrics {
    set: TaskMetrics,
    get: TaskMetrics,
    delete: TaskMetrics,

    bytes_sent: u64,
    get_hits: u64,
    get_misses: u64,
}

impl WorkloadMetrics {
    fn task(&self, task: Task) -> &TaskMetrics {
        match task {
            Task::Set => &self.set,
            Task::Get => &self.get,
            Task::Delete => &self.delete,
        }
    }

    fn task_mut(&mut self, task: Task) -> &mut TaskMetrics {
        match task {
            Task::Set => &mut self.set,
            Task::Get => &mut self.get,
            Task::Delete => &mut self.delete,
        }
    }

    /// Records a successful request and its latency.
    pub fn record_success(&mut self, task: Task, reply: &Reply, elapsed: Duration) {
        self.task_mut(task).timing.add(elapsed.as_secs_f64());
        self.bytes_sent += reply.bytes_sent;
        match reply.outcome {
            Outcome::Found(_) => self.get_hits += 1,
            Outcome::Missing => self.get_misses += 1,
            Outcome::Stored | Outcome::Deleted => (),
        }
    }

    /// Records a failed request.
    pub fn record_failure(&mut self, task: Task) {
        self.task_mut(task).failures += 1;
    }

    /// Adds all statistics of `other` to these.
    pub fn merge(&mut self, other: &WorkloadMetrics) -> Result<()> {
        self.set.merge(&other.set)?;
        self.get.merge(&other.get)?;
        self.delete.merge(&other.delete)?;
        self.bytes_sent += other.bytes_sent;
        self.get_hits += other.get_hits;
        self.get_misses += other.get_misses;
        Ok(())
    }

    /// Number of successful requests of the given task.
    pub fn ops(&self, task: Task) -> usize {
        self.task(task).timing.count()
    }

    /// Number of failed requests of the given task.
    pub fn failures(&self, task: Task) -> u64 {
        self.task(task).failures
    }

    /// Number of successful requests across all tasks.
    pub fn total_ops(&self) -> usize {
        Task::ALL.into_iter().map(|task| self.ops(task)).sum()
    }

    /// Number of failed requests across all tasks.
    pub fn total_failures(&self) -> u64 {
        Task::ALL.into_iter().map(|task| self.failures(task)).sum()
    }

    pub fn get_hits(&self) -> u64 {
        self.get_hits
    }

    pub fn get_misses(&self) -> u64 {
        self.get_misses
    }

    /// Total size of all request bodies that were sent successfully.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Prints a report of these statistics for a run of the given duration.
    pub fn print(&self, duration: Duration) {
        for task in Task::ALL {
            let metrics = self.task(task);
            let label = format!("{}:", task.name().to_uppercase());

            if metrics.timing.count() > 0 {
                print!(
                    "{} ({} ops",
                    label.bold().green(),
                    metrics.timing.count().bold()
                );
                if metrics.failures > 0 {
                    print!(
                        ", {}",
                        format!("{} FAILURES", metrics.failures).bold().red()
                    );
                }
                if task == Task::Get {
                    print_miss_rate(self.get_hits, self.get_misses);
                }
                println!(")");
                print_ops(&metrics.timing, duration);
                println!();
                print_percentiles(&metrics.timing, Duration::from_secs_f64);
            } else if metrics.failures > 0 {
                println!(
                    "{}",
                    format!("{} {} FAILURES", metrics.failures, task.name().to_uppercase())
                        .bold()
                        .red()
                );
            }
        }

        if self.bytes_sent > 0 {
            print!("{}", "SENT:".bold().green());
            print_throughput(self.bytes_sent, duration);
        }
    }
}

fn print_miss_rate(hits: u64, misses: u64) {
    let lookups = hits + misses;
    if lookups > 0 {
        let rate = misses as f64 / lookups as f64 * 100.0;
        print!(", {:.2}% misses", rate.bold());
    }
}

fn quantile(sketch: &DDSketch, q: f64) -> f64 {
    sketch.quantile(q).ok().flatten().unwrap_or_default()
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let ops = sketch.count();
    let avg = map(sketch.sum().unwrap_or_default() / ops as f64);
    let p50 = map(quantile(sketch, 0.5));
    let p90 = map(quantile(sketch, 0.9));
    let p99 = map(quantile(sketch, 0.99));
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}

fn print_ops(sketch: &DDSketch, duration: Duration) {
    let ops = sketch.count();
    let ops_ps = ops as f64 / duration.as_secs_f64();
    print!("  {:.2} operations/s", ops_ps.bold());
}

fn print_throughput(total: u64, duration: Duration) {
    let throughput = (total as f64 / duration.as_secs_f64()) as u64;
    println!(
        " {} total, {:.2}/s",
        ByteSize::b(total),
        ByteSize::b(throughput).bold()
    );
}
