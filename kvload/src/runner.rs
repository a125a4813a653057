//! Run workloads concurrently against a remote key-value service and print metrics.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use yansi::Paint;

use crate::error::Result as RequestResult;
use crate::http::{HttpRemote, Reply};
use crate::metrics::WorkloadMetrics;
use crate::request::Task;
use crate::workload::Workload;

/// The statistics of a single workload after a run.
#[derive(Debug)]
pub struct WorkloadSummary {
    pub name: String,
    pub concurrency: usize,
    pub metrics: WorkloadMetrics,
}

/// The statistics of a complete run.
#[derive(Debug)]
pub struct Summary {
    pub workloads: Vec<WorkloadSummary>,
    /// Statistics merged across all workloads.
    pub total: WorkloadMetrics,
}

/// Runs the given workloads concurrently against the remote.
///
/// Every workload issues requests until `duration` has passed, then waits for its outstanding
/// requests. Failed requests are counted but never retried. Metrics are printed once all
/// workloads have finished.
pub async fn run(
    remote: HttpRemote,
    workloads: Vec<Workload>,
    duration: Duration,
) -> Result<Summary> {
    let remote = Arc::new(remote);

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message("Running load test:");
    bar.enable_steady_tick(Duration::from_millis(100));

    tracing::info!(workloads = workloads.len(), ?duration, "starting load test");

    // run the workloads concurrently
    let tasks: Vec<_> = workloads
        .into_iter()
        .map(|workload| {
            let remote = Arc::clone(&remote);
            tokio::spawn(run_workload(remote, workload, duration))
        })
        .collect();

    let finished_tasks = futures::future::join_all(tasks).await;
    bar.finish_and_clear();

    let mut summary = Summary {
        workloads: Vec::with_capacity(finished_tasks.len()),
        total: WorkloadMetrics::default(),
    };

    for task in finished_tasks {
        let workload = task.context("workload task panicked")??;

        println!();
        println!(
            "{} {} (concurrency: {})",
            "## Workload".bold(),
            workload.name.bold().blue(),
            workload.concurrency.bold()
        );
        workload.metrics.print(duration);

        summary.total.merge(&workload.metrics)?;
        summary.workloads.push(workload);
    }

    println!();
    println!("{}", "## TOTALS".bold());
    summary.total.print(duration);
    println!();

    tracing::info!(
        ops = summary.total.total_ops(),
        failures = summary.total.total_failures(),
        "load test finished"
    );

    Ok(summary)
}

async fn run_workload(
    remote: Arc<HttpRemote>,
    workload: Workload,
    duration: Duration,
) -> Result<WorkloadSummary> {
    let name = workload.name.clone();
    let concurrency = workload.concurrency;

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let deadline = tokio::time::Instant::now() + duration;

    let workload = Arc::new(Mutex::new(workload));
    let metrics = Arc::new(Mutex::new(WorkloadMetrics::default()));

    // See <https://docs.rs/tokio/latest/tokio/time/struct.Sleep.html#examples>
    let sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(sleep);

    loop {
        if deadline.elapsed() > Duration::ZERO {
            break;
        }
        tokio::select! {
            permit = semaphore.clone().acquire_owned() => {
                let permit = permit.context("request semaphore closed")?;
                let request = match workload.lock() {
                    Ok(mut workload) => workload.next_request(),
                    Err(_) => anyhow::bail!("workload `{name}` poisoned"),
                };
                let remote = Arc::clone(&remote);
                let metrics = Arc::clone(&metrics);

                let task = async move {
                    let task = request.task();
                    let start = Instant::now();
                    let result = remote.send(&request).await;
                    let elapsed = start.elapsed();

                    record(&metrics, task, result, elapsed);
                    drop(permit);
                };
                tokio::spawn(task);
            }
            _ = &mut sleep => {
                break;
            }
        }
    }

    // by acquiring *all* the permits, we essentially wait for all outstanding requests to finish
    let permits = u32::try_from(concurrency).context("workload concurrency exceeds u32")?;
    let _permits = semaphore
        .acquire_many(permits)
        .await
        .context("request semaphore closed")?;

    let metrics = std::mem::take(&mut *metrics.lock().unwrap_or_else(PoisonError::into_inner));

    tracing::debug!(workload = %name, ops = metrics.total_ops(), "workload finished");

    Ok(WorkloadSummary {
        name,
        concurrency,
        metrics,
    })
}

/// Records the result of one request.
///
/// A poisoned lock still holds consistent counters, so samples keep being recorded.
fn record(
    metrics: &Mutex<WorkloadMetrics>,
    task: Task,
    result: RequestResult<Reply>,
    elapsed: Duration,
) {
    let mut metrics = metrics.lock().unwrap_or_else(PoisonError::into_inner);
    match result {
        Ok(reply) => metrics.record_success(task, &reply, elapsed),
        Err(err) => {
            tracing::debug!(
                error = &err as &dyn std::error::Error,
                %task,
                "request failed"
            );
            metrics.record_failure(task);
        }
    }
}
