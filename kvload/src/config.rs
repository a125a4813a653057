//! Configuration for a load test run.
//!
//! A run is configured from a YAML file:
//!
//! ```yaml
//! remote: http://127.0.0.1:8000
//! duration: 30s
//! timeout: 5s
//!
//! workloads:
//!   - name: mixed
//!     concurrency: 16
//!     tasks:
//!       set: 1
//!       get: 1
//!       delete: 1
//! ```
//!
//! `timeout` and `tasks` are optional. Without `tasks`, all tasks are weighted equally.

use std::path::Path;
use std::thread::available_parallelism;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::workload::Workload;

/// Name of the workload used when no configuration file is given.
pub const DEFAULT_WORKLOAD: &str = "kv";

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the key-value service.
    #[serde(default)]
    pub remote: Option<String>,

    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Per-request timeout. Requests wait indefinitely if unset.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    pub workloads: Vec<WorkloadConfig>,
}

#[derive(Debug, Deserialize)]
pub struct WorkloadConfig {
    pub name: String,
    pub concurrency: usize,
    #[serde(default)]
    pub tasks: TaskWeights,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct TaskWeights {
    #[serde(default)]
    pub set: u8,
    #[serde(default)]
    pub get: u8,
    #[serde(default)]
    pub delete: u8,
}

impl Default for TaskWeights {
    fn default() -> Self {
        Self {
            set: 1,
            get: 1,
            delete: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: None,
            duration: Duration::from_secs(30),
            timeout: None,
            workloads: vec![WorkloadConfig {
                name: DEFAULT_WORKLOAD.to_owned(),
                concurrency: available_parallelism().map_or(1, |n| n.get()),
                tasks: TaskWeights::default(),
            }],
        }
    }
}

impl Config {
    /// Loads the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let config_file = std::fs::File::open(path)
            .with_context(|| format!("failed to open config file `{}`", path.display()))?;
        serde_yaml::from_reader(config_file).context("failed to parse config YAML")
    }

    /// Builds all configured workloads.
    pub fn workloads(&self) -> Result<Vec<Workload>> {
        self.workloads
            .iter()
            .map(|w| {
                Workload::builder(w.name.as_str())
                    .concurrency(w.concurrency)
                    .task_weights(w.tasks.set, w.tasks.get, w.tasks.delete)
                    .build()
                    .with_context(|| format!("invalid workload `{}`", w.name))
            })
            .collect()
    }
}
