//! This is a load testing library which runs randomized key-value traffic against a remote
//! service.
//!
//! A [`Workload`] issues three tasks, `set`, `get` and `delete`, picked by configurable weights
//! (equal by default). Every request carries a freshly generated key of 10 symbols from
//! `A-Z0-9`; `set` requests additionally carry a 20 symbol value. Keys are never reused, so
//! `get` and `delete` requests almost always target keys that do not exist.
//!
//! Use [`run`] to drive workloads against an [`HttpRemote`] for a fixed duration. Latencies and
//! failures are collected per task and printed as a report.
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod observability;
pub mod request;
pub mod runner;
pub mod workload;

pub use crate::error::{Error, Result};
pub use crate::http::HttpRemote;
pub use crate::request::{Request, Task};
pub use crate::runner::{Summary, run};
pub use crate::workload::Workload;
