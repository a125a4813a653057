//! Test utilities for kvload.
//!
//! This crate provides an in-process key-value server speaking the same API as the services
//! kvload targets, plus logging setup for tests. See the modules for all available utilities.

pub mod server;
pub mod store;
pub mod tracing;
