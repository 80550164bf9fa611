#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for depsnap
//!
//! This library consolidates all functionality for the depsnap tool, which synthesizes
//! realistic repository dependency snapshots and loads them into a wide-column store.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`graph`]: Dependency-graph generation
//! - [`ingest`]: Concurrent, batched ingestion into the store

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod graph;
pub mod ingest;

pub use crate::commands::{Host, run};
