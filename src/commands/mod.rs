//! CLI command implementations for minute.
//!
//! Each submodule implements one subcommand of the `minute` binary.
//!
//! # Command Categories
//!
//! ## Experiment
//! - [`overview`] - Validate the library and scaling group tables
//!
//! ## Duplicate marking
//! - [`proxy`] - Project paired-end alignments to single-end proxies
//! - [`dedup_proxy`] - Mark duplicates among single-end proxies
//! - [`propagate`] - Carry proxy verdicts back to the paired-end alignments
//!
//! ## Scaling and statistics
//! - [`scale`] - Compute scaling factors for a scaling group
//! - [`genome_size`] - Effective genome size of a reference
//! - [`stats`] - Statistics row of one library
//! - [`summarize`] - Combine statistics rows into one table

#![allow(
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::redundant_closure_for_method_calls,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod dedup_proxy;
pub mod genome_size;
pub mod overview;
pub mod propagate;
pub mod proxy;
pub mod scale;
pub mod stats;
pub mod summarize;
