//! # teststat-core
//!
//! The execution side of TESTstat.
//!
//! This crate provides:
//! - The three trait seams (`SchemaRegistry`, `Transport`, `Evaluator`)
//! - The `Runner` that fetches each case's response, hands it to the
//!   evaluator, and collects per-case outcomes (batched, sequential, or as a
//!   comparison between two hosts)
//! - A version comparison that asks one host for the same resources under
//!   several data call versions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use teststat_core::{Runner, traits::{Evaluator, SchemaRegistry, Transport}};
//! ```

pub mod runner;
pub mod traits;

pub use runner::{
    HostComparison, ResourceComparison, Runner, StopSignal, VersionComparison, VersionOutput, VersionResult,
};
