//! # teststat-verify
//!
//! Response verification for TESTstat.
//!
//! This crate provides [`engine::ExpectationEvaluator`], which implements the
//! [`teststat_core::traits::Evaluator`] trait, and the pieces it is built from:
//!
//! - [`normalize`]: canonical string form of response payloads
//! - [`path`]: `resolve_first` / `resolve_all` over arrow-delimited paths
//! - [`rules`]: per-field rule application and rule-list evaluation
//! - [`reshape`]: regrouping of nested-block expectations
//! - [`reconcile`]: existential record search for nested blocks
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use teststat_core::traits::{Evaluator, SchemaRegistry};
//! use teststat_verify::engine::ExpectationEvaluator;
//!
//! let spec = registry.data_call("as-overview")?;
//! let report = ExpectationEvaluator::new()
//!     .evaluate(spec, registry.nested_fields(), &actual, &expected)?;
//! assert!(report.passed());
//! ```

pub mod engine;
pub mod normalize;
pub mod path;
pub mod reconcile;
pub mod reshape;
pub mod rules;

pub use engine::ExpectationEvaluator;
