//! # teststat-registry
//!
//! The data call catalogue for TESTstat.
//!
//! - [`registry::TomlSchemaRegistry`] loads output schemas from TOML and
//!   implements [`teststat_core::traits::SchemaRegistry`]. A registry covering
//!   the supported RIPEstat data calls is embedded in the crate.
//! - [`form::FormModel`] derives an editable test-case form from one data
//!   call's schema.

pub mod form;
pub mod registry;

pub use registry::TomlSchemaRegistry;
