//! Forma: declarative feature specifications.
//!
//! A feature spec (queries, data tables, forms, mappings) is compiled once
//! into a typed `FeatureDefinition`. A `FeatureContext` loads it through a
//! `Gateway`, resolves mappings onto fields and columns, and dispatches
//! queries and actions through caller-supplied hooks or a mock bundle.

pub mod cli;
pub mod core;
pub mod error;
pub mod gateway;
pub mod runtime;
pub mod transport;

pub use error::{Error, Result};
