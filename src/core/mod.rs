//! Core compiler logic: markup, normalization, parameters, mappings, config.

pub mod config;
pub mod markup;
pub mod params;
pub mod parser;
pub mod resolver;
pub mod types;
