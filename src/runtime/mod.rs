//! Runtime: per-feature context, definition store, load sequencing.

pub mod context;
pub mod loader;
pub mod store;

pub use context::FeatureContext;
pub use loader::{LoadState, LoadStateMachine};
pub use store::DefinitionStore;
