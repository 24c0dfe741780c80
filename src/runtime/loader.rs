//! FM-007: Load state machine.
//!
//! ```text
//! UNINITIALIZED ──load──> LOADING ──ok──> LOADED ──load──> LOADING ...
//!                            └──err──> FAILED ──load──> LOADING ...
//! ```
//!
//! Backend info, frontend elements and mappings are fetched in that order.
//! The first failure aborts the rest and leaves the store untouched.

use super::store::DefinitionStore;
use crate::core::types::FeatureDefinition;
use crate::error::Result;
use crate::gateway::Gateway;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Uninitialized,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "UNINITIALIZED"),
            Self::Loading => write!(f, "LOADING"),
            Self::Loaded => write!(f, "LOADED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadStateMachine {
    state: LoadState,
    last_error: Option<String>,
}

impl LoadStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Message of the most recent failed load; cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn transition(&mut self, next: LoadState) {
        debug!(from = %self.state, to = %next, "load state");
        self.state = next;
    }

    /// Run one load. Returns the new revision on success.
    pub async fn run(&mut self, gateway: &dyn Gateway, store: &mut DefinitionStore) -> Result<u64> {
        self.transition(LoadState::Loading);
        match fetch(gateway).await {
            Ok(definition) => {
                let revision = store.commit(definition);
                self.last_error = None;
                self.transition(LoadState::Loaded);
                info!(feature = gateway.feature(), revision, "feature loaded");
                Ok(revision)
            }
            Err(e) => {
                warn!(feature = gateway.feature(), error = %e, "feature load failed");
                self.last_error = Some(e.to_string());
                self.transition(LoadState::Failed);
                Err(e)
            }
        }
    }
}

async fn fetch(gateway: &dyn Gateway) -> Result<FeatureDefinition> {
    let backend = gateway.backend_info().await?;
    let frontend = gateway.frontend_elements().await?;
    let mappings = gateway.mappings().await?;
    let mut definition = FeatureDefinition::assemble(backend, frontend, mappings);
    if definition.name.is_empty() {
        definition.name = gateway.feature().to_string();
    }
    Ok(definition)
}
