//! FM-007: Feature context, the per-feature runtime handle.
//!
//! Owns the gateway, the definition store and the load state machine for
//! one feature identity. Nothing is shared between contexts.

use super::loader::{LoadState, LoadStateMachine};
use super::store::DefinitionStore;
use crate::core::config::RuntimeConfig;
use crate::core::parser::{parse_spec_file, ParseOptions};
use crate::core::resolver::{self, MappingTable};
use crate::core::types::*;
use crate::error::Result;
use crate::gateway::{Gateway, GatewayBuilder, GatewayHooks, MockBundle, Params};
use crate::transport::local::LocalTransport;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

pub struct FeatureContext {
    gateway: Box<dyn Gateway>,
    store: DefinitionStore,
    loader: LoadStateMachine,
}

impl FeatureContext {
    pub fn new(gateway: Box<dyn Gateway>) -> Self {
        Self {
            gateway,
            store: DefinitionStore::new(),
            loader: LoadStateMachine::new(),
        }
    }

    /// Build a context from `forma.yaml`: the mock bundle if one is
    /// configured, otherwise a local transport over the compiled spec file.
    pub fn from_config(config: &RuntimeConfig, hooks: Arc<dyn GatewayHooks>) -> Result<Self> {
        let builder = GatewayBuilder::new(config.feature.clone()).shared_hooks(hooks);
        let builder = match config.mock_bundle_path() {
            Some(path) => {
                debug!(path = %path.display(), "loading mock bundle");
                builder.mock_bundle(MockBundle::load(&path)?)
            }
            None => {
                let options = ParseOptions {
                    strict: config.strict,
                };
                let compiled = parse_spec_file(&config.spec_path(), options)?;
                builder.transport(LocalTransport::new(compiled.definition))
            }
        };
        Ok(Self::new(builder.build()?))
    }

    pub fn feature(&self) -> &str {
        self.gateway.feature()
    }

    /// Fetch backend info, frontend elements and mappings, then swap them
    /// in. On failure the previously loaded data stays visible.
    pub async fn load(&mut self) -> Result<u64> {
        self.loader.run(self.gateway.as_ref(), &mut self.store).await
    }

    pub fn state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.loader.last_error()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    pub fn definition(&self) -> Option<&FeatureDefinition> {
        self.store.definition()
    }

    pub fn mappings(&self) -> &MappingTable {
        self.store.mappings()
    }

    pub fn resolve_field<'a>(&self, field: &'a Field) -> Cow<'a, Field> {
        resolver::resolve_field(field, self.store.mappings())
    }

    pub fn resolve_column<'a>(&self, column: &'a Column) -> Cow<'a, Column> {
        resolver::resolve_column(column, self.store.mappings())
    }

    /// Form with every field resolved, or `None` if the id is unknown.
    pub fn resolved_form(&self, id: &str) -> Option<Form> {
        self.store
            .form(id)
            .map(|form| resolver::resolve_form(form, self.store.mappings()))
    }

    /// Data table with every column resolved, or `None` if the id is unknown.
    pub fn resolved_table(&self, id: &str) -> Option<DataTable> {
        self.store
            .data_table(id)
            .map(|table| resolver::resolve_table(table, self.store.mappings()))
    }

    pub async fn execute_query(&self, query_id: &str, params: &Params) -> Result<QueryResponse> {
        self.gateway.execute_query(query_id, params).await
    }

    pub async fn execute_action(&self, action_id: &str, params: &Params) -> Result<ActionResponse> {
        self.gateway.execute_action(action_id, params).await
    }

    /// Release the loaded definition.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}
