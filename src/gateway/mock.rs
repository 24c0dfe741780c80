//! FM-010: Mock bundle and closed-world mock gateway.
//!
//! A bundle is a static substitute for every backend response. It is closed
//! world: an id with no entry is a `LookupError`, never a soft miss. The
//! transport and the before/after hooks are never consulted; `on_error`
//! still sees lookup failures.

use super::{report, Gateway, GatewayHooks, OperationKind, Params};
use crate::core::types::*;
use crate::error::{Error, LookupKind, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Canned responses, keyed by query and action id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<FrontendElements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<MappingsResponse>,

    #[serde(default)]
    pub queries: IndexMap<String, QueryResponse>,

    #[serde(default)]
    pub actions: IndexMap<String, ActionResponse>,
}

impl MockBundle {
    /// Bundle answering every declared id: empty pages and successful actions.
    pub fn from_definition(def: &FeatureDefinition) -> Self {
        Self {
            backend: Some(def.backend.clone()),
            frontend: Some(def.frontend_elements()),
            mappings: Some(def.mappings_response()),
            queries: def
                .backend
                .queries
                .iter()
                .map(|q| (q.id.clone(), QueryResponse::default()))
                .collect(),
            actions: def
                .backend
                .action_queries
                .iter()
                .map(|a| {
                    (
                        a.id.clone(),
                        ActionResponse {
                            success: true,
                            message: None,
                            data: None,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from disk; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read mock bundle {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }
}

pub struct MockGateway {
    feature: String,
    bundle: MockBundle,
    hooks: Arc<dyn GatewayHooks>,
}

impl MockGateway {
    pub fn new(feature: impl Into<String>, bundle: MockBundle, hooks: Arc<dyn GatewayHooks>) -> Self {
        Self {
            feature: feature.into(),
            bundle,
            hooks,
        }
    }

    async fn section<T: Clone>(
        &self,
        entry: Option<&T>,
        name: &str,
        context: OperationKind,
    ) -> Result<T> {
        match entry {
            Some(value) => Ok(value.clone()),
            None => {
                let err = Error::lookup(LookupKind::MockEntry, name);
                report(self.hooks.as_ref(), &self.feature, context, (None, None), err).await
            }
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn feature(&self) -> &str {
        &self.feature
    }

    async fn backend_info(&self) -> Result<BackendInfo> {
        self.section(self.bundle.backend.as_ref(), "backend", OperationKind::Feature)
            .await
    }

    async fn frontend_elements(&self) -> Result<FrontendElements> {
        self.section(self.bundle.frontend.as_ref(), "frontend", OperationKind::Feature)
            .await
    }

    async fn mappings(&self) -> Result<MappingsResponse> {
        self.section(self.bundle.mappings.as_ref(), "mappings", OperationKind::Mappings)
            .await
    }

    async fn execute_query(&self, query_id: &str, _params: &Params) -> Result<QueryResponse> {
        match self.bundle.queries.get(query_id) {
            Some(resp) => Ok(resp.clone()),
            None => {
                let err = Error::lookup(LookupKind::Query, query_id);
                report(
                    self.hooks.as_ref(),
                    &self.feature,
                    OperationKind::Query,
                    (Some(query_id), None),
                    err,
                )
                .await
            }
        }
    }

    async fn execute_action(&self, action_id: &str, _params: &Params) -> Result<ActionResponse> {
        match self.bundle.actions.get(action_id) {
            Some(resp) => Ok(resp.clone()),
            None => {
                let err = Error::lookup(LookupKind::Action, action_id);
                report(
                    self.hooks.as_ref(),
                    &self.feature,
                    OperationKind::Action,
                    (None, Some(action_id)),
                    err,
                )
                .await
            }
        }
    }
}
