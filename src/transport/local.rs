//! FM-008: Local dry-run transport.
//!
//! Serves the load responses straight from a compiled definition. Query and
//! action calls are checked against the declared parameters and answered
//! without touching any data source: queries return an empty page, actions
//! echo their parameters back.

use super::{Params, Transport};
use crate::core::types::*;
use crate::error::{Error, LookupKind, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalTransport {
    definition: Arc<FeatureDefinition>,
}

impl LocalTransport {
    pub fn new(definition: impl Into<Arc<FeatureDefinition>>) -> Self {
        Self {
            definition: definition.into(),
        }
    }

    fn check_feature(&self, feature: &str) -> Result<&FeatureDefinition> {
        if feature != self.definition.name {
            return Err(Error::Backend(format!(
                "unknown feature '{}' (serving '{}')",
                feature, self.definition.name
            )));
        }
        Ok(&self.definition)
    }
}

fn missing_parameters<'a>(declared: &'a [Parameter], params: &Params) -> Vec<&'a str> {
    declared
        .iter()
        .map(|p| p.name.as_str())
        .filter(|name| !params.contains_key(*name))
        .collect()
}

#[async_trait]
impl Transport for LocalTransport {
    async fn backend_info(&self, feature: &str) -> Result<BackendInfo> {
        Ok(self.check_feature(feature)?.backend.clone())
    }

    async fn frontend_elements(&self, feature: &str) -> Result<FrontendElements> {
        Ok(self.check_feature(feature)?.frontend_elements())
    }

    async fn mappings(&self, feature: &str) -> Result<MappingsResponse> {
        Ok(self.check_feature(feature)?.mappings_response())
    }

    async fn execute_query(
        &self,
        feature: &str,
        query_id: &str,
        params: &Params,
    ) -> Result<QueryResponse> {
        let def = self.check_feature(feature)?;
        let query = def
            .query(query_id)
            .ok_or_else(|| Error::lookup(LookupKind::Query, query_id))?;
        let missing = missing_parameters(&query.parameters, params);
        if !missing.is_empty() {
            return Err(Error::Backend(format!(
                "query '{}' is missing parameters: {}",
                query_id,
                missing.join(", ")
            )));
        }
        debug!(feature, query_id, "dry-run query");
        Ok(QueryResponse {
            data: Vec::new(),
            total: 0,
            page: params
                .get("page")
                .and_then(|v| v.as_u64())
                .and_then(|n| u32::try_from(n).ok()),
            page_size: params
                .get("pageSize")
                .and_then(|v| v.as_u64())
                .and_then(|n| u32::try_from(n).ok()),
        })
    }

    async fn execute_action(
        &self,
        feature: &str,
        action_id: &str,
        params: &Params,
    ) -> Result<ActionResponse> {
        let def = self.check_feature(feature)?;
        let action = def
            .action_query(action_id)
            .ok_or_else(|| Error::lookup(LookupKind::Action, action_id))?;
        let missing = missing_parameters(&action.parameters, params);
        if !missing.is_empty() {
            return Ok(ActionResponse {
                success: false,
                message: Some(format!("missing parameters: {}", missing.join(", "))),
                data: None,
            });
        }
        debug!(feature, action_id, kind = %action.kind, "dry-run action");
        Ok(ActionResponse {
            success: true,
            message: Some(format!("{} '{}' accepted (dry run)", action.kind, action_id)),
            data: Some(serde_json::Value::Object(params.clone())),
        })
    }
}
