//! FM-009: Gateway hooks.
//!
//! Every method has a default body meaning "not registered". Before-hooks
//! may return a substitute result to skip the backend call; after-hooks
//! observe the final result but cannot change it. Hooks are awaited in
//! order, one at a time.

use super::{ErrorEvent, Params};
use crate::core::types::{ActionResponse, FrontendElements, MappingsResponse, QueryResponse};
use async_trait::async_trait;
use tracing::{debug, error};

#[async_trait]
pub trait GatewayHooks: Send + Sync {
    async fn before_query(
        &self,
        _feature: &str,
        _query_id: &str,
        _params: &Params,
    ) -> Option<QueryResponse> {
        None
    }

    async fn after_query(
        &self,
        _feature: &str,
        _query_id: &str,
        _params: &Params,
        _response: &QueryResponse,
    ) {
    }

    async fn before_action(
        &self,
        _feature: &str,
        _action_id: &str,
        _params: &Params,
    ) -> Option<ActionResponse> {
        None
    }

    async fn after_action(
        &self,
        _feature: &str,
        _action_id: &str,
        _params: &Params,
        _response: &ActionResponse,
    ) {
    }

    async fn before_frontend(&self, _feature: &str) -> Option<FrontendElements> {
        None
    }

    async fn after_frontend(&self, _feature: &str, _response: &FrontendElements) {}

    async fn before_mappings(&self, _feature: &str) -> Option<MappingsResponse> {
        None
    }

    async fn after_mappings(&self, _feature: &str, _response: &MappingsResponse) {}

    async fn on_error(&self, _event: &ErrorEvent<'_>) {}
}

/// No hooks registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl GatewayHooks for NoHooks {}

/// Logs every completed call and every error through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

#[async_trait]
impl GatewayHooks for TracingHooks {
    async fn after_query(
        &self,
        feature: &str,
        query_id: &str,
        params: &Params,
        response: &QueryResponse,
    ) {
        debug!(
            feature,
            query_id,
            params = params.len(),
            rows = response.data.len(),
            total = response.total,
            "query completed"
        );
    }

    async fn after_action(
        &self,
        feature: &str,
        action_id: &str,
        params: &Params,
        response: &ActionResponse,
    ) {
        debug!(
            feature,
            action_id,
            params = params.len(),
            success = response.success,
            "action completed"
        );
    }

    async fn after_frontend(&self, feature: &str, response: &FrontendElements) {
        debug!(
            feature,
            tables = response.data_tables.len(),
            forms = response.forms.len(),
            "frontend elements loaded"
        );
    }

    async fn after_mappings(&self, feature: &str, response: &MappingsResponse) {
        debug!(feature, mappings = response.resolved_count, "mappings loaded");
    }

    async fn on_error(&self, event: &ErrorEvent<'_>) {
        error!(
            feature = event.feature,
            context = %event.context,
            query_id = event.query_id,
            action_id = event.action_id,
            code = event.error.code(),
            "{}",
            event.error
        );
    }
}
