//! FM-008: Backend transport abstraction.
//!
//! The gateway never talks to a backend directly; it goes through a
//! `Transport`. One implementation ships with the crate (`local`, a dry-run
//! backend serving a compiled definition); embedders supply their own for
//! HTTP or database access.

pub mod local;

use crate::core::types::{
    ActionResponse, BackendInfo, FrontendElements, MappingsResponse, QueryResponse,
};
use crate::error::Result;
use async_trait::async_trait;

/// Named parameters for a query or action call.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// One backend round-trip per method. Implementations must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn backend_info(&self, feature: &str) -> Result<BackendInfo>;

    async fn frontend_elements(&self, feature: &str) -> Result<FrontendElements>;

    async fn mappings(&self, feature: &str) -> Result<MappingsResponse>;

    async fn execute_query(
        &self,
        feature: &str,
        query_id: &str,
        params: &Params,
    ) -> Result<QueryResponse>;

    async fn execute_action(
        &self,
        feature: &str,
        action_id: &str,
        params: &Params,
    ) -> Result<ActionResponse>;
}

/// Parse `key=value` pairs into call parameters.
///
/// Values that read as JSON scalars (`42`, `true`, `null`, `"quoted"`) keep
/// their type; anything else is a string.
pub fn parse_params<S: AsRef<str>>(pairs: &[S]) -> std::result::Result<Params, String> {
    let mut params = Params::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("invalid parameter '{}': expected key=value", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("invalid parameter '{}': empty key", pair));
        }
        let value = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(v) if !v.is_object() && !v.is_array() => v,
            _ => serde_json::Value::String(raw.to_string()),
        };
        params.insert(key.to_string(), value);
    }
    Ok(params)
}
