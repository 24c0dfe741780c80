//! FM-009: Execution gateway, the single dispatch point for backend calls.
//!
//! ```text
//! mock bundle? ──yes──> canned entry | LookupError
//!      │no
//! before-hook ──Some──> substitute ─┐
//!      │None                        │
//! transport call ───────────────────┤
//!                                   v
//!                              after-hook ──> caller
//! any error ──> on_error ──> caller
//! ```
//!
//! The mock and live paths are two `Gateway` implementations; which one a
//! context gets is decided once, by `GatewayBuilder::build`.

pub mod hooks;
pub mod live;
pub mod mock;

pub use crate::transport::Params;
pub use hooks::{GatewayHooks, NoHooks, TracingHooks};
pub use live::LiveGateway;
pub use mock::{MockBundle, MockGateway};

use crate::core::types::*;
use crate::error::{Error, Result};
use crate::transport::Transport;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Operation family an error event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Action,
    /// Backend info and frontend element fetches
    Feature,
    Mappings,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Action => write!(f, "action"),
            Self::Feature => write!(f, "feature"),
            Self::Mappings => write!(f, "mappings"),
        }
    }
}

/// Payload handed to `GatewayHooks::on_error`.
#[derive(Debug)]
pub struct ErrorEvent<'a> {
    pub error: &'a Error,
    pub context: OperationKind,
    pub feature: &'a str,
    pub query_id: Option<&'a str>,
    pub action_id: Option<&'a str>,
}

/// Backend operations for one feature.
#[async_trait]
pub trait Gateway: Send + Sync {
    fn feature(&self) -> &str;

    /// Unhooked fetch used by `load`; errors are reported under `feature`.
    async fn backend_info(&self) -> Result<BackendInfo>;

    async fn frontend_elements(&self) -> Result<FrontendElements>;

    async fn mappings(&self) -> Result<MappingsResponse>;

    async fn execute_query(&self, query_id: &str, params: &Params) -> Result<QueryResponse>;

    async fn execute_action(&self, action_id: &str, params: &Params) -> Result<ActionResponse>;
}

/// Report an error to the hooks and hand it back.
pub(crate) async fn report<T>(
    hooks: &dyn GatewayHooks,
    feature: &str,
    context: OperationKind,
    ids: (Option<&str>, Option<&str>),
    error: Error,
) -> Result<T> {
    hooks
        .on_error(&ErrorEvent {
            error: &error,
            context,
            feature,
            query_id: ids.0,
            action_id: ids.1,
        })
        .await;
    Err(error)
}

/// Chooses the dispatch strategy for a feature.
///
/// A mock bundle wins over a transport; with neither, `build` fails.
pub struct GatewayBuilder {
    feature: String,
    bundle: Option<MockBundle>,
    transport: Option<Arc<dyn Transport>>,
    hooks: Arc<dyn GatewayHooks>,
}

impl GatewayBuilder {
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            bundle: None,
            transport: None,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn mock_bundle(mut self, bundle: MockBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn hooks(mut self, hooks: impl GatewayHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn shared_hooks(mut self, hooks: Arc<dyn GatewayHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<Box<dyn Gateway>> {
        if self.feature.is_empty() {
            return Err(Error::Config("feature name must not be empty".into()));
        }
        if let Some(bundle) = self.bundle {
            tracing::debug!(feature = %self.feature, "using mock gateway");
            return Ok(Box::new(MockGateway::new(self.feature, bundle, self.hooks)));
        }
        match self.transport {
            Some(transport) => {
                tracing::debug!(feature = %self.feature, "using live gateway");
                Ok(Box::new(LiveGateway::new(
                    self.feature,
                    transport,
                    self.hooks,
                )))
            }
            None => Err(Error::Config(format!(
                "feature '{}' has neither a mock bundle nor a transport",
                self.feature
            ))),
        }
    }
}
