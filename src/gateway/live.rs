//! FM-009: Live dispatch through hooks and a transport.

use super::{report, Gateway, GatewayHooks, OperationKind, Params};
use crate::core::types::*;
use crate::error::Result;
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct LiveGateway {
    feature: String,
    transport: Arc<dyn Transport>,
    hooks: Arc<dyn GatewayHooks>,
}

impl LiveGateway {
    pub fn new(
        feature: impl Into<String>,
        transport: Arc<dyn Transport>,
        hooks: Arc<dyn GatewayHooks>,
    ) -> Self {
        Self {
            feature: feature.into(),
            transport,
            hooks,
        }
    }
}

#[async_trait]
impl Gateway for LiveGateway {
    fn feature(&self) -> &str {
        &self.feature
    }

    async fn backend_info(&self) -> Result<BackendInfo> {
        match self.transport.backend_info(&self.feature).await {
            Ok(info) => Ok(info),
            Err(e) => {
                report(
                    self.hooks.as_ref(),
                    &self.feature,
                    OperationKind::Feature,
                    (None, None),
                    e,
                )
                .await
            }
        }
    }

    async fn frontend_elements(&self) -> Result<FrontendElements> {
        let outcome = match self.hooks.before_frontend(&self.feature).await {
            Some(substitute) => {
                debug!(feature = %self.feature, "frontend short-circuited by hook");
                Ok(substitute)
            }
            None => self.transport.frontend_elements(&self.feature).await,
        };
        match outcome {
            Ok(resp) => {
                self.hooks.after_frontend(&self.feature, &resp).await;
                Ok(resp)
            }
            Err(e) => {
                report(
                    self.hooks.as_ref(),
                    &self.feature,
                    OperationKind::Feature,
                    (None, None),
                    e,
                )
                .await
            }
        }
    }

    async fn mappings(&self) -> Result<MappingsResponse> {
        let outcome = match self.hooks.before_mappings(&self.feature).await {
            Some(substitute) => {
                debug!(feature = %self.feature, "mappings short-circuited by hook");
                Ok(substitute)
            }
            None => self.transport.mappings(&self.feature).await,
        };
        match outcome {
            Ok(resp) => {
                self.hooks.after_mappings(&self.feature, &resp).await;
                Ok(resp)
            }
            Err(e) => {
                report(
                    self.hooks.as_ref(),
                    &self.feature,
                    OperationKind::Mappings,
                    (None, None),
                    e,
                )
                .await
            }
        }
    }

    async fn execute_query(&self, query_id: &str, params: &Params) -> Result<QueryResponse> {
        let outcome = match self
            .hooks
            .before_query(&self.feature, query_id, params)
            .await
        {
            Some(substitute) => {
                debug!(feature = %self.feature, query_id, "query short-circuited by hook");
                Ok(substitute)
            }
            None => {
                self.transport
                    .execute_query(&self.feature, query_id, params)
                    .await
            }
        };
        match outcome {
            Ok(resp) => {
                self.hooks
                    .after_query(&self.feature, query_id, params, &resp)
                    .await;
                Ok(resp)
            }
            Err(e) => {
                report(
                    self.hooks.as_ref(),
                    &self.feature,
                    OperationKind::Query,
                    (Some(query_id), None),
                    e,
                )
                .await
            }
        }
    }

    async fn execute_action(&self, action_id: &str, params: &Params) -> Result<ActionResponse> {
        let outcome = match self
            .hooks
            .before_action(&self.feature, action_id, params)
            .await
        {
            Some(substitute) => {
                debug!(feature = %self.feature, action_id, "action short-circuited by hook");
                Ok(substitute)
            }
            None => {
                self.transport
                    .execute_action(&self.feature, action_id, params)
                    .await
            }
        };
        match outcome {
            Ok(resp) => {
                self.hooks
                    .after_action(&self.feature, action_id, params, &resp)
                    .await;
                Ok(resp)
            }
            Err(e) => {
                report(
                    self.hooks.as_ref(),
                    &self.feature,
                    OperationKind::Action,
                    (None, Some(action_id)),
                    e,
                )
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::gateway::ErrorEvent;
    use crate::transport::MockTransport;
    use std::sync::Mutex;

    /// Records every hook invocation; optionally substitutes query results.
    #[derive(Default)]
    struct Recorder {
        substitute: Option<QueryResponse>,
        events: Mutex<Vec<String>>,
        seen_total: Mutex<Option<u64>>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GatewayHooks for Recorder {
        async fn before_query(
            &self,
            _feature: &str,
            query_id: &str,
            _params: &Params,
        ) -> Option<QueryResponse> {
            self.push(format!("before_query:{}", query_id));
            self.substitute.clone()
        }

        async fn after_query(
            &self,
            _feature: &str,
            query_id: &str,
            _params: &Params,
            response: &QueryResponse,
        ) {
            self.push(format!("after_query:{}", query_id));
            *self.seen_total.lock().unwrap() = Some(response.total);
        }

        async fn after_action(
            &self,
            _feature: &str,
            action_id: &str,
            _params: &Params,
            _response: &ActionResponse,
        ) {
            self.push(format!("after_action:{}", action_id));
        }

        async fn on_error(&self, event: &ErrorEvent<'_>) {
            self.push(format!(
                "error:{}:{}:{}",
                event.context,
                event.feature,
                event.query_id.or(event.action_id).unwrap_or("-")
            ));
        }
    }

    fn gateway(transport: MockTransport, hooks: Arc<Recorder>) -> LiveGateway {
        LiveGateway::new("orders", Arc::new(transport), hooks)
    }

    #[tokio::test]
    async fn test_fm009_before_hook_substitute_reaches_after_hook() {
        let mut transport = MockTransport::new();
        transport.expect_execute_query().times(0);
        let hooks = Arc::new(Recorder {
            substitute: Some(QueryResponse {
                total: 99,
                ..QueryResponse::default()
            }),
            ..Recorder::default()
        });
        let gw = gateway(transport, hooks.clone());

        let resp = gw.execute_query("Q1", &Params::new()).await.unwrap();
        assert_eq!(resp.total, 99);
        assert_eq!(*hooks.seen_total.lock().unwrap(), Some(99));
        assert_eq!(hooks.events(), vec!["before_query:Q1", "after_query:Q1"]);
    }

    #[tokio::test]
    async fn test_fm009_transport_result_passes_through() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute_query()
            .withf(|feature, id, params| {
                feature == "orders" && id == "Q1" && params.contains_key("x")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(QueryResponse {
                    total: 5,
                    ..QueryResponse::default()
                })
            });
        let hooks = Arc::new(Recorder::default());
        let gw = gateway(transport, hooks.clone());

        let mut params = Params::new();
        params.insert("x".into(), serde_json::json!(1));
        let resp = gw.execute_query("Q1", &params).await.unwrap();
        assert_eq!(resp.total, 5);
        assert_eq!(*hooks.seen_total.lock().unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_fm009_error_hook_then_caller() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute_action()
            .times(1)
            .returning(|_, _, _| Err(Error::Backend("connection refused".into())));
        let hooks = Arc::new(Recorder::default());
        let gw = gateway(transport, hooks.clone());

        let err = gw
            .execute_action("A1", &Params::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(hooks.events(), vec!["error:action:orders:A1"]);
    }

    #[tokio::test]
    async fn test_fm009_backend_info_reports_feature_context() {
        let mut transport = MockTransport::new();
        transport
            .expect_backend_info()
            .times(1)
            .returning(|_| Err(Error::Backend("timeout".into())));
        let hooks = Arc::new(Recorder::default());
        let gw = gateway(transport, hooks.clone());

        assert!(gw.backend_info().await.is_err());
        assert_eq!(hooks.events(), vec!["error:feature:orders:-"]);
    }

    #[tokio::test]
    async fn test_fm009_mappings_error_context() {
        let mut transport = MockTransport::new();
        transport
            .expect_mappings()
            .times(1)
            .returning(|_| Err(Error::Backend("500".into())));
        let hooks = Arc::new(Recorder::default());
        let gw = gateway(transport, hooks.clone());

        assert!(gw.mappings().await.is_err());
        assert_eq!(hooks.events(), vec!["error:mappings:orders:-"]);
    }

    #[tokio::test]
    async fn test_fm009_action_after_hook() {
        let mut transport = MockTransport::new();
        transport.expect_execute_action().times(1).returning(|_, _, _| {
            Ok(ActionResponse {
                success: true,
                message: None,
                data: None,
            })
        });
        let hooks = Arc::new(Recorder::default());
        let gw = gateway(transport, hooks.clone());

        assert!(gw.execute_action("A1", &Params::new()).await.unwrap().success);
        assert_eq!(hooks.events(), vec!["after_action:A1"]);
    }

    /// Short-circuits action, frontend and mapping calls; records what
    /// the after-hooks observe.
    #[derive(Default)]
    struct Substitutes {
        action: Option<ActionResponse>,
        frontend: Option<FrontendElements>,
        mappings: Option<MappingsResponse>,
        events: Mutex<Vec<String>>,
    }

    impl Substitutes {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GatewayHooks for Substitutes {
        async fn before_action(
            &self,
            _feature: &str,
            _action_id: &str,
            _params: &Params,
        ) -> Option<ActionResponse> {
            self.action.clone()
        }

        async fn after_action(
            &self,
            _feature: &str,
            action_id: &str,
            _params: &Params,
            response: &ActionResponse,
        ) {
            self.events.lock().unwrap().push(format!(
                "after_action:{}:{}",
                action_id,
                response.message.as_deref().unwrap_or("-")
            ));
        }

        async fn before_frontend(&self, _feature: &str) -> Option<FrontendElements> {
            self.frontend.clone()
        }

        async fn after_frontend(&self, feature: &str, response: &FrontendElements) {
            self.events
                .lock()
                .unwrap()
                .push(format!("after_frontend:{}:{}", feature, response.version));
        }

        async fn before_mappings(&self, _feature: &str) -> Option<MappingsResponse> {
            self.mappings.clone()
        }

        async fn after_mappings(&self, feature: &str, response: &MappingsResponse) {
            self.events.lock().unwrap().push(format!(
                "after_mappings:{}:{}",
                feature,
                response.mappings.len()
            ));
        }
    }

    #[tokio::test]
    async fn test_fm009_action_substitute_skips_transport() {
        let mut transport = MockTransport::new();
        transport.expect_execute_action().times(0);
        let hooks = Arc::new(Substitutes {
            action: Some(ActionResponse {
                success: true,
                message: Some("cached".into()),
                data: None,
            }),
            ..Substitutes::default()
        });
        let gw = LiveGateway::new("orders", Arc::new(transport), hooks.clone());

        let resp = gw.execute_action("A1", &Params::new()).await.unwrap();
        assert_eq!(resp.message.as_deref(), Some("cached"));
        assert_eq!(hooks.events(), vec!["after_action:A1:cached"]);
    }

    #[tokio::test]
    async fn test_fm009_frontend_substitute_reaches_after_hook() {
        let mut transport = MockTransport::new();
        transport.expect_frontend_elements().times(0);
        let hooks = Arc::new(Substitutes {
            frontend: Some(FrontendElements {
                feature: "orders".into(),
                version: "7".into(),
                ..FrontendElements::default()
            }),
            ..Substitutes::default()
        });
        let gw = LiveGateway::new("orders", Arc::new(transport), hooks.clone());

        assert_eq!(gw.frontend_elements().await.unwrap().version, "7");
        assert_eq!(hooks.events(), vec!["after_frontend:orders:7"]);
    }

    #[tokio::test]
    async fn test_fm009_mappings_substitute_reaches_after_hook() {
        let mut transport = MockTransport::new();
        transport.expect_mappings().times(0);
        let hooks = Arc::new(Substitutes {
            mappings: Some(MappingsResponse {
                feature: "orders".into(),
                mappings: vec![Mapping::new("status"), Mapping::new("region")],
                ..MappingsResponse::default()
            }),
            ..Substitutes::default()
        });
        let gw = LiveGateway::new("orders", Arc::new(transport), hooks.clone());

        assert_eq!(gw.mappings().await.unwrap().mappings.len(), 2);
        assert_eq!(hooks.events(), vec!["after_mappings:orders:2"]);
    }

    #[tokio::test]
    async fn test_fm009_after_frontend_and_mappings_see_transport_result() {
        let mut transport = MockTransport::new();
        transport
            .expect_frontend_elements()
            .times(1)
            .returning(|_| {
                Ok(FrontendElements {
                    version: "3".into(),
                    ..FrontendElements::default()
                })
            });
        transport.expect_mappings().times(1).returning(|_| {
            Ok(MappingsResponse {
                mappings: vec![Mapping::new("status")],
                ..MappingsResponse::default()
            })
        });
        let hooks = Arc::new(Substitutes::default());
        let gw = LiveGateway::new("orders", Arc::new(transport), hooks.clone());

        gw.frontend_elements().await.unwrap();
        gw.mappings().await.unwrap();
        assert_eq!(
            hooks.events(),
            vec!["after_frontend:orders:3", "after_mappings:orders:1"]
        );
    }
}
