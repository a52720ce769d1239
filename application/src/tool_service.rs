use domain::ports::{ToolDescriptor, ToolExecutor};
use serde_json::Value;
use std::sync::Arc;

pub const TOOL_UNAVAILABLE_MESSAGE: &str = "The tool service is unavailable right now.";
const HEALTH_CHECK_TOOL: &str = "get_system_info";

/// Runs named tools and turns every failure into a fixed message.
pub struct ToolService {
    executor: Arc<dyn ToolExecutor>,
}

impl ToolService {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }

    pub async fn run(&self, tool: &str, args: Value) -> String {
        match self.executor.call(tool, args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool, error = %e, transient = e.is_transient(), "tool call failed");
                TOOL_UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }

    /// True when the bridge answers a system-info call.
    pub async fn check(&self) -> bool {
        match self
            .executor
            .call(HEALTH_CHECK_TOOL, Value::Object(Default::default()))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "tool bridge health check failed");
                false
            }
        }
    }

    pub async fn list(&self) -> Vec<ToolDescriptor> {
        self.executor.list_tools().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "listing tools failed");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::error::{CollaboratorError, CollaboratorResult};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<(String, Value)>>,
        fail: bool,
    }

    #[async_trait]
    impl ToolExecutor for RecordingExecutor {
        async fn call(&self, tool: &str, args: Value) -> CollaboratorResult<String> {
            self.calls.lock().unwrap().push((tool.to_string(), args));
            if self.fail {
                return Err(CollaboratorError::Unavailable("down".to_string()));
            }
            Ok(format!("{tool} ok"))
        }

        async fn list_tools(&self) -> CollaboratorResult<Vec<ToolDescriptor>> {
            if self.fail {
                return Err(CollaboratorError::Unavailable("down".to_string()));
            }
            Ok(vec![ToolDescriptor {
                name: HEALTH_CHECK_TOOL.to_string(),
                description: "System info".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn successful_call_passes_output_through() {
        let executor = Arc::new(RecordingExecutor::default());
        let service = ToolService::new(executor.clone());
        assert_eq!(service.run("wiki_search", json!({ "query": "vpn" })).await, "wiki_search ok");
        assert_eq!(
            executor.calls.lock().unwrap()[0],
            ("wiki_search".to_string(), json!({ "query": "vpn" }))
        );
    }

    #[tokio::test]
    async fn failures_map_to_fixed_message() {
        let service = ToolService::new(Arc::new(RecordingExecutor {
            fail: true,
            ..Default::default()
        }));
        assert_eq!(service.run("wiki_search", json!({})).await, TOOL_UNAVAILABLE_MESSAGE);
        assert!(!service.check().await);
        assert!(service.list().await.is_empty());
    }

    #[tokio::test]
    async fn check_calls_system_info() {
        let executor = Arc::new(RecordingExecutor::default());
        let service = ToolService::new(executor.clone());
        assert!(service.check().await);
        assert_eq!(executor.calls.lock().unwrap()[0].0, HEALTH_CHECK_TOOL);
        assert_eq!(service.list().await.len(), 1);
    }
}
