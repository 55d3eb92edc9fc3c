use async_trait::async_trait;
use serde_json::Value;

/// HTTP method of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

/// The LegAI backend REST API as seen by the chatbot actions.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Calls `endpoint` under the API base URL. Any transport failure,
    /// non-2xx status or undecodable body yields `None`.
    async fn fetch_api(
        &self,
        endpoint: &str,
        method: ApiMethod,
        params: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) -> Option<Value>;
}
