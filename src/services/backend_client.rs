use std::time::Duration;

use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::traits::backend_api::{ApiMethod, BackendApi};

/// `BackendApi` over HTTP with JSON bodies.
pub struct HttpBackendApi {
    client: Client,
    base_url: String,
}

#[bon]
impl HttpBackendApi {
    #[builder]
    pub fn new(
        #[builder(into)] base_url: String,
        timeout: Option<Duration>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(Duration::from_secs(30)))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl HttpBackendApi {
    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl BackendApi for HttpBackendApi {
    async fn fetch_api(
        &self,
        endpoint: &str,
        method: ApiMethod,
        params: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) -> Option<Value> {
        let url = self.endpoint_url(endpoint);
        let request = match method {
            ApiMethod::Get => {
                let mut r = self.client.get(&url);
                if let Some(params) = params {
                    r = r.query(params);
                }
                r
            }
            ApiMethod::Post => {
                let mut r = self.client.post(&url);
                if let Some(body) = body {
                    r = r.json(body);
                }
                r
            }
        }
        .header(reqwest::header::CONTENT_TYPE, "application/json");

        debug!(%url, ?method, "backend: request");
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                error!(%url, error = %e, "backend: request failed");
                return None;
            }
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                error!(%url, error = %e, "backend: error status");
                return None;
            }
        };
        match response.json::<Value>().await {
            Ok(v) => Some(v),
            Err(e) => {
                error!(%url, error = %e, "backend: invalid json");
                None
            }
        }
    }
}

/// True only when `users/check-auth/{id}` answers with a truthy `authenticated`.
pub async fn check_user_authenticated(api: &dyn BackendApi, user_id: &str) -> bool {
    let endpoint = format!("users/check-auth/{}", urlencoding::encode(user_id));
    api.fetch_api(&endpoint, ApiMethod::Get, None, None)
        .await
        .and_then(|v| v.get("authenticated").cloned())
        .is_some_and(|v| is_truthy(&v))
}

/// Fee quote from `chatbot/calculate-fee`; an empty object when unavailable.
pub async fn calculate_service_fee(
    api: &dyn BackendApi,
    service_type: &str,
    duration: Option<&str>,
    complexity: Option<&str>,
) -> Value {
    let mut data = Map::new();
    data.insert("service_type".to_string(), json!(service_type));
    if let Some(d) = duration.filter(|d| !d.is_empty()) {
        data.insert("duration".to_string(), json!(d));
    }
    if let Some(c) = complexity.filter(|c| !c.is_empty()) {
        data.insert("complexity".to_string(), json!(c));
    }
    api.fetch_api("chatbot/calculate-fee", ApiMethod::Post, None, Some(&Value::Object(data)))
        .await
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Truthiness of a JSON value: null, false, 0, "" and empty containers are false.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
