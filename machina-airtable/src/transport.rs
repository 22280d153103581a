//! HTTP transport seam for the remote tabular API
//!
//! The client talks to the wire through the `TableTransport` trait so the
//! caching, retry, and mapping logic can be exercised against an
//! in-memory implementation. `HttpTransport` is the production
//! implementation over reqwest with bearer-token auth.

use async_trait::async_trait;
use machina_core::{MachinaResult, RemoteError, StoreConfig};
use serde_json::Value;

/// A raw HTTP exchange result: status plus unparsed body.
///
/// Status classification (404 sentinel, retryable ranges, error bodies)
/// is the client's concern, not the transport's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Low-level access to one table of the remote store.
///
/// `path` is relative to the table: empty for the collection, `/{id}` for
/// one record. Implementations only fail on network-level errors; any
/// HTTP status comes back as a normal `ApiResponse`.
#[async_trait]
pub trait TableTransport: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> MachinaResult<ApiResponse>;
    async fn post(&self, path: &str, body: &Value) -> MachinaResult<ApiResponse>;
    async fn patch(&self, path: &str, body: &Value) -> MachinaResult<ApiResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!(
                "https://api.airtable.com/v0/{}/{}",
                config.base_id, config.table
            ),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> MachinaResult<ApiResponse> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| RemoteError::Network {
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| RemoteError::Network {
            message: format!("Failed to read response body: {}", e),
        })?;

        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl TableTransport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> MachinaResult<ApiResponse> {
        self.execute(self.http.get(self.url(path)).query(query)).await
    }

    async fn post(&self, path: &str, body: &Value) -> MachinaResult<ApiResponse> {
        self.execute(self.http.post(self.url(path)).json(body)).await
    }

    async fn patch(&self, path: &str, body: &Value) -> MachinaResult<ApiResponse> {
        self.execute(self.http.patch(self.url(path)).json(body)).await
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StoreConfig {
        StoreConfig::from_lookup(|name| match name {
            "MACHINA_AIRTABLE_API_KEY" => Some("keySECRET".to_string()),
            "MACHINA_AIRTABLE_BASE_ID" => Some("appBASE".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_includes_base_and_table() {
        let transport = HttpTransport::new(&test_config());
        assert_eq!(
            transport.url("/rec123"),
            "https://api.airtable.com/v0/appBASE/Products/rec123"
        );
        assert_eq!(
            transport.url(""),
            "https://api.airtable.com/v0/appBASE/Products"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let transport = HttpTransport::new(&test_config());
        let debug = format!("{:?}", transport);
        assert!(!debug.contains("keySECRET"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_api_response_success_range() {
        assert!(ApiResponse { status: 200, body: String::new() }.is_success());
        assert!(ApiResponse { status: 204, body: String::new() }.is_success());
        assert!(!ApiResponse { status: 404, body: String::new() }.is_success());
        assert!(!ApiResponse { status: 500, body: String::new() }.is_success());
    }
}
