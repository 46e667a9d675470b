//! REST transport for the identity service
//!
//! This module implements the HTTP layer shared by the auth endpoints and
//! the profile data API. It provides request/response types, structured
//! error parsing, and the core client with default headers (API key and
//! bearer authorization).

use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

// =============================================================================
// Error Types
// =============================================================================

/// API error with HTTP status, provider error code, and message
///
/// Represents errors returned from the identity service, including both
/// network failures and application-level errors. The provider error code
/// is the structured `error_code` field when the service supplies one,
/// otherwise an empty string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("API error {status}: {code} - {message}")]
pub struct ApiError {
    status: u16,
    code: String,
    message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the provider error code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a network-related error
    ///
    /// Status 0 is used for transport failures that never produced an HTTP
    /// response.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.status,
            0 | 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524
        )
    }
}

/// Error body shapes the identity service is known to produce
///
/// The auth endpoints use `{error_code, msg}` or `{error, error_description}`
/// depending on the endpoint generation; the data API uses `{code, message}`.
/// All fields are optional so a single parse covers every variant.
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    code: Option<serde_json::Value>,
    message: Option<String>,
}

impl ErrorBody {
    fn into_api_error(self, status: u16) -> ApiError {
        let code = self
            .error_code
            .or(self.error)
            .or_else(|| self.code.as_ref().and_then(|c| c.as_str().map(String::from)))
            .unwrap_or_default();
        let message = self
            .msg
            .or(self.error_description)
            .or(self.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        ApiError::new(status, code, message)
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method for REST requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PATCH request
    Patch,
    /// DELETE request
    Delete,
}

/// A request to the identity service
///
/// Built with the fluent helpers and executed by [`RestClient::send`].
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the service base URL (e.g., "/auth/v1/signup")
    pub path: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// JSON request body
    pub body: Option<Vec<u8>>,
}

impl RestRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Create a PATCH request
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// Create a DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body from JSON
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(value)?);
        Ok(self)
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Base service URL (e.g., "https://id.example.com")
    pub base_url: String,
    /// Public API key sent as the `apikey` header on every request
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl RestClientConfig {
    /// Create a new config with a base URL and API key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Tidewell/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Client Implementation
// =============================================================================

/// REST client for the identity service
///
/// Sends the `apikey` header on every request and a bearer `Authorization`
/// header once one has been installed via [`RestClient::set_auth_header`].
/// The bearer slot is shared across clones so the auth and profile layers
/// observe the same credentials.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: ReqwestClient,
    config: RestClientConfig,
    auth_header: Arc<RwLock<Option<String>>>,
}

impl RestClient {
    /// Create a new REST client
    pub fn new(config: RestClientConfig) -> Self {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            config,
            auth_header: Arc::new(RwLock::new(None)),
        }
    }

    /// Install or clear the bearer authorization header
    pub fn set_auth_header(&self, access_token: Option<&str>) {
        let mut slot = self.auth_header.write().unwrap();
        *slot = access_token.map(|t| format!("Bearer {}", t));
    }

    /// Get the currently installed bearer header, if any
    pub fn auth_header(&self) -> Option<String> {
        self.auth_header.read().unwrap().clone()
    }

    /// Execute a request and deserialize the JSON response body
    pub async fn send<T>(&self, request: RestRequest) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            ApiError::new(0, "ParseError", format!("Failed to read response: {}", e))
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ApiError::new(
                status,
                "ParseError",
                format!("Failed to parse JSON: {}", e),
            )
        })
    }

    /// Execute a request, discarding any response body
    pub async fn send_no_content(&self, request: RestRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: RestRequest) -> Result<ReqwestResponse, ApiError> {
        let url = format!("{}{}", self.config.base_url, request.path);

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Patch => self.client.patch(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (key, value) in &request.query {
            req = req.query(&[(key, value)]);
        }

        req = req.header("apikey", &self.config.api_key);
        if let Some(auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.header("Content-Type", "application/json").body(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ApiError::new(0, "NetworkError", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();

            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => parsed.into_api_error(status),
                Err(_) => ApiError::new(status, "Unknown", format!("HTTP {}: {}", status, body)),
            });
        }

        Ok(response)
    }

    /// Get the client configuration
    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Get the service base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

// =============================================================================
// Tests
// =============================================================================
