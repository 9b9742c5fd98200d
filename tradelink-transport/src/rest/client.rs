//! REST client with session recovery and anti-forgery tokens.

use reqwest::{Client, Method, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{Instrument, debug, warn};
use tradelink_core::error::{NetworkError, TradelinkError};
use tradelink_telemetry::spans::rest_span;

use super::auth::{CredentialCoordinator, CsrfTokenSource};
use super::config::RestConfig;

/// JSON client for the secondary request channel.
///
/// A 401 response triggers one `ensure_session` call and, if that succeeds,
/// one retry. A 403 that names the anti-forgery token triggers one token
/// refresh and one retry.
///
/// # Example
///
/// ```ignore
/// use tradelink_transport::rest::{RestClient, RestConfig};
///
/// let config = RestConfig::builder()
///     .base_url("https://app.example.com")
///     .build();
///
/// let client = RestClient::new(config)?.with_csrf(csrf);
/// let strategies: Vec<Strategy> = client.get("/api/strategies").send_json().await?;
/// ```
pub struct RestClient {
    config: RestConfig,
    http_client: Client,
    credentials: Option<Arc<dyn CredentialCoordinator>>,
    csrf: Option<Arc<dyn CsrfTokenSource>>,
}

impl RestClient {
    /// Creates a new REST client.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` if the HTTP client cannot be created.
    pub fn new(config: RestConfig) -> Result<Self, NetworkError> {
        let mut headers = header::HeaderMap::new();

        headers.insert(
            header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| NetworkError::ConnectionFailed {
                    reason: "Invalid user agent".to_string(),
                })?,
        );

        for (key, value) in &config.headers {
            headers.insert(
                header::HeaderName::try_from(key.as_str()).map_err(|_| {
                    NetworkError::ConnectionFailed {
                        reason: format!("Invalid header name: {key}"),
                    }
                })?,
                value.parse().map_err(|_| NetworkError::ConnectionFailed {
                    reason: format!("Invalid header value for {key}"),
                })?,
            );
        }

        let http_client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| NetworkError::ConnectionFailed {
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            http_client,
            credentials: None,
            csrf: None,
        })
    }

    /// Attaches the session coordinator consulted on 401 responses.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialCoordinator>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Attaches the anti-forgery token source used by mutating requests.
    #[must_use]
    pub fn with_csrf(mut self, csrf: Arc<dyn CsrfTokenSource>) -> Self {
        self.csrf = Some(csrf);
        self
    }

    /// Creates a GET request builder.
    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::GET, path)
    }

    /// Creates a POST request builder.
    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, path)
    }

    /// Creates a PUT request builder.
    #[must_use]
    pub fn put(&self, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PUT, path)
    }

    /// Creates a DELETE request builder.
    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::DELETE, path)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    /// Builds the full URL for a path.
    #[must_use]
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
        }
    }

    async fn execute(&self, request: &RequestBuilder<'_>, csrf_token: Option<&str>) -> Result<Response, NetworkError> {
        let url = self.build_url(&request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.http_client.request(request.method.clone(), &url);
        if !request.query_params.is_empty() {
            builder = builder.query(&request.query_params);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(token) = csrf_token {
            builder = builder.header(self.config.csrf_header.as_str(), token);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                }
            } else if e.is_connect() {
                NetworkError::ConnectionFailed {
                    reason: e.to_string(),
                }
            } else {
                NetworkError::Http {
                    status_code: e.status().map_or(0, |s| s.as_u16()),
                    reason: e.to_string(),
                }
            }
        })
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.config.base_url)
            .field("credentials", &self.credentials.is_some())
            .field("csrf", &self.csrf.is_some())
            .finish()
    }
}

/// Request builder for REST API calls.
pub struct RequestBuilder<'a> {
    client: &'a RestClient,
    method: Method,
    path: String,
    query_params: Vec<(String, String)>,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

impl<'a> RequestBuilder<'a> {
    fn new(client: &'a RestClient, method: Method, path: &str) -> Self {
        Self {
            client,
            method,
            path: path.to_string(),
            query_params: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Sets the request body as JSON.
    #[must_use]
    pub fn json<T: serde::Serialize>(mut self, body: &T) -> Self {
        self.body = serde_json::to_string(body).ok();
        self
    }

    /// Sets the request body as a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// Sends the request and returns the raw response.
    ///
    /// Error statuses other than the recovered 401/403 are returned as
    /// responses; `send_json` and `send_text` turn them into errors.
    ///
    /// # Errors
    ///
    /// Returns `TradelinkError::Network` if the request cannot be sent and
    /// `TradelinkError::Auth` if no anti-forgery token can be obtained.
    pub async fn send(self) -> Result<Response, TradelinkError> {
        let span = rest_span(self.method.as_str(), &self.path);
        self.send_inner().instrument(span).await
    }

    async fn send_inner(self) -> Result<Response, TradelinkError> {
        let client = self.client;
        let csrf = if self.is_mutating() { client.csrf.as_ref() } else { None };

        let mut csrf_token = match csrf {
            Some(source) => Some(source.get_token().await?),
            None => None,
        };
        let mut session_retried = false;
        let mut csrf_retried = false;

        loop {
            let response = client.execute(&self, csrf_token.as_deref()).await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !session_retried {
                let Some(credentials) = client.credentials.as_ref() else {
                    return Ok(response);
                };
                session_retried = true;
                if !credentials.ensure_session().await {
                    warn!("Session could not be restored");
                    return Ok(response);
                }
                debug!("Session restored, retrying");
                continue;
            }

            if status == StatusCode::FORBIDDEN && !csrf_retried && let Some(source) = csrf {
                let body = response.text().await.unwrap_or_default();
                if !is_csrf_rejection(&body) {
                    return Err(http_error(status, body).into());
                }
                csrf_retried = true;
                warn!("Anti-forgery token rejected, refreshing");
                csrf_token = Some(source.refresh_token().await?);
                continue;
            }

            return Ok(response);
        }
    }

    /// Sends the request and deserializes the response as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not a success,
    /// or the response cannot be parsed.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, TradelinkError> {
        let response = self.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status, body).into());
        }

        response.json::<T>().await.map_err(|e| {
            NetworkError::Http {
                status_code: status.as_u16(),
                reason: format!("Failed to parse response: {e}"),
            }
            .into()
        })
    }

    /// Sends the request and returns the response as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the status is not a success.
    pub async fn send_text(self) -> Result<String, TradelinkError> {
        let response = self.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status, body).into());
        }

        response.text().await.map_err(|e| {
            NetworkError::Http {
                status_code: status.as_u16(),
                reason: format!("Failed to read response: {e}"),
            }
            .into()
        })
    }
}

fn http_error(status: StatusCode, body: String) -> NetworkError {
    NetworkError::Http {
        status_code: status.as_u16(),
        reason: body,
    }
}

fn is_csrf_rejection(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("csrf") || lower.contains("xsrf")
}
