//! REST gateway for PostgREST-style table APIs.
//!
//! The HTTP client is abstracted behind [`HttpClient`] so the gateway works
//! with whatever client the host application already ships (reqwest, hyper,
//! a platform bridge).

use crate::error::{RemoteError, RemoteResult};
use crate::gateway::RemoteGateway;
use crate::wire::WireRow;
use std::fmt::Write as _;
use std::future::Future;
use tracing::debug;

/// HTTP method used by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// DELETE.
    Delete,
}

/// A request handed to the [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL including the query string.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the first header value named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response returned by the [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Returns `Err` only when no response was received.
pub trait HttpClient: Send + Sync + 'static {
    /// Sends a request.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, String>> + Send;
}

/// Connection settings of a [`RestGateway`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Public API key, sent as `apikey`.
    pub api_key: String,
    /// Session token of the signed-in user. The API key is used as bearer
    /// when absent.
    pub access_token: Option<String>,
    /// Path prefix of the table API.
    pub rest_path: String,
}

impl RestConfig {
    /// Creates a configuration with the default `/rest/v1` prefix.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            rest_path: "/rest/v1".into(),
        }
    }

    /// Sets the session token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the table API prefix.
    pub fn with_rest_path(mut self, path: impl Into<String>) -> Self {
        self.rest_path = path.into();
        self
    }
}

/// Gateway speaking the PostgREST table protocol.
pub struct RestGateway<C: HttpClient> {
    config: RestConfig,
    client: C,
}

impl<C: HttpClient> RestGateway<C> {
    /// Creates a gateway.
    pub fn new(config: RestConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.rest_path,
            table
        )
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<Vec<u8>>) -> HttpRequest {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key);
        let mut headers = vec![
            ("apikey".to_owned(), self.config.api_key.clone()),
            ("Authorization".to_owned(), format!("Bearer {bearer}")),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
        }
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    async fn execute(&self, request: HttpRequest) -> RemoteResult<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "remote request");
        let response = self
            .client
            .send(request)
            .await
            .map_err(RemoteError::Transport)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(RemoteError::rejected(
                response.status,
                error_message(&response.body),
            ))
        }
    }
}

impl<C: HttpClient> RemoteGateway for RestGateway<C> {
    async fn upsert_many<W: WireRow>(&self, rows: &[W]) -> RemoteResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let body = serde_json::to_vec(rows)?;
        let mut request = self.request(HttpMethod::Post, self.table_url(W::TABLE), Some(body));
        request.headers.push((
            "Prefer".to_owned(),
            "resolution=merge-duplicates,return=minimal".to_owned(),
        ));
        self.execute(request).await.map(|_| ())
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> RemoteResult<()> {
        let url = format!("{}?id=eq.{}", self.table_url(table), encode_query_value(id));
        let request = self.request(HttpMethod::Delete, url, None);
        self.execute(request).await.map(|_| ())
    }

    async fn select_by_owner<W: WireRow>(&self, owner: &str) -> RemoteResult<Vec<W>> {
        let url = format!(
            "{}?{}=eq.{}&select=*",
            self.table_url(W::TABLE),
            W::OWNER_COLUMN,
            encode_query_value(owner)
        );
        let request = self.request(HttpMethod::Get, url, None);
        let response = self.execute(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Extracts `message` from a PostgREST error body, falling back to the raw
/// text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

/// Percent-encodes everything except RFC 3986 unreserved characters.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
