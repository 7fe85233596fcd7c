//! Blocking client for the hosting API.
//!
//! Every call goes through [`ApiClient::call`] with one of the
//! [`ApiRequest`] variants; the variant decides the verb, URI, query and
//! body, and the client signs and sends it.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::project::Credentials;

use super::signer::{RequestSigner, AUTH_HEADER, DATE_HEADER};

/// Default API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.markuphive.com";

/// Request timeout for every API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Requests
// =============================================================================

/// Query for a page of CMS entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    /// Content type name (e.g. "blog")
    pub type_name: String,

    /// Zero-based page number
    pub page: u32,

    /// Entries per page
    pub limit: u32,

    /// Only entries carrying all of these tags
    pub tags: Vec<String>,

    /// Timestamp filters passed through to the API
    pub timestamp: Vec<String>,
}

impl EntryQuery {
    /// First page of ten entries for a content type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            page: 0,
            limit: 10,
            tags: Vec::new(),
            timestamp: Vec::new(),
        }
    }
}

/// The calls the API client knows how to make.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    /// `GET /v1/cms/content-types/`
    ContentTypes,

    /// `GET /v1/cms/content-types/{type}/entries/`
    Entries(EntryQuery),

    /// `PUT /v0/application/{name}/` with a JSON payload
    PutApplication { payload: Bytes },
}

impl ApiRequest {
    pub fn method(&self) -> Method {
        match self {
            ApiRequest::ContentTypes | ApiRequest::Entries(_) => Method::GET,
            ApiRequest::PutApplication { .. } => Method::PUT,
        }
    }

    /// URI path for this request. This is the string that gets signed.
    pub fn uri(&self, application_name: &str) -> String {
        match self {
            ApiRequest::ContentTypes => "/v1/cms/content-types/".to_string(),
            ApiRequest::Entries(query) => format!(
                "/v1/cms/content-types/{}/entries/",
                urlencoding::encode(&query.type_name)
            ),
            ApiRequest::PutApplication { .. } => format!(
                "/v0/application/{}/",
                urlencoding::encode(application_name)
            ),
        }
    }

    /// Query parameters (not signed).
    pub fn query(&self) -> Vec<(String, String)> {
        match self {
            ApiRequest::Entries(query) => {
                let mut params = vec![
                    ("page".to_string(), query.page.to_string()),
                    ("limit".to_string(), query.limit.to_string()),
                ];
                params.extend(query.tags.iter().map(|t| ("tags".to_string(), t.clone())));
                params.extend(
                    query
                        .timestamp
                        .iter()
                        .map(|t| ("timestamp".to_string(), t.clone())),
                );
                params
            }
            _ => Vec::new(),
        }
    }

    pub fn body(&self) -> Bytes {
        match self {
            ApiRequest::PutApplication { payload } => payload.clone(),
            _ => Bytes::new(),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// A successful (2xx) API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Parse the body and unwrap its `result` envelope.
    pub fn result(&self) -> Result<Value, ApiError> {
        match self.json()? {
            Value::Object(mut map) => map
                .remove("result")
                .ok_or_else(|| ApiError::InvalidResponse("missing \"result\" key".to_string())),
            other => Err(ApiError::InvalidResponse(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Signed, blocking API client bound to one application.
///
/// Must not be used from inside an async context; callers on the tokio
/// runtime go through `spawn_blocking`.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    application_name: String,
    signer: RequestSigner,
}

impl ApiClient {
    /// Create a client for `credentials` talking to `endpoint`.
    pub fn new(credentials: &Credentials, endpoint: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            application_name: credentials.application_name.clone(),
            signer: RequestSigner::new(&credentials.access_key, &credentials.secret_key),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Sign and send a request.
    ///
    /// A 404 maps to [`ApiError::BadCredentials`]; any other non-2xx status
    /// maps to [`ApiError::Status`].
    pub fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method();
        let uri = request.uri(&self.application_name);
        let body = request.body();
        let headers = self.signer.sign_now(method.as_str(), &body, &uri);

        debug!(method = %method, uri = %uri, bytes = body.len(), "Calling API");

        let mut builder = self
            .http
            .request(method, format!("{}{}", self.endpoint, uri))
            .header(DATE_HEADER, &headers.date)
            .header(AUTH_HEADER, &headers.authentication);

        let query = request.query();
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if !body.is_empty() {
            builder = builder
                .header(http::header::CONTENT_TYPE.as_str(), "application/json")
                .body(body);
        }

        let response = builder
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        debug!(status = status.as_u16(), uri = %uri, "API responded");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::BadCredentials { uri });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                uri,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            body: bytes,
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint)
            .field("application_name", &self.application_name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
