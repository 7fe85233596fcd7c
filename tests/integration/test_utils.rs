//! Test utilities for integration tests.
//!
//! Provides a throwaway project directory, helpers for driving the router
//! with `oneshot`, and a mock hosting API that checks request signatures.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use hive_sdk::api::{RequestSigner, AUTH_HEADER, DATE_HEADER};
use hive_sdk::error::AssetError;
use hive_sdk::{
    create_router, AssetCache, AssetCompiler, Dispatcher, ProjectLayout, RouterConfig,
    SourceDialect,
};

pub const APP_NAME: &str = "demo";
pub const ACCESS_KEY: &str = "AK123";
pub const SECRET_KEY: &str = "s3cret";

// =============================================================================
// Project Fixture
// =============================================================================

/// A project directory that is deleted when dropped.
pub struct TestProject {
    dir: TempDir,
    cache: AssetCache,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            cache: AssetCache::new(),
        }
    }

    /// Write `text` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    /// Write an `app.yaml` with credentials followed by `routes`.
    pub fn write_app(&self, routes: &str) {
        self.write(
            "app.yaml",
            &format!(
                "application_name: {}\napi_access_key: {}\napi_secret_key: {}\n{}",
                APP_NAME, ACCESS_KEY, SECRET_KEY, routes
            ),
        );
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(self.dir.path())
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Router for this project with an unreachable API endpoint.
    pub fn router(&self) -> Router {
        self.router_with_api("http://127.0.0.1:9")
    }

    pub fn router_with_api(&self, endpoint: &str) -> Router {
        let dispatcher = Dispatcher::new(self.layout(), self.cache.clone(), endpoint);
        create_router(dispatcher, RouterConfig::default().with_tracing(false))
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

/// Send a GET for `uri` through `router`.
pub async fn get(router: Router, uri: &str) -> TestResponse {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

// =============================================================================
// Stand-in Compiler
// =============================================================================

/// Upper-cases the source; fails on sources containing `BROKEN`.
#[derive(Clone, Default)]
pub struct UppercaseCompiler;

impl AssetCompiler for UppercaseCompiler {
    fn compile(&self, source: &Path, _dialect: SourceDialect) -> Result<Bytes, AssetError> {
        let text = fs::read_to_string(source).map_err(|e| AssetError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        if text.contains("BROKEN") {
            return Err(AssetError::CompilerFailed {
                program: "uppercase".to_string(),
                path: source.to_path_buf(),
                status: Some(1),
                stderr: "syntax error".to_string(),
            });
        }
        Ok(Bytes::from(text.to_uppercase()))
    }
}

// =============================================================================
// Mock API
// =============================================================================

/// A request as seen by the mock API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: Bytes,
    pub signature_valid: bool,
}

struct MockState {
    signer: RequestSigner,
    responses: Mutex<HashMap<String, (StatusCode, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Hosting API stand-in listening on an ephemeral port.
///
/// Unsigned or badly signed requests get a 401; unknown paths get a 404.
#[derive(Clone)]
pub struct MockApi {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            signer: RequestSigner::new(ACCESS_KEY, SECRET_KEY),
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(mock_handler)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer requests for `path` with `status` and `body`.
    pub fn respond(&self, path: &str, status: StatusCode, body: &str) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn mock_handler(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    let signature_valid = state
        .signer
        .verify(
            &header(AUTH_HEADER),
            method.as_str(),
            &body,
            &header(DATE_HEADER),
            uri.path(),
        )
        .is_ok();

    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body,
        signature_valid,
    });

    if !signature_valid {
        return (StatusCode::UNAUTHORIZED, "bad signature".to_string());
    }

    state
        .responses
        .lock()
        .unwrap()
        .get(uri.path())
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, "{}".to_string()))
}
