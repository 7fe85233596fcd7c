//! Content-query client exposed to templates.
//!
//! Templates call `cms_content_types()` and `cms_entries(...)`; both end up
//! here. A project without API credentials gets a client that answers
//! `None` to everything, and API failures are logged and also become `None`,
//! so a template never fails to render because the CMS is unreachable.

use std::sync::OnceLock;

use serde_json::Value;
use tracing::{debug, warn};

use crate::project::Credentials;

use super::client::{ApiClient, ApiRequest, EntryQuery};

/// Lazily connected CMS client for one request.
#[derive(Debug, Default)]
pub struct CmsClient {
    target: Option<(Credentials, String)>,
    client: OnceLock<Option<ApiClient>>,
}

impl CmsClient {
    /// A client for `credentials`, or a disconnected client if `None`.
    ///
    /// No HTTP client is built until the first query.
    pub fn new(credentials: Option<Credentials>, endpoint: impl Into<String>) -> Self {
        Self {
            target: credentials.map(|c| (c, endpoint.into())),
            client: OnceLock::new(),
        }
    }

    /// A client that never queries anything.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    /// List the account's content types.
    pub fn content_types(&self) -> Option<Value> {
        self.query(&ApiRequest::ContentTypes)
    }

    /// Fetch a page of entries.
    pub fn entries(&self, query: EntryQuery) -> Option<Value> {
        self.query(&ApiRequest::Entries(query))
    }

    fn query(&self, request: &ApiRequest) -> Option<Value> {
        let client = self.client()?;
        match client.call(request).and_then(|response| response.result()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "CMS query failed");
                None
            }
        }
    }

    fn client(&self) -> Option<&ApiClient> {
        self.client
            .get_or_init(|| {
                let (credentials, endpoint) = self.target.as_ref()?;
                debug!(endpoint = %endpoint, "Connecting CMS client");
                ApiClient::new(credentials, endpoint.as_str())
                    .map_err(|e| warn!(error = %e, "Cannot create CMS client"))
                    .ok()
            })
            .as_ref()
    }
}
