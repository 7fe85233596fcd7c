//! Client side of the hosting API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          api                                 │
//! │                                                              │
//! │  ┌──────────┐   ┌────────────────┐   ┌────────────────────┐  │
//! │  │  upload  │   │      cms       │   │      signer        │  │
//! │  │ (package │   │ (template-side │   │ (canonical string, │  │
//! │  │  + PUT)  │   │   queries)     │   │   HMAC-SHA1)       │  │
//! │  └────┬─────┘   └───────┬────────┘   └─────────▲──────────┘  │
//! │       └────────┬────────┘                      │             │
//! │                ▼                               │             │
//! │        ┌───────────────┐   signs every call    │             │
//! │        │   ApiClient   │───────────────────────┘             │
//! │        │ (ApiRequest)  │                                     │
//! │        └───────────────┘                                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod cms;
pub mod signer;
pub mod upload;

pub use client::{ApiClient, ApiRequest, ApiResponse, EntryQuery, DEFAULT_API_ENDPOINT};
pub use cms::CmsClient;
pub use signer::{
    canonical_string, content_digest, date_header, RequestSigner, SignatureError, SignedHeaders,
    AUTH_HEADER, DATE_HEADER,
};
pub use upload::{
    interpret_response, is_excluded, package_project, site_url, upload, UploadOutcome,
    UploadPayload,
};
