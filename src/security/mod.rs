//! Security for the HTTP surface.
//!
//! Optional API key authentication: when keys are configured every
//! `/api/v1` request must carry one, either as `Authorization: Bearer <key>`
//! or in the `X-API-Key` header. `/health` stays open.
//!
//! ## Example
//!
//! ```rust
//! use shell_bridge::security::ApiKeyStore;
//!
//! let auth = ApiKeyStore::default();
//! auth.add_key("my-secret-key");
//! assert!(auth.is_valid("my-secret-key"));
//! ```

pub mod auth;

pub use auth::{auth_middleware, generate_api_key, ApiKeyStore, AuthConfig, API_KEY_HEADER};
