//! Secondary request channel.
//!
//! Plain JSON over HTTP for calls that do not belong on the duplex link:
//! - Session recovery through a [`CredentialCoordinator`] on 401
//! - Anti-forgery tokens from a [`CsrfTokenSource`] on mutating requests
//!
//! # Example
//!
//! ```ignore
//! use tradelink_transport::rest::{RestClient, RestConfig};
//!
//! let config = RestConfig::builder()
//!     .base_url("https://app.example.com")
//!     .build();
//!
//! let client = RestClient::new(config)?.with_credentials(session);
//! let me: Value = client.get("/api/auth/me").send_json().await?;
//! ```

mod auth;
mod client;
mod config;

pub use auth::{
    CachedCsrfToken, CredentialCoordinator, Credentials, CsrfTokenSource, StaticCredentials,
    TokenFetcher, UserIdentity,
};
pub use client::{RequestBuilder, RestClient};
pub use config::{RestConfig, RestConfigBuilder};
