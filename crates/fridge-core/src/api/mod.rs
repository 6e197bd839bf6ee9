//! REST API client module for the Fridge Tracker backend.
//!
//! `ApiClient` attaches the session's bearer token to every request and
//! transparently recovers from an expired access token: a 401 or 403
//! triggers one shared credential refresh, after which the request is
//! replayed once with the new token.
//!
//! `AuthApi` performs the unauthenticated login, register and refresh
//! exchanges and validates their token payloads.

pub mod auth;
pub mod client;
pub mod error;
pub mod fridges;
pub mod items;
pub mod request;

pub use auth::AuthApi;
pub use client::ApiClient;
pub use error::ApiError;
pub use request::{RequestContext, RequestSpec};
