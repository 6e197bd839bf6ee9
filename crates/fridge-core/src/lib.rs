//! Core library for Fridge Tracker.
//!
//! Provides the authenticated API client with automatic credential
//! renewal, the persisted session store it depends on, and typed access
//! to the item, fridge and stock endpoints of the backend.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, AuthApi, RequestContext, RequestSpec};
pub use auth::{RefreshCoordinator, RefreshError, SessionStore, TokenPair};
pub use config::Config;
