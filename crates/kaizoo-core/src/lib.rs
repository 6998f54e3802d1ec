//! Core Kaizoo client library (config, storage, auth, API client, services, community feed).

pub mod auth;
pub mod client;
pub mod community;
pub mod config;
pub mod error;
pub mod flags;
pub mod logging;
pub mod services;
pub mod storage;

pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use error::{ApiError, ApiErrorKind, ApiResult};
