//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Generation store with SQLite backend
//! - Request identity normalization
//! - Request/response value types shared by the controller and its host
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CacheDb, GenerationInfo, MatchMode, RequestKey};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{CachedResponse, InterceptRequest, RequestMode, ResponseKind};
