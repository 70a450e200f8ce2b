//! Cache-related MCP tools.
//!
//! This module provides read-only views of the generation store.

pub mod get;
pub mod status;

pub use get::{CacheGetParams, get_impl};
pub use status::status_impl;
