//! SQLite-backed store of cache generations.
//!
//! A generation is a named container of stored responses. This module
//! provides persistent storage using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Create-if-absent generations, enumeration and wholesale deletion
//! - Entries keyed by normalized request identity, exact or ignore-search lookup
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredEntry;
pub use generations::GenerationInfo;
pub use key::{MatchMode, RequestKey};
