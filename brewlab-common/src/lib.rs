//! # Brewlab Common Library
//!
//! Shared code for the brewlab crates including:
//! - Error type and result alias
//! - Bootstrap configuration loading and data folder resolution
//! - Key-value storage used for persisted learning state
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod kv;
pub mod time;

pub use error::{Error, Result};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
