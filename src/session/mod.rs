//! Watch session lifecycle.
//!
//! # Design Decisions
//! - Exactly one owner mutates the active session handle
//! - Close is fire-and-forget; the old stream is dropped before the new one is stored

pub mod manager;

pub use manager::WatchSessionManager;
