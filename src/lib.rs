//! Proxy Harvest - streaming proxy list scraper
//!
//! Extracts proxy records from heterogeneous public sources: HTML tables,
//! free-text blobs, JSON APIs and pages that obfuscate ports behind
//! per-page XOR ciphers. Parsing is a single forward pass of tag events
//! through per-origin state machines; no DOM is ever built.

pub mod proxy;

pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
