//! Proxy module for harvesting and probing proxies
//!
//! This module provides functionality for:
//! - Scanning markup into tag events and driving per-origin state machines
//! - Resolving XOR-obfuscated port ciphers
//! - Collecting records into an ordered, filterable list with persistence
//! - Fetching the supported origins with optional TTL caching
//! - Probing harvested proxies for reachability

pub mod cache;
pub mod checker;
pub mod cipher;
pub mod crawler;
pub mod list;
pub mod markup;
pub mod models;
pub mod sources;

pub use cache::PageCache;
pub use checker::{ProbeConfig, ProbeResult, ProxyProber};
pub use cipher::{CipherError, ConstantTable};
pub use crawler::{CrawlResult, CrawlerConfig, ProxyCrawler, SourceId};
pub use list::ProxyList;
pub use markup::{Attributes, TagEvent, TagStream};
pub use models::{Proxy, ProxyType};
