//! Per-origin source parsers
//!
//! Each listing site encodes proxy records with a different, undocumented
//! layout, so every origin gets its own small state machine. HTML origins
//! implement [`MarkupHandler`] and are driven in document order by [`feed`];
//! plain-text and JSON origins consume the payload directly.
//!
//! All variants share the same obligations: emit a record only once
//! protocol, address and port are known, reset per-record state after
//! emission, drop a record whose fields cannot be resolved, and yield zero
//! records (not an error) when the expected markup landmark never appears.

pub mod free_proxy_cz;
pub mod free_proxy_list_net;
pub mod proxy_list_download;
pub mod proxyscrape;
pub mod spys_one;

pub use free_proxy_cz::FreeProxyCz;
pub use free_proxy_list_net::FreeProxyListNet;
pub use spys_one::SpysOne;

use crate::proxy::markup::{Attributes, TagEvent, TagStream};

/// Event sink for one document scan. The tokenizer holds no knowledge of
/// which variant it drives.
pub trait MarkupHandler {
    fn on_start_tag(&mut self, name: &str, attrs: &Attributes);
    fn on_text(&mut self, text: &str);
}

/// Pump one document through a handler, event by event.
pub fn feed<H: MarkupHandler>(handler: &mut H, document: &str) {
    for event in TagStream::new(document) {
        match event {
            TagEvent::Start { name, attrs } => handler.on_start_tag(&name, &attrs),
            TagEvent::Text(text) => handler.on_text(&text),
        }
    }
}
