//! free-proxy-list.net blob parser
//!
//! The whole list lives in one readonly textarea as a text blob: a header
//! line, an update timestamp, then one addr:port pair per line. The protocol
//! is implicitly HTTP.

use crate::proxy::list::ProxyList;
use crate::proxy::markup::Attributes;
use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::sources::{feed, MarkupHandler};
use once_cell::sync::Lazy;
use regex::Regex;

const LIST_HEADER: &str = "Free proxies from free-proxy-list.net";

static ADDR_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})$").expect("Invalid ADDR:PORT regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// The qualifying textarea not seen yet.
    Searching,
    /// Next text blob containing the header is the list.
    Armed,
    /// List consumed; the rest of the document is ignored.
    Done,
}

/// State machine for one free-proxy-list.net page.
pub struct FreeProxyListNet {
    state: State,
    proxies: ProxyList,
}

impl FreeProxyListNet {
    pub fn new() -> Self {
        Self {
            state: State::Searching,
            proxies: ProxyList::new(),
        }
    }

    /// Parse one document into its proxy records.
    pub fn parse(document: &str) -> ProxyList {
        let mut parser = Self::new();
        feed(&mut parser, document);
        parser.into_proxies()
    }

    pub fn into_proxies(self) -> ProxyList {
        self.proxies
    }

    fn accept_token(&mut self, token: &str) {
        let Some(caps) = ADDR_PORT_REGEX.captures(token) else {
            return;
        };
        let addr = &caps[1];
        if addr.split('.').any(|octet| octet.parse::<u32>().map_or(true, |n| n > 255)) {
            return;
        }
        let Ok(port) = caps[2].parse::<u16>() else {
            return;
        };
        if port == 0 {
            return;
        }
        self.proxies
            .push(Proxy::new(ProxyType::Http, addr.to_string(), port));
    }
}

impl Default for FreeProxyListNet {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupHandler for FreeProxyListNet {
    fn on_start_tag(&mut self, name: &str, attrs: &Attributes) {
        if self.state == State::Searching
            && name == "textarea"
            && attrs.contains("class", "form-control")
            && attrs.contains("readonly", "readonly")
            && attrs.contains("rows", "12")
            && attrs.contains("onclick", "select(this)")
        {
            self.state = State::Armed;
        }
    }

    fn on_text(&mut self, text: &str) {
        if self.state != State::Armed || !text.contains(LIST_HEADER) {
            return;
        }
        self.state = State::Done;

        // Strip the header; the timestamp words that follow fail the
        // addr:port shape and fall out naturally.
        let blob = text.replace(LIST_HEADER, "");
        for token in blob.split_whitespace() {
            self.accept_token(token);
        }
    }
}
