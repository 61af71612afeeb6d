//! free-proxy.cz table parser
//!
//! The listing table hides the address inside a base64-encoded
//! `document.write` call, the port inside a styled span and the protocol
//! label inside a `<small>` element. Which interpretation applies to a text
//! event is decided solely by the start tag seen immediately before it.

use crate::proxy::list::ProxyList;
use crate::proxy::markup::Attributes;
use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::sources::{feed, MarkupHandler};
use base64::{engine::general_purpose, Engine as _};
use std::fmt;

const ADDR_MARKER: &str = "document.write(Base64.decode(\"";

/// Listing sort orders accepted by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ping,
    Speed,
    Uptime,
    Date,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ping => write!(f, "ping"),
            SortOrder::Speed => write!(f, "speed"),
            SortOrder::Uptime => write!(f, "uptime"),
            SortOrder::Date => write!(f, "date"),
        }
    }
}

/// Protocol filter segment of the listing URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolFilter {
    Http,
    Https,
    Socks,
    Socks4,
    Socks5,
    #[default]
    All,
}

impl fmt::Display for ProtocolFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolFilter::Http => write!(f, "http"),
            ProtocolFilter::Https => write!(f, "https"),
            ProtocolFilter::Socks => write!(f, "socks"),
            ProtocolFilter::Socks4 => write!(f, "socks4"),
            ProtocolFilter::Socks5 => write!(f, "socks5"),
            ProtocolFilter::All => write!(f, "all"),
        }
    }
}

/// Anonymity level segment of the listing URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymityLevel {
    Level1,
    Level2,
    Level3,
    #[default]
    All,
}

impl fmt::Display for AnonymityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnonymityLevel::Level1 => write!(f, "level1"),
            AnonymityLevel::Level2 => write!(f, "level2"),
            AnonymityLevel::Level3 => write!(f, "level3"),
            AnonymityLevel::All => write!(f, "all"),
        }
    }
}

/// Listing page selection: country, protocol, sort and anonymity level are
/// path segments of the page URL.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub sort: SortOrder,
    pub protocol: ProtocolFilter,
    pub level: AnonymityLevel,
    pub country: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            sort: SortOrder::default(),
            protocol: ProtocolFilter::default(),
            level: AnonymityLevel::default(),
            country: "all".to_string(),
        }
    }
}

impl PageOptions {
    pub fn page_url(&self, page: u32) -> String {
        format!(
            "http://free-proxy.cz/en/proxylist/country/{}/{}/{}/{}/{}",
            self.country, self.protocol, self.sort, self.level, page
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Target table not seen yet.
    Searching,
    /// Inside the proxy listing table.
    InTable,
}

/// Which field the next text event supplies. Set and cleared only by start
/// tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextGate {
    None,
    Port,
    TypeLabel,
}

/// State machine for one free-proxy.cz listing page.
pub struct FreeProxyCz {
    state: State,
    gate: TextGate,
    addr: Option<String>,
    port: Option<u16>,
    proxies: ProxyList,
}

impl FreeProxyCz {
    pub fn new() -> Self {
        Self {
            state: State::Searching,
            gate: TextGate::None,
            addr: None,
            port: None,
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

    fn decode_addr(text: &str) -> Option<String> {
        let idx = text.find(ADDR_MARKER)?;
        let encoded = &text[idx + ADDR_MARKER.len()..];
        let end = encoded.find('"')?;
        let decoded = general_purpose::STANDARD.decode(encoded[..end].trim()).ok()?;
        let addr = String::from_utf8(decoded).ok()?;
        let addr = addr.trim().to_string();
        (!addr.is_empty()).then_some(addr)
    }
}

impl Default for FreeProxyCz {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupHandler for FreeProxyCz {
    fn on_start_tag(&mut self, name: &str, attrs: &Attributes) {
        if self.state == State::Searching {
            if name == "table" && attrs.contains("id", "proxy_list") {
                self.state = State::InTable;
            }
            return;
        }

        // The most recent tag owns the gate: any tag that is neither the
        // port span nor the label element clears it.
        self.gate = if name == "span" && attrs.contains("class", "fport") {
            TextGate::Port
        } else if name == "small" {
            TextGate::TypeLabel
        } else {
            TextGate::None
        };
    }

    fn on_text(&mut self, text: &str) {
        if self.state != State::InTable {
            return;
        }

        if text.contains(ADDR_MARKER) {
            // A new row begins at its address; a stale port from a previous
            // row must never complete this one.
            self.addr = Self::decode_addr(text);
            self.port = None;
            return;
        }

        match self.gate {
            TextGate::Port => {
                if let Ok(port) = text.trim().parse::<u16>() {
                    if port > 0 {
                        self.port = Some(port);
                    }
                }
            }
            TextGate::TypeLabel => {
                let label = text.trim();
                if label.is_empty() {
                    return;
                }
                if let (Some(addr), Some(port), Some(proxy_type)) =
                    (self.addr.take(), self.port.take(), ProxyType::find(label))
                {
                    self.proxies.push(Proxy::new(proxy_type, addr, port));
                }
            }
            TextGate::None => {}
        }
    }
}
