//! proxy-list.download JSON parser
//!
//! The endpoint answers with a one-element array whose `LISTA` field holds
//! the items. Any structural deviation yields zero records, not an error.

use crate::proxy::list::ProxyList;
use crate::proxy::models::{Proxy, ProxyType};
use serde::Deserialize;

pub const API_URL: &str = "https://www.proxy-list.download/api/v0/get?l=en&t={type}";

pub fn endpoint_url(proxy_type: ProxyType) -> String {
    API_URL.replace("{type}", &proxy_type.to_string())
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "LISTA", default)]
    lista: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "IP", default)]
    ip: Option<String>,
    #[serde(rename = "PORT", default)]
    port: Option<String>,
}

/// Parse one response payload. Items missing the address or port are
/// skipped; a payload that is not the expected nesting parses to nothing.
pub fn parse(payload: &str, proxy_type: ProxyType) -> ProxyList {
    let mut proxies = ProxyList::new();

    let Ok(envelopes) = serde_json::from_str::<Vec<Envelope>>(payload) else {
        return proxies;
    };
    let Some(first) = envelopes.into_iter().next() else {
        return proxies;
    };

    for entry in first.lista {
        let (Some(addr), Some(port)) = (entry.ip, entry.port) else {
            continue;
        };
        let Ok(port) = port.trim().parse::<u16>() else {
            continue;
        };
        if addr.is_empty() || port == 0 {
            continue;
        }
        proxies.push(Proxy::new(proxy_type, addr, port));
    }

    proxies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_lista_items() {
        let payload = r#"[{"LISTA":[{"IP":"1.2.3.4","PORT":"8080"}]}]"#;
        let proxies = parse(payload, ProxyType::Http);
        assert_eq!(proxies.len(), 1);
        let proxy = proxies.iter().next().unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Http);
        assert_eq!(proxy.addr, "1.2.3.4");
        assert_eq!(proxy.port, 8080);
    }

    #[test]
    fn test_items_missing_fields_are_skipped() {
        let payload = r#"[{"LISTA":[
            {"IP":"1.2.3.4","PORT":"8080"},
            {"IP":"5.6.7.8"},
            {"PORT":"80"},
            {"IP":"9.9.9.9","PORT":"zero"}
        ]}]"#;
        let proxies = parse(payload, ProxyType::Socks5);
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies.iter().next().unwrap().addr, "1.2.3.4");
    }

    #[test]
    fn test_structural_deviation_yields_nothing() {
        assert!(parse("{}", ProxyType::Http).is_empty());
        assert!(parse("[]", ProxyType::Http).is_empty());
        assert!(parse(r#"[{"WRONG":[]}]"#, ProxyType::Http).is_empty());
        assert!(parse("not json", ProxyType::Http).is_empty());
    }

    #[test]
    fn test_endpoint_url() {
        assert!(endpoint_url(ProxyType::Https).contains("t=https"));
    }
}
