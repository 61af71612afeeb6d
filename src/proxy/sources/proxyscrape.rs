//! api.proxyscrape.com plain-text parser
//!
//! The endpoint returns whitespace-separated `addr:port` tokens; the
//! protocol is fixed by the `proxytype` query parameter.

use crate::proxy::list::ProxyList;
use crate::proxy::models::{Proxy, ProxyType};

pub const API_URL: &str =
    "https://api.proxyscrape.com/?request=getproxies&proxytype={type}&timeout=10000&country=all&ssl=all&anonymity=all";

/// Whether the endpoint can serve the given protocol. There is no HTTPS
/// listing; requesting one is a caller configuration error.
pub fn supports(proxy_type: ProxyType) -> bool {
    !matches!(proxy_type, ProxyType::Https)
}

pub fn endpoint_url(proxy_type: ProxyType) -> String {
    API_URL.replace("{type}", &proxy_type.to_string())
}

/// Parse one response body. Malformed tokens are skipped, never fatal.
pub fn parse(body: &str, proxy_type: ProxyType) -> ProxyList {
    let mut proxies = ProxyList::new();
    for token in body.split_whitespace() {
        let Some((addr, port)) = token.split_once(':') else {
            continue;
        };
        let Ok(port) = port.parse::<u16>() else {
            continue;
        };
        if addr.is_empty() || port == 0 {
            continue;
        }
        proxies.push(Proxy::new(proxy_type, addr.to_string(), port));
    }
    proxies
}
