//! spys.one obfuscated-port parser
//!
//! The page defines a symbol table in an early inline script (chained XOR
//! assignments), then renders each row's port as a `document.write` of
//! XOR groups over those symbols. The address sits in a styled font element,
//! the protocol label in another, and HTTPS rows are recognizable only by an
//! anchor to the https listing earlier in the row.

use crate::proxy::cipher::ConstantTable;
use crate::proxy::list::ProxyList;
use crate::proxy::markup::Attributes;
use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::sources::{feed, MarkupHandler};

/// Wrapper the site prints around the port expression.
const PORT_MARKER: &str = "document.write(\"<font class=spy2>:<\\/font>\"+";

/// Href that marks a row as HTTPS. Observed behavior of the upstream page;
/// if the path ever changes, detection falls back to the row's printed
/// label.
const HTTPS_HREF: &str = "/en/https-ssl-proxy/";

/// Form fields posted to request the listing page.
pub const FORM_FIELDS: [(&str, &str); 5] = [
    ("xpp", "5"),
    ("xf1", "0"),
    ("xf2", "0"),
    ("xf4", "0"),
    ("xf5", "0"),
];

/// Where in a listing row the scan currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    /// Between rows.
    Outside,
    /// Inside a qualifying row, no text gate armed.
    Row,
    /// Next text is the address (until the port script arrives).
    Address,
    /// Next text is the obfuscated port expression.
    PortExpr,
    /// Next text is the protocol label; finalizes the record.
    TypeLabel,
}

/// State machine for one spys.one listing page.
pub struct SpysOne {
    constants: Option<ConstantTable>,
    constants_done: bool,
    awaiting_constants: bool,
    row: RowState,
    https: bool,
    addr: Option<String>,
    port: Option<u16>,
    proxies: ProxyList,
}

impl SpysOne {
    pub fn new() -> Self {
        Self {
            constants: None,
            constants_done: false,
            awaiting_constants: false,
            row: RowState::Outside,
            https: false,
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

    fn drop_pending_record(&mut self) {
        self.addr = None;
        self.port = None;
    }
}

impl Default for SpysOne {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupHandler for SpysOne {
    fn on_start_tag(&mut self, name: &str, attrs: &Attributes) {
        if name == "script" && attrs.contains("type", "text/javascript") {
            if self.row == RowState::Address {
                self.row = RowState::PortExpr;
            } else if !self.constants_done && !self.awaiting_constants {
                self.awaiting_constants = true;
            }
            return;
        }

        if name == "tr"
            && (attrs.contains("class", "spy1xx") || attrs.contains("class", "spy1x"))
        {
            self.row = RowState::Row;
            self.https = false;
            self.drop_pending_record();
            return;
        }

        match self.row {
            RowState::Row | RowState::Address | RowState::PortExpr => {
                if name == "a" && attrs.contains("href", HTTPS_HREF) {
                    self.https = true;
                } else if name == "font" && attrs.contains("class", "spy14") {
                    self.row = RowState::Address;
                } else if name == "font" && attrs.contains("class", "spy1") {
                    self.row = RowState::TypeLabel;
                }
            }
            RowState::Outside | RowState::TypeLabel => {}
        }
    }

    fn on_text(&mut self, text: &str) {
        if self.awaiting_constants {
            self.awaiting_constants = false;
            self.constants_done = true;
            self.constants = ConstantTable::parse(text).ok();
            return;
        }

        match self.row {
            RowState::Address => {
                let addr = text.trim();
                if !addr.is_empty() {
                    self.addr = Some(addr.to_string());
                }
            }
            RowState::PortExpr => {
                let expr = text.trim();
                let expr = expr.strip_prefix(PORT_MARKER).unwrap_or(expr);
                let decoded = self
                    .constants
                    .as_ref()
                    .and_then(|table| table.decode_port(expr).ok());
                match decoded {
                    Some(port) => self.port = Some(port),
                    None => self.drop_pending_record(),
                }
                self.row = RowState::Row;
            }
            RowState::TypeLabel => {
                let label = text.trim();
                if label.is_empty() {
                    return;
                }
                let proxy_type = if self.https {
                    Some(ProxyType::Https)
                } else {
                    ProxyType::find(label)
                };
                if let (Some(addr), Some(port), Some(proxy_type)) =
                    (self.addr.take(), self.port.take(), proxy_type)
                {
                    self.proxies.push(Proxy::new(proxy_type, addr, port));
                }
                self.row = RowState::Outside;
                self.https = false;
            }
            RowState::Outside | RowState::Row => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: &str) -> String {
        format!(
            r#"<html><body>
<script type="text/javascript">a1b2=8;c3d4=0;e5f6=1080^c3d4;q7r8=3^a1b2</script>
<table>
{}
</table>
</body></html>"#,
            rows
        )
    }

    // Port expression (a1b2)+(c3d4)+(a1b2) decodes to digit groups 8,0,8 -> 808.
    const ROW_HTTP: &str = r#"
<tr class="spy1xx">
  <td><font class="spy14">1.2.3.4<script type="text/javascript">document.write("<font class=spy2>:<\/font>"+(a1b2)+(c3d4)+(a1b2))</script></font></td>
  <td><font class="spy1">HTTP</font></td>
</tr>"#;

    const ROW_SOCKS: &str = r#"
<tr class="spy1x">
  <td><font class="spy14">5.6.7.8<script type="text/javascript">document.write("<font class=spy2>:<\/font>"+(e5f6))</script></font></td>
  <td><font class="spy1">SOCKS5</font></td>
</tr>"#;

    #[test]
    fn test_decodes_obfuscated_ports() {
        let proxies = SpysOne::parse(&page(&format!("{}{}", ROW_HTTP, ROW_SOCKS)));
        assert_eq!(proxies.len(), 2);

        let first = proxies.iter().next().unwrap();
        assert_eq!(first.addr, "1.2.3.4");
        assert_eq!(first.port, 808);
        assert_eq!(first.proxy_type, ProxyType::Http);

        let second = proxies.iter().nth(1).unwrap();
        assert_eq!(second.addr, "5.6.7.8");
        assert_eq!(second.port, 1080);
        assert_eq!(second.proxy_type, ProxyType::Socks5);
    }

    #[test]
    fn test_https_anchor_overrides_label() {
        let row = r#"
<tr class="spy1xx">
  <td><a href="/en/https-ssl-proxy/">SSL</a><font class="spy14">9.9.9.9<script type="text/javascript">document.write("<font class=spy2>:<\/font>"+(a1b2)+(c3d4)+(a1b2))</script></font></td>
  <td><font class="spy1">HTTP</font></td>
</tr>"#;
        let proxies = SpysOne::parse(&page(row));
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies.iter().next().unwrap().proxy_type, ProxyType::Https);
    }

    #[test]
    fn test_unresolvable_port_drops_row_only() {
        let row_bad = r#"
<tr class="spy1xx">
  <td><font class="spy14">9.9.9.9<script type="text/javascript">document.write("<font class=spy2>:<\/font>"+(unknown))</script></font></td>
  <td><font class="spy1">HTTP</font></td>
</tr>"#;
        let proxies = SpysOne::parse(&page(&format!("{}{}", row_bad, ROW_HTTP)));
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies.iter().next().unwrap().addr, "1.2.3.4");
    }

    #[test]
    fn test_missing_constants_script_yields_empty() {
        let doc = format!("<html><body><table>{}</table></body></html>", ROW_HTTP);
        assert!(SpysOne::parse(&doc).is_empty());
    }

    #[test]
    fn test_idempotent_across_parses() {
        let doc = page(ROW_HTTP);
        let a = SpysOne::parse(&doc);
        let b = SpysOne::parse(&doc);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.same_endpoint(y));
        }
    }

    #[test]
    fn test_form_fields_shape() {
        assert_eq!(FORM_FIELDS.len(), 5);
        assert_eq!(FORM_FIELDS[0], ("xpp", "5"));
    }
}
