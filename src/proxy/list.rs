//! Ordered proxy collection with filtering and persistence
//!
//! The list is the sole accumulator of a parse session: sources append in
//! discovery order and nothing else mutates it. Dumping and reloading either
//! serialized form reproduces equivalent records.

use crate::proxy::models::{Proxy, ProxyType};
use crate::Result;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use std::slice;

/// Field order of the delimited tabular form.
const RECORD_FIELDS: usize = 7;

/// An ordered sequence of proxies, insertion order = discovery order.
#[derive(Debug, Clone, Default)]
pub struct ProxyList {
    items: Vec<Proxy>,
}

impl ProxyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Duplicate endpoints are allowed to coexist;
    /// deduplication is a downstream concern.
    pub fn push(&mut self, proxy: Proxy) {
        self.items.push(proxy);
    }

    pub fn extend(&mut self, other: ProxyList) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Proxy> {
        self.items.iter()
    }

    /// A new list with the records in reverse discovery order.
    pub fn reversed(&self) -> ProxyList {
        ProxyList {
            items: self.items.iter().rev().cloned().collect(),
        }
    }

    /// Records matching the given protocol, relative order preserved.
    pub fn filter_type(&self, proxy_type: ProxyType) -> ProxyList {
        self.filter_by(|p| p.proxy_type == proxy_type)
    }

    /// Records matching an arbitrary predicate (e.g. reachability supplied
    /// by the prober), relative order preserved. Never mutates `self`.
    pub fn filter_by<F>(&self, predicate: F) -> ProxyList
    where
        F: Fn(&Proxy) -> bool,
    {
        ProxyList {
            items: self.items.iter().filter(|p| predicate(p)).cloned().collect(),
        }
    }

    /// Render the semicolon-delimited tabular form, one record per line:
    /// `type;addr;port;login;password;time_add;time_check`.
    /// Absent login/password/time_check become empty fields.
    pub fn to_delimited(&self) -> String {
        let mut out = String::new();
        for proxy in &self.items {
            out.push_str(&format!(
                "{};{};{};{};{};{};{}\n",
                proxy.proxy_type,
                proxy.addr,
                proxy.port,
                proxy.login.as_deref().unwrap_or(""),
                proxy.password.as_deref().unwrap_or(""),
                proxy.time_add.to_rfc3339(),
                proxy
                    .time_check
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            ));
        }
        out
    }

    /// Load the delimited tabular form. Lines with the wrong field count, an
    /// unknown protocol, an empty address or an invalid port are skipped.
    pub fn from_delimited(content: &str) -> ProxyList {
        let mut list = ProxyList::new();
        for line in content.lines() {
            if let Some(proxy) = parse_record_line(line) {
                list.push(proxy);
            }
        }
        list
    }

    /// Render the JSON array form with the same field maps as the delimited
    /// form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.items)?)
    }

    /// Load the JSON array form. Items that do not deserialize into a record
    /// are skipped.
    pub fn from_json(content: &str) -> ProxyList {
        let mut list = ProxyList::new();
        let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(content) else {
            return list;
        };
        for value in values {
            if let Ok(proxy) = serde_json::from_value::<Proxy>(value) {
                if proxy.port > 0 && !proxy.addr.is_empty() {
                    list.push(proxy);
                }
            }
        }
        list
    }

    pub fn save_delimited<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_delimited())?;
        Ok(())
    }

    pub fn load_delimited<P: AsRef<Path>>(path: P) -> Result<ProxyList> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_delimited(&content))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<ProxyList> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_json(&content))
    }
}

impl IntoIterator for ProxyList {
    type Item = Proxy;
    type IntoIter = std::vec::IntoIter<Proxy>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProxyList {
    type Item = &'a Proxy;
    type IntoIter = slice::Iter<'a, Proxy>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Proxy> for ProxyList {
    fn from_iter<I: IntoIterator<Item = Proxy>>(iter: I) -> Self {
        ProxyList {
            items: iter.into_iter().collect(),
        }
    }
}

fn parse_record_line(line: &str) -> Option<Proxy> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let fields: Vec<&str> = line.split(';').collect();
    if fields.len() != RECORD_FIELDS {
        return None;
    }

    let proxy_type = ProxyType::find(fields[0])?;
    let addr = fields[1].trim();
    if addr.is_empty() {
        return None;
    }
    let port: u16 = fields[2].trim().parse().ok()?;
    if port == 0 {
        return None;
    }

    let login = (!fields[3].is_empty()).then(|| fields[3].to_string());
    let password = (!fields[4].is_empty()).then(|| fields[4].to_string());
    let time_add = parse_timestamp(fields[5]).unwrap_or_else(Utc::now);
    let time_check = parse_timestamp(fields[6]);

    Some(Proxy {
        proxy_type,
        addr: addr.to_string(),
        port,
        login,
        password,
        time_add,
        time_check,
    })
}

fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(field.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
