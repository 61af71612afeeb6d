//! Proxy crawler module for fetching listing pages and APIs
//!
//! This module provides functionality for:
//! - Fetching each supported origin (HTML pages, plain-text and JSON APIs)
//! - Driving the per-origin source parsers over the fetched payloads
//! - Optional TTL caching of fetch results
//!
//! A fetch failure skips that page or source and is reported in its
//! [`CrawlResult`]; it is never fatal to the run.

use crate::proxy::cache::PageCache;
use crate::proxy::list::ProxyList;
use crate::proxy::models::ProxyType;
use crate::proxy::sources::free_proxy_cz::PageOptions;
use crate::proxy::sources::{proxy_list_download, proxyscrape, FreeProxyCz, FreeProxyListNet, SpysOne};
use crate::proxy::sources::spys_one;
use crate::Result;
use anyhow::bail;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:79.0) Gecko/20100101 Firefox/79.0";

const FREE_PROXY_LIST_URL: &str = "https://free-proxy-list.net/";
const SPYS_ONE_URL: &str = "http://spys.one/en/free-proxy-list/";

/// Result of crawling a single source
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The source that was crawled
    pub source: String,
    /// Proxies extracted from the source
    pub proxies: ProxyList,
    /// Error message if crawling failed
    pub error: Option<String>,
}

impl CrawlResult {
    pub fn success(source: String, proxies: ProxyList) -> Self {
        Self {
            source,
            proxies,
            error: None,
        }
    }

    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            proxies: ProxyList::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The origins this crawler knows how to harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    FreeProxyCz,
    FreeProxyListNet,
    SpysOne,
    ProxyScrape,
    ProxyListDownload,
}

impl SourceId {
    pub fn all() -> [SourceId; 5] {
        [
            SourceId::FreeProxyCz,
            SourceId::FreeProxyListNet,
            SourceId::SpysOne,
            SourceId::ProxyScrape,
            SourceId::ProxyListDownload,
        ]
    }

    pub fn find(name: &str) -> Option<SourceId> {
        match name.trim().to_lowercase().as_str() {
            "free-proxy-cz" | "free-proxy.cz" => Some(SourceId::FreeProxyCz),
            "free-proxy-list" | "free-proxy-list.net" => Some(SourceId::FreeProxyListNet),
            "spys-one" | "spys.one" => Some(SourceId::SpysOne),
            "proxyscrape" => Some(SourceId::ProxyScrape),
            "proxy-list-download" | "proxy-list.download" => Some(SourceId::ProxyListDownload),
            _ => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::FreeProxyCz => write!(f, "free-proxy.cz"),
            SourceId::FreeProxyListNet => write!(f, "free-proxy-list.net"),
            SourceId::SpysOne => write!(f, "spys.one"),
            SourceId::ProxyScrape => write!(f, "proxyscrape"),
            SourceId::ProxyListDownload => write!(f, "proxy-list.download"),
        }
    }
}

/// Configuration for proxy crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// TTL for cached fetch results; `None` disables caching
    pub cache_ttl: Option<Duration>,
    /// Directory for cached fetch results
    pub cache_dir: PathBuf,
    /// Page selection for free-proxy.cz
    pub cz_options: PageOptions,
    /// free-proxy.cz pages to request
    pub cz_pages: Vec<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_ttl: None,
            cache_dir: PathBuf::from(".cache"),
            cz_options: PageOptions::default(),
            cz_pages: vec![1],
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_cz_options(mut self, options: PageOptions) -> Self {
        self.cz_options = options;
        self
    }

    pub fn with_cz_pages(mut self, pages: Vec<u32>) -> Self {
        self.cz_pages = pages;
        self
    }
}

/// Proxy crawler for harvesting proxies from the supported origins
pub struct ProxyCrawler {
    config: CrawlerConfig,
    client: Client,
    cache: Option<PageCache>,
}

impl ProxyCrawler {
    /// Create a new proxy crawler with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(CrawlerConfig::default())
    }

    /// Create a new proxy crawler with custom configuration
    pub fn with_config(config: CrawlerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        let cache = config
            .cache_ttl
            .map(|ttl| PageCache::new(config.cache_dir.clone(), ttl));

        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// Fetch and parse one origin.
    pub async fn fetch_source(&self, source: SourceId) -> Result<ProxyList> {
        match source {
            SourceId::FreeProxyCz => {
                self.fetch_free_proxy_cz(&self.config.cz_options, &self.config.cz_pages)
                    .await
            }
            SourceId::FreeProxyListNet => self.fetch_free_proxy_list_net().await,
            SourceId::SpysOne => self.fetch_spys_one().await,
            SourceId::ProxyScrape => {
                self.fetch_proxyscrape(&[ProxyType::Http, ProxyType::Socks4, ProxyType::Socks5])
                    .await
            }
            SourceId::ProxyListDownload => {
                self.fetch_proxy_list_download(&ProxyType::all()).await
            }
        }
    }

    /// Fetch and parse every supported origin, returning a result per
    /// source. A failed source contributes an error, not an abort.
    pub async fn crawl_all(&self) -> Vec<CrawlResult> {
        let mut results = Vec::new();
        for source in SourceId::all() {
            let result = match self.fetch_source(source).await {
                Ok(proxies) => {
                    log::info!("{} proxies harvested from {}", proxies.len(), source);
                    CrawlResult::success(source.to_string(), proxies)
                }
                Err(e) => {
                    log::warn!("harvest from {} failed: {}", source, e);
                    CrawlResult::failure(source.to_string(), e.to_string())
                }
            };
            results.push(result);
        }
        results
    }

    /// Fetch the selected free-proxy.cz listing pages. A failed page is
    /// skipped; the remaining pages still contribute records.
    pub async fn fetch_free_proxy_cz(
        &self,
        options: &PageOptions,
        pages: &[u32],
    ) -> Result<ProxyList> {
        let mut all = ProxyList::new();
        for &page in pages {
            let url = options.page_url(page);
            match self.get_text(&url).await {
                Ok(html) => all.extend(FreeProxyCz::parse(&html)),
                Err(e) => log::warn!("skipping {}: {}", url, e),
            }
        }
        Ok(all)
    }

    pub async fn fetch_free_proxy_list_net(&self) -> Result<ProxyList> {
        let html = self.get_text(FREE_PROXY_LIST_URL).await?;
        Ok(FreeProxyListNet::parse(&html))
    }

    pub async fn fetch_spys_one(&self) -> Result<ProxyList> {
        let html = self.post_form(SPYS_ONE_URL, &spys_one::FORM_FIELDS).await?;
        Ok(SpysOne::parse(&html))
    }

    /// Fetch the proxyscrape listings for the given protocols.
    ///
    /// The protocol set is validated up front: an unsupported protocol is a
    /// configuration error and nothing is fetched.
    pub async fn fetch_proxyscrape(&self, protocols: &[ProxyType]) -> Result<ProxyList> {
        for &proxy_type in protocols {
            if !proxyscrape::supports(proxy_type) {
                bail!("proxyscrape cannot serve {} listings", proxy_type);
            }
        }

        let mut all = ProxyList::new();
        for &proxy_type in protocols {
            let url = proxyscrape::endpoint_url(proxy_type);
            match self.get_text(&url).await {
                Ok(body) => all.extend(proxyscrape::parse(&body, proxy_type)),
                Err(e) => log::warn!("skipping {}: {}", url, e),
            }
        }
        Ok(all)
    }

    pub async fn fetch_proxy_list_download(&self, protocols: &[ProxyType]) -> Result<ProxyList> {
        let mut all = ProxyList::new();
        for &proxy_type in protocols {
            let url = proxy_list_download::endpoint_url(proxy_type);
            match self.get_text(&url).await {
                Ok(payload) => all.extend(proxy_list_download::parse(&payload, proxy_type)),
                Err(e) => log::warn!("skipping {}: {}", url, e),
            }
        }
        Ok(all)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let key = PageCache::request_key("GET", url, "");
        if let Some(body) = self.cache_get(&key, url) {
            return Ok(body);
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            bail!("unexpected status {} from {}", response.status(), url);
        }
        let body = response.text().await?;
        self.cache_store(&key, &body);
        Ok(body)
    }

    async fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<String> {
        let form_repr: Vec<String> = fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        let key = PageCache::request_key("POST", url, &form_repr.join("&"));
        if let Some(body) = self.cache_get(&key, url) {
            return Ok(body);
        }

        let response = self.client.post(url).form(fields).send().await?;
        if !response.status().is_success() {
            bail!("unexpected status {} from {}", response.status(), url);
        }
        let body = response.text().await?;
        self.cache_store(&key, &body);
        Ok(body)
    }

    fn cache_get(&self, key: &str, url: &str) -> Option<String> {
        let body = self.cache.as_ref()?.get(key)?;
        log::debug!("cache hit for {}", url);
        Some(body)
    }

    fn cache_store(&self, key: &str, body: &str) {
        if let Some(cache) = &self.cache {
            cache.store(key, body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawler_config_default() {
        let config = CrawlerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.cache_ttl.is_none());
        assert_eq!(config.cz_pages, vec![1]);
    }

    #[test]
    fn test_crawler_config_builder() {
        let config = CrawlerConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("Custom Agent".to_string())
            .with_cache_ttl(Duration::from_secs(3600))
            .with_cache_dir("/tmp/harvest-cache")
            .with_cz_pages(vec![1, 2, 3]);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "Custom Agent");
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/harvest-cache"));
        assert_eq!(config.cz_pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_source_id_lookup() {
        assert_eq!(SourceId::find("spys.one"), Some(SourceId::SpysOne));
        assert_eq!(SourceId::find("SPYS-ONE"), Some(SourceId::SpysOne));
        assert_eq!(SourceId::find("proxyscrape"), Some(SourceId::ProxyScrape));
        assert_eq!(SourceId::find("nonsense"), None);
    }

    #[test]
    fn test_crawl_result() {
        let result = CrawlResult::success("test".to_string(), ProxyList::new());
        assert!(result.is_success());

        let result = CrawlResult::failure("test".to_string(), "boom".to_string());
        assert!(!result.is_success());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_proxyscrape_rejects_https_before_fetching() {
        let crawler = ProxyCrawler::new().unwrap();
        let err = crawler
            .fetch_proxyscrape(&[ProxyType::Http, ProxyType::Https])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("https"));
    }
}
