//! Reachability prober for harvested proxies
//!
//! A probe is a plain TCP connect to the proxy endpoint bounded by a
//! timeout. Probes run concurrently under a semaphore so one slow target
//! never holds up the batch; a probe that misses its deadline is cancelled
//! and the proxy marked unreachable.

use crate::proxy::list::ProxyList;
use crate::proxy::models::Proxy;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;

/// Default timeout for one probe in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 1;

/// Default number of concurrent probes
const DEFAULT_CONCURRENCY: usize = 50;

/// Configuration for the prober
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for each probe
    pub timeout: Duration,
    /// Number of concurrent probes
    pub concurrency: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Result of probing a single proxy
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// The probed proxy, with `time_check` stamped
    pub proxy: Proxy,
    pub reachable: bool,
    pub latency_ms: Option<u64>,
}

/// Concurrent TCP-connect prober
#[derive(Debug, Clone)]
pub struct ProxyProber {
    config: ProbeConfig,
}

impl ProxyProber {
    pub fn new() -> Self {
        Self {
            config: ProbeConfig::default(),
        }
    }

    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Probe a single proxy.
    pub async fn probe(&self, proxy: &Proxy) -> ProbeResult {
        let start = Instant::now();
        let mut probed = proxy.clone();
        probed.time_check = Some(Utc::now());

        let attempt = TcpStream::connect((proxy.addr.as_str(), proxy.port));
        match tokio::time::timeout(self.config.timeout, attempt).await {
            Ok(Ok(_stream)) => ProbeResult {
                proxy: probed,
                reachable: true,
                latency_ms: Some(start.elapsed().as_millis() as u64),
            },
            Ok(Err(_)) | Err(_) => ProbeResult {
                proxy: probed,
                reachable: false,
                latency_ms: None,
            },
        }
    }

    /// Probe every proxy in the list concurrently, bounded by the
    /// configured concurrency. Result order follows completion order.
    pub async fn probe_all(&self, proxies: &ProxyList) -> Vec<ProbeResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        stream::iter(proxies.iter().cloned())
            .map(|proxy| {
                let sem = Arc::clone(&semaphore);
                let prober = self.clone();
                async move {
                    // The semaphore lives as long as every probe future, so
                    // acquire can only fail if it were closed, which it
                    // never is here.
                    let _permit = sem.acquire().await.expect("Semaphore closed unexpectedly");
                    prober.probe(&proxy).await
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await
    }

    /// Probe the list and split it into reachable and unreachable
    /// collections of stamped records.
    pub async fn probe_and_partition(&self, proxies: &ProxyList) -> (ProxyList, ProxyList) {
        let results = self.probe_all(proxies).await;
        let (good, bad): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.reachable);
        (
            good.into_iter().map(|r| r.proxy).collect(),
            bad.into_iter().map(|r| r.proxy).collect(),
        )
    }

    /// Probe the list and return the set of reachable `addr:port` keys,
    /// usable as a predicate for [`ProxyList::filter_by`].
    pub async fn reachable_endpoints(&self, proxies: &ProxyList) -> HashSet<String> {
        self.probe_all(proxies)
            .await
            .into_iter()
            .filter(|r| r.reachable)
            .map(|r| r.proxy.host_port())
            .collect()
    }
}

impl Default for ProxyProber {
    fn default() -> Self {
        Self::new()
    }
}
