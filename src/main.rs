use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use proxy_harvest::{
    CrawlerConfig, ProbeConfig, ProxyCrawler, ProxyList, ProxyProber, ProxyType, SourceId,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A streaming scraper for public proxy lists
#[derive(Parser)]
#[command(name = "proxy-harvest")]
#[command(about = "Harvest, probe and filter public proxy lists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape proxies from the supported sources
    Scrape {
        /// Sources to scrape (default: all). Known names:
        /// free-proxy.cz, free-proxy-list.net, spys.one, proxyscrape,
        /// proxy-list.download
        #[arg(short, long)]
        source: Vec<String>,
        /// Keep only this proxy type (http, https, socks4, socks5)
        #[arg(short = 't', long)]
        proxy_type: Option<String>,
        /// Output file for harvested proxies
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format: csv or json
        #[arg(long, default_value = "csv")]
        format: String,
        /// Timeout in seconds for HTTP requests
        #[arg(long, default_value = "30")]
        timeout: u64,
        /// Cache fetched pages for this many minutes
        #[arg(long)]
        cache_minutes: Option<u64>,
        /// Number of free-proxy.cz listing pages to request
        #[arg(long, default_value = "1")]
        pages: u32,
    },
    /// Probe saved proxies and keep the reachable ones
    Check {
        /// Input file containing proxies (.json or delimited text)
        input: PathBuf,
        /// Output file for reachable proxies
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Timeout in seconds for each probe
        #[arg(long, default_value = "1")]
        timeout: u64,
        /// Number of concurrent probes
        #[arg(short = 'n', long, default_value = "50")]
        concurrency: usize,
    },
    /// Print saved proxies, optionally filtered
    List {
        /// Input file containing proxies (.json or delimited text)
        input: PathBuf,
        /// Keep only this proxy type (http, https, socks4, socks5)
        #[arg(short = 't', long)]
        proxy_type: Option<String>,
        /// Print in reverse discovery order
        #[arg(long)]
        reverse: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            source,
            proxy_type,
            output,
            format,
            timeout,
            cache_minutes,
            pages,
        } => {
            let wanted_type = proxy_type.as_deref().map(parse_proxy_type).transpose()?;
            if !matches!(format.as_str(), "csv" | "json") {
                bail!("Invalid format: {}. Use: csv, json", format);
            }

            let sources = resolve_sources(&source)?;

            let mut config = CrawlerConfig::new()
                .with_timeout(Duration::from_secs(timeout))
                .with_cz_pages((1..=pages).collect());
            if let Some(minutes) = cache_minutes {
                config = config.with_cache_ttl(Duration::from_secs(minutes * 60));
            }
            let crawler = ProxyCrawler::with_config(config)?;

            let mut all = ProxyList::new();
            for src in sources {
                match crawler.fetch_source(src).await {
                    Ok(proxies) => {
                        println!("Found {} proxies from {}", proxies.len(), src);
                        all.extend(proxies);
                    }
                    Err(e) => eprintln!("Error scraping {}: {}", src, e),
                }
            }

            if let Some(proxy_type) = wanted_type {
                all = all.filter_type(proxy_type);
            }
            println!("\nTotal proxies: {}", all.len());

            match output {
                Some(path) => {
                    save_list(&all, &path, &format)?;
                    println!("Saved proxies to {:?}", path);
                }
                None => {
                    for proxy in &all {
                        println!("{}", proxy.url());
                    }
                }
            }
        }
        Commands::Check {
            input,
            output,
            timeout,
            concurrency,
        } => {
            let proxies = load_list(&input)?;
            println!("Loaded {} proxies from {:?}", proxies.len(), input);
            println!("Probing with {} connections, timeout: {}s", concurrency, timeout);

            let config = ProbeConfig::new()
                .with_timeout(Duration::from_secs(timeout))
                .with_concurrency(concurrency);
            let prober = ProxyProber::with_config(config);

            let results = prober.probe_all(&proxies).await;
            let reachable: ProxyList = results
                .iter()
                .filter(|r| r.reachable)
                .map(|r| r.proxy.clone())
                .collect();

            println!(
                "Results: {} reachable, {} unreachable",
                reachable.len(),
                results.len() - reachable.len()
            );
            for result in results.iter().filter(|r| r.reachable) {
                if let Some(latency) = result.latency_ms {
                    println!("  {} ({}ms)", result.proxy.url(), latency);
                }
            }

            if let Some(path) = output {
                let format = format_for(&path);
                save_list(&reachable, &path, format)?;
                println!("Saved {} reachable proxies to {:?}", reachable.len(), path);
            }
        }
        Commands::List {
            input,
            proxy_type,
            reverse,
        } => {
            let mut proxies = load_list(&input)?;
            if let Some(label) = proxy_type.as_deref() {
                proxies = proxies.filter_type(parse_proxy_type(label)?);
            }
            if reverse {
                proxies = proxies.reversed();
            }
            for proxy in &proxies {
                println!("{}", proxy.url());
            }
        }
    }

    Ok(())
}

fn parse_proxy_type(s: &str) -> Result<ProxyType> {
    ProxyType::find(s).ok_or_else(|| {
        anyhow!(
            "Invalid proxy type: {}. Use: http, https, socks4, socks5",
            s
        )
    })
}

fn resolve_sources(names: &[String]) -> Result<Vec<SourceId>> {
    if names.is_empty() {
        return Ok(SourceId::all().to_vec());
    }
    names
        .iter()
        .map(|name| {
            SourceId::find(name).ok_or_else(|| anyhow!("Unknown source: {}", name))
        })
        .collect()
}

fn format_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "json",
        _ => "csv",
    }
}

fn load_list(path: &Path) -> Result<ProxyList> {
    match format_for(path) {
        "json" => ProxyList::load_json(path),
        _ => ProxyList::load_delimited(path),
    }
}

fn save_list(list: &ProxyList, path: &Path, format: &str) -> Result<()> {
    match format {
        "json" => list.save_json(path),
        _ => list.save_delimited(path),
    }
}
