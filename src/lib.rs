pub mod core;
pub mod http;
pub mod modules;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use crate::core::engine::ScanEngine;
pub use crate::core::result_aggregator::{open_log, ResultAggregator};
pub use crate::core::target_manager::TargetManager;
pub use crate::core::PayloadCategory;
pub use crate::http::{FetchError, FetchRequest, FetchResponse, Fetcher, HttpClient};
pub use crate::modules::crawler::{Crawler, LinkCrawler};
pub use crate::utils::payload_loader::PayloadLoader;
pub use crate::utils::read_lines;

/// Scan settings shared by the CLI and library callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub target: String,
    /// Seconds slept before every request.
    pub delay: f64,
    /// Crawl depth handed to the crawler.
    pub crawl: u32,
    pub crawler_max_urls: usize,
    /// Default request timeout in seconds.
    pub timeout: u64,
    /// Timeout for sleep-based probes, in seconds.
    pub timing_timeout: u64,
    /// Elapsed seconds at or above which a sleep probe counts as a hit.
    pub timing_threshold: u64,
    pub output: String,
    pub proxy: String,
    /// `Key: Value` strings, one header each.
    pub headers: Vec<String>,
    pub payloads: String,
    pub verbose: bool,
    pub clear_screen: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            delay: 0.0,
            crawl: 1,
            crawler_max_urls: 50,
            timeout: 10,
            timing_timeout: 120,
            timing_threshold: 25,
            output: "cobra.log".to_string(),
            proxy: String::new(),
            headers: Vec::new(),
            payloads: String::new(),
            verbose: false,
            clear_screen: true,
        }
    }
}

impl ScanConfig {
    pub fn new(target: impl Into<String>, delay: f64, crawl: u32) -> Self {
        Self {
            target: target.into(),
            delay,
            crawl,
            ..Self::default()
        }
    }

    /// Loads a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn header_list(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect()
    }

    pub fn parsed_headers(&self) -> Vec<(String, String)> {
        parse_custom_headers(&self.header_list())
    }

    pub fn proxy_ref(&self) -> Option<&str> {
        if self.proxy.is_empty() { None } else { Some(&self.proxy) }
    }

    pub fn payloads_ref(&self) -> Option<&str> {
        if self.payloads.is_empty() { None } else { Some(&self.payloads) }
    }

    pub fn timing_timeout(&self) -> Duration {
        Duration::from_secs(self.timing_timeout)
    }

    pub fn timing_threshold(&self) -> Duration {
        Duration::from_secs(self.timing_threshold)
    }
}

pub fn parse_custom_headers(raw: &[String]) -> Vec<(String, String)> {
    raw.iter().filter_map(|h| {
        let mut parts = h.splitn(2, ':');
        let key = parts.next()?.trim().to_string();
        let val = parts.next().unwrap_or("").trim().to_string();
        if key.is_empty() { return None; }
        Some((key, val))
    }).collect()
}

/// Output abstraction for the scan pipeline.
/// The CLI prints through `ConsoleSink`; tests plug in recorders.
pub trait ScanEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_finding(&self, hit: &str);
    fn on_progress(&self, message: &str);
    /// Called at phase boundaries.
    fn on_clear(&self);
}

pub type SinkRef = Arc<dyn ScanEventSink>;

/// Terminal output sink for CLI usage.
pub struct ConsoleSink {
    clear_screen: bool,
}

impl ConsoleSink {
    pub fn new_ref(clear_screen: bool) -> SinkRef {
        Arc::new(Self { clear_screen })
    }
}

impl ScanEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        use std::io::Write;
        let colored = match level {
            "success" => message.green().to_string(),
            "error"   => message.red().to_string(),
            "warn"    => message.yellow().to_string(),
            "phase"   => message.bright_cyan().bold().to_string(),
            _         => message.to_string(),
        };
        print!("{}\r\n", colored);
        std::io::stdout().flush().ok();
    }

    fn on_finding(&self, hit: &str) {
        use colored::*;
        use std::io::Write;
        print!("{}\r\n", hit.red().bold());
        std::io::stdout().flush().ok();
    }

    fn on_progress(&self, message: &str) {
        use colored::*;
        use std::io::Write;
        print!("{}\r\n", message.bright_cyan());
        std::io::stdout().flush().ok();
    }

    fn on_clear(&self) {
        use crossterm::{cursor::MoveTo, execute, terminal::{Clear, ClearType}};
        if self.clear_screen {
            execute!(std::io::stdout(), Clear(ClearType::All), MoveTo(0, 0)).ok();
        }
    }
}

/// Scans `host` with the stock HTTP client and crawler, printing to the
/// terminal and appending to `cobra.log`. Returns the sorted hits.
pub async fn scan(host: &str, delay: f64, crawl: u32) -> anyhow::Result<Vec<String>> {
    let config = ScanConfig::new(host, delay, crawl);
    let sink = ConsoleSink::new_ref(config.clear_screen);
    let engine = ScanEngine::from_config(config, sink)?;
    engine.run_and_report().await
}
