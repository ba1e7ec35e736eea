use std::io::Write;
use std::sync::Arc;

use log::{debug, warn};

use crate::core::result_aggregator::{open_log, ResultAggregator};
use crate::core::target_manager::TargetManager;
use crate::core::throttle::ThrottleController;
use crate::core::PayloadCategory;
use crate::http::{FetchRequest, Fetcher, HttpClient};
use crate::modules::crawler::{Crawler, LinkCrawler};
use crate::modules::forms::{FormExtractor, FormTemplate};
use crate::modules::prober::InjectionProber;
use crate::modules::recon::Recon;
use crate::utils::detector::VulnerabilityDetector;
use crate::utils::payload_loader::PayloadLoader;
use crate::{ScanConfig, SinkRef};

/// Runs a full scan of one host.
///
/// Phases, strictly in order and one request at a time:
/// 1. sensitive subdomains
/// 2. catch-all guard, then sensitive directories
/// 3. crawl, plus well-known login pages unless the guard tripped
/// 4. payload injection into every same-origin URL and its forms
pub struct ScanEngine {
    config: ScanConfig,
    client: Arc<dyn Fetcher>,
    crawler: Arc<dyn Crawler>,
    payloads: PayloadLoader,
    detector: VulnerabilityDetector,
    throttle: ThrottleController,
    forms: FormExtractor,
    sink: SinkRef,
}

impl ScanEngine {
    /// Creates an engine around caller-supplied collaborators.
    pub fn new(
        config: ScanConfig,
        client: Arc<dyn Fetcher>,
        crawler: Arc<dyn Crawler>,
        sink: SinkRef,
    ) -> Self {
        let payloads = match config.payloads_ref() {
            Some(dir) => PayloadLoader::load_from_dir(dir),
            None => PayloadLoader::load(),
        };
        Self {
            detector: VulnerabilityDetector::with_threshold(config.timing_threshold()),
            throttle: ThrottleController::from_secs_f64(config.delay),
            payloads,
            forms: FormExtractor::new(),
            config,
            client,
            crawler,
            sink,
        }
    }

    /// Creates an engine with the reqwest client and the built-in crawler.
    pub fn from_config(config: ScanConfig, sink: SinkRef) -> anyhow::Result<Self> {
        let client: Arc<dyn Fetcher> = Arc::new(HttpClient::new(
            config.timeout,
            config.proxy_ref(),
            &config.parsed_headers(),
        )?);
        let crawler = Arc::new(LinkCrawler::new(Arc::clone(&client), config.crawler_max_urls));
        Ok(Self::new(config, client, crawler, sink))
    }

    /// Swaps in a different payload set.
    pub fn with_payloads(mut self, payloads: PayloadLoader) -> Self {
        self.payloads = payloads;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn requests_sent(&self) -> u64 {
        self.throttle.total_requests()
    }

    /// Scans the configured target and returns the collected hits.
    pub async fn run(&self) -> ResultAggregator {
        let host = self.config.target.as_str();
        let client: &dyn Fetcher = &*self.client;
        let recon = Recon::new(client, &self.throttle, &self.sink);
        let mut results = ResultAggregator::new();

        self.sink.on_clear();

        results.extend(recon.check_subdomains(host).await);

        let catch_all = recon.is_catch_all(host).await;
        if !catch_all {
            let paths = self.payloads.payloads(PayloadCategory::Directory);
            results.extend(recon.check_directories(host, paths).await);
        }

        self.sink.on_progress(&format!("crawling: {}", host));
        let mut targets = TargetManager::new(host);
        match self.crawler.crawl(host, &self.throttle, self.config.crawl).await {
            Ok(urls) => targets.extend(urls),
            Err(e) => {
                warn!("crawler failed on {}: {}", host, e);
                targets.add_target(host.to_string());
            }
        }

        if !catch_all {
            targets.extend(recon.check_auth_forms(host).await);
        }

        self.sink.on_clear();

        let prober = InjectionProber::new(
            client,
            &self.throttle,
            &self.detector,
            &self.sink,
            self.config.timing_timeout(),
        );

        for url in targets.in_scope() {
            self.sink.on_progress(&format!("checking: {}", url));
            let forms = self.discover_forms(&url).await;
            results.extend(prober.probe_url(&url, &forms, &self.payloads).await);
        }

        self.sink.on_clear();
        results
    }

    /// Fetches `url` and parses the forms on it. A page that cannot be
    /// fetched simply has no forms.
    async fn discover_forms(&self, url: &str) -> Vec<FormTemplate> {
        self.throttle.wait().await;
        let body = match self.client.fetch(&FetchRequest::get(url)).await {
            Ok(resp) => resp.body,
            Err(e) => {
                debug!("could not fetch {} for forms: {}", url, e);
                return Vec::new();
            }
        };

        self.forms
            .extract_forms(&body)
            .iter()
            .filter_map(|block| match self.forms.parse_form(block, url) {
                Ok(form) => Some(form),
                Err(e) => {
                    debug!("skipping form on {}: {}", url, e);
                    None
                }
            })
            .collect()
    }

    /// Prints the results and appends them to `log`.
    pub fn report(&self, results: &ResultAggregator, log: &mut dyn Write) -> std::io::Result<()> {
        results.report(&self.config.target, &self.sink, log)
    }

    /// Scans, then reports to the sink and the configured log file.
    pub async fn run_and_report(&self) -> anyhow::Result<Vec<String>> {
        let results = self.run().await;
        let mut log = open_log(&self.config.output)?;
        self.report(&results, &mut log)?;
        Ok(results.sorted())
    }
}
