use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::core::mutator::{InjectionPoint, TargetSurface};
use crate::core::throttle::ThrottleController;
use crate::core::{Detection, PayloadCategory};
use crate::http::Fetcher;
use crate::modules::forms::FormTemplate;
use crate::utils::detector::{Verdict, VulnerabilityDetector};
use crate::utils::payload_loader::PayloadLoader;
use crate::SinkRef;

/// Sends payloads at injection surfaces, one request at a time.
pub struct InjectionProber<'a> {
    client: &'a dyn Fetcher,
    throttle: &'a ThrottleController,
    detector: &'a VulnerabilityDetector,
    sink: &'a SinkRef,
    timing_timeout: Duration,
}

impl<'a> InjectionProber<'a> {
    pub fn new(
        client: &'a dyn Fetcher,
        throttle: &'a ThrottleController,
        detector: &'a VulnerabilityDetector,
        sink: &'a SinkRef,
        timing_timeout: Duration,
    ) -> Self {
        Self { client, throttle, detector, sink, timing_timeout }
    }

    /// Sends one payload at one surface and judges the answer.
    pub async fn probe(&self, surface: &TargetSurface, category: PayloadCategory, payload: &str) -> Verdict {
        let detection = category.detection();
        let timeout = match detection {
            Detection::Timing => Some(self.timing_timeout),
            Detection::Reflection => None,
        };

        let request = match surface.mutate(payload, timeout) {
            Ok(req) => req,
            Err(e) => return Verdict::Inconclusive(e),
        };

        self.throttle.wait().await;
        let start = Instant::now();
        let outcome = self.client.fetch(&request).await;
        let elapsed = start.elapsed();

        let verdict = self.detector.classify(detection, payload, outcome, elapsed);
        if let Verdict::Inconclusive(ref e) = verdict {
            debug!("{} probe on {} inconclusive: {}", category, request.url, e);
        }
        verdict
    }

    /// Runs every injection category against `url` and the forms found on it.
    pub async fn probe_url(&self, url: &str, forms: &[FormTemplate], payloads: &PayloadLoader) -> Vec<String> {
        let mut surfaces = vec![
            TargetSurface::new(url, InjectionPoint::Path),
            TargetSurface::new(url, InjectionPoint::Cookie),
            TargetSurface::new(url, InjectionPoint::Referer),
        ];
        surfaces.extend(
            forms
                .iter()
                .map(|form| TargetSurface::new(url, InjectionPoint::FormField(form.clone()))),
        );

        let mut hits = Vec::new();
        for category in PayloadCategory::INJECTION_ORDER {
            let label = category.to_string();
            for payload in payloads.payloads(category) {
                self.sink.on_progress(&format!("checking {} with payload {}", url, payload));
                for surface in &surfaces {
                    if self.probe(surface, category, payload).await.is_hit() {
                        let hit = surface.describe_hit(&label, payload);
                        self.sink.on_log("error", &hit);
                        hits.push(hit);
                    }
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FetchError, FetchRequest, FetchResponse};
    use crate::ScanEventSink;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct QuietSink;

    impl ScanEventSink for QuietSink {
        fn on_log(&self, _level: &str, _message: &str) {}
        fn on_finding(&self, _hit: &str) {}
        fn on_progress(&self, _message: &str) {}
        fn on_clear(&self) {}
    }

    /// Echoes the Referer header back and sleeps when the cookie says so.
    struct Echo {
        requests: Mutex<Vec<FetchRequest>>,
    }

    #[async_trait]
    impl Fetcher for Echo {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(cookie) = request.headers.get("cookie") {
                if cookie == "sleep 30" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
            let body = request
                .headers
                .get("referer")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            Ok(FetchResponse { status: 200, body })
        }
    }

    fn payloads() -> PayloadLoader {
        let mut loader = PayloadLoader::new();
        loader.set_seeds(PayloadCategory::Command, &["sleep 30"]);
        loader.set_seeds(PayloadCategory::Xss, &["<p>cobra</p>"]);
        loader
    }

    #[tokio::test(start_paused = true)]
    async fn test_timing_hit_via_cookie() {
        let client = Echo { requests: Mutex::new(Vec::new()) };
        let throttle = ThrottleController::new(Duration::ZERO);
        let detector = VulnerabilityDetector::new();
        let sink: SinkRef = Arc::new(QuietSink);
        let prober = InjectionProber::new(&client, &throttle, &detector, &sink, Duration::from_secs(120));

        let surface = TargetSurface::new("http://h", InjectionPoint::Cookie);
        let verdict = prober.probe(&surface, PayloadCategory::Command, "sleep 30").await;
        assert_eq!(verdict, Verdict::Hit);

        let sent = client.requests.lock().unwrap();
        assert_eq!(sent[0].timeout, Some(Duration::from_secs(120)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_url_collects_reflection_and_timing() {
        let client = Echo { requests: Mutex::new(Vec::new()) };
        let throttle = ThrottleController::new(Duration::ZERO);
        let detector = VulnerabilityDetector::new();
        let sink: SinkRef = Arc::new(QuietSink);
        let prober = InjectionProber::new(&client, &throttle, &detector, &sink, Duration::from_secs(120));

        let hits = prober.probe_url("http://h", &[], &payloads()).await;
        assert!(hits.contains(&"command injection in cookie (sleep 30): http://h".to_string()));
        assert!(hits.contains(&"xss in referer (<p>cobra</p>): http://h".to_string()));
        assert!(!hits.iter().any(|h| h.contains("in url:")));
        // 9 command + 9 xss variants, three surfaces each
        assert_eq!(throttle.total_requests(), 54);
    }

    #[tokio::test]
    async fn test_invalid_header_is_inconclusive_without_request() {
        let client = Echo { requests: Mutex::new(Vec::new()) };
        let throttle = ThrottleController::new(Duration::ZERO);
        let detector = VulnerabilityDetector::new();
        let sink: SinkRef = Arc::new(QuietSink);
        let prober = InjectionProber::new(&client, &throttle, &detector, &sink, Duration::from_secs(120));

        let surface = TargetSurface::new("http://h", InjectionPoint::Referer);
        let verdict = prober.probe(&surface, PayloadCategory::Xss, "a\u{7f}b").await;
        assert!(matches!(verdict, Verdict::Inconclusive(FetchError::InvalidRequest(_))));
        assert!(client.requests.lock().unwrap().is_empty());
    }
}
