use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use url::Url;

use crate::core::throttle::ThrottleController;
use crate::http::{FetchRequest, Fetcher};

/// Discovers URLs reachable from a seed.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Returns discovered URLs, seed first, bounded by `depth`.
    async fn crawl(&self, seed: &str, throttle: &ThrottleController, depth: u32) -> anyhow::Result<Vec<String>>;
}

/// Breadth-first crawler following link-like attributes on the seed's host.
pub struct LinkCrawler {
    client: Arc<dyn Fetcher>,
    max_urls: usize,
    link_attr: Regex,
}

impl LinkCrawler {
    pub fn new(client: Arc<dyn Fetcher>, max_urls: usize) -> Self {
        Self {
            client,
            max_urls: max_urls.max(1),
            link_attr: Regex::new(r#"(?i)\b(?:href|src|action)\s*=\s*["']([^"'#\s]+)"#)
                .expect("static regex"),
        }
    }

    /// Links on `page`, resolved against `base` and limited to its host.
    pub fn extract_links(&self, base: &Url, page: &str) -> Vec<Url> {
        let mut links = Vec::new();
        for caps in self.link_attr.captures_iter(page) {
            let raw = &caps[1];
            let lower = raw.to_ascii_lowercase();
            if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("data:") {
                continue;
            }
            let Ok(mut next) = base.join(raw) else { continue };
            next.set_fragment(None);
            if !matches!(next.scheme(), "http" | "https") {
                continue;
            }
            if next.host_str() != base.host_str() || next.port_or_known_default() != base.port_or_known_default() {
                continue;
            }
            links.push(next);
        }
        links
    }
}

#[async_trait]
impl Crawler for LinkCrawler {
    async fn crawl(&self, seed: &str, throttle: &ThrottleController, depth: u32) -> anyhow::Result<Vec<String>> {
        let start = Url::parse(seed)?;
        let mut found: Vec<String> = vec![seed.to_string()];
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(seed.to_string());
        seen.insert(start.to_string());

        let mut queue = VecDeque::new();
        queue.push_back((start, 0u32));

        while let Some((url, level)) = queue.pop_front() {
            if level >= depth || found.len() >= self.max_urls {
                continue;
            }

            throttle.wait().await;
            let body = match self.client.fetch(&FetchRequest::get(url.as_str())).await {
                Ok(resp) => resp.body,
                Err(e) => {
                    debug!("crawler skipped {}: {}", url, e);
                    continue;
                }
            };

            for next in self.extract_links(&url, &body) {
                if found.len() >= self.max_urls {
                    break;
                }
                if seen.insert(next.to_string()) {
                    debug!("discovered {}", next);
                    found.push(next.to_string());
                    queue.push_back((next, level + 1));
                }
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FetchError, FetchResponse};
    use std::collections::HashMap;

    struct StaticSite {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl Fetcher for StaticSite {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            self.pages
                .get(&request.url)
                .map(|body| FetchResponse { status: 200, body: body.clone() })
                .ok_or(FetchError::Status(404))
        }
    }

    fn site() -> Arc<dyn Fetcher> {
        let mut pages = HashMap::new();
        pages.insert(
            "http://example.com/".to_string(),
            r#"<a href="/about">a</a> <a href='contact#top'>c</a> <a href="http://evil.org/">x</a>
               <a href="mailto:me@example.com">m</a> <script src="/app.js"></script>"#.to_string(),
        );
        pages.insert(
            "http://example.com/about".to_string(),
            r#"<a href="/team">t</a><a href="/">home</a>"#.to_string(),
        );
        Arc::new(StaticSite { pages })
    }

    #[tokio::test]
    async fn test_depth_one_only_follows_seed_links() {
        let crawler = LinkCrawler::new(site(), 50);
        let throttle = ThrottleController::new(std::time::Duration::ZERO);
        let urls = crawler.crawl("http://example.com/", &throttle, 1).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "http://example.com/",
                "http://example.com/about",
                "http://example.com/contact",
                "http://example.com/app.js",
            ]
        );
    }

    #[tokio::test]
    async fn test_depth_two_reaches_nested_pages() {
        let crawler = LinkCrawler::new(site(), 50);
        let throttle = ThrottleController::new(std::time::Duration::ZERO);
        let urls = crawler.crawl("http://example.com/", &throttle, 2).await.unwrap();
        assert!(urls.contains(&"http://example.com/team".to_string()));
        assert_eq!(urls.iter().filter(|u| *u == "http://example.com/").count(), 1);
    }

    #[tokio::test]
    async fn test_depth_zero_and_cap() {
        let throttle = ThrottleController::new(std::time::Duration::ZERO);
        let crawler = LinkCrawler::new(site(), 50);
        assert_eq!(crawler.crawl("http://example.com/", &throttle, 0).await.unwrap().len(), 1);

        let capped = LinkCrawler::new(site(), 2);
        assert_eq!(capped.crawl("http://example.com/", &throttle, 3).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_seed_is_error() {
        let throttle = ThrottleController::new(std::time::Duration::ZERO);
        let crawler = LinkCrawler::new(site(), 50);
        assert!(crawler.crawl("not a url", &throttle, 1).await.is_err());
    }
}
