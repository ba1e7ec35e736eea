//! Pre-injection reconnaissance: sensitive subdomains, exposed files and
//! authentication pages.
//!
//! Every check here treats "the request succeeded" as the only signal, so a
//! host that answers every path with content would light up every probe.
//! `is_catch_all` detects that case up front.

use log::debug;

use crate::core::throttle::ThrottleController;
use crate::http::{FetchRequest, Fetcher};
use crate::utils::{base_url, registrable_domain};
use crate::SinkRef;

pub const SENSITIVE_SUBDOMAINS: &[&str] = &[
    "ad", "admin", "byod", "camera", "cameras", "cctv", "classified", "dev",
    "extranet", "git", "hr", "internal", "intranet", "it", "lan", "ldap",
    "local", "private", "secret", "secrets", "test", "wan",
];

pub const AUTH_FORM_PATHS: &[&str] = &["/admin", "/login", "/portal", "/signup"];

/// A path no real site should serve.
pub const FALSE_POSITIVE_PROBE: &str = "/cobra-fuzzer";

pub struct Recon<'a> {
    client: &'a dyn Fetcher,
    throttle: &'a ThrottleController,
    sink: &'a SinkRef,
}

impl<'a> Recon<'a> {
    pub fn new(client: &'a dyn Fetcher, throttle: &'a ThrottleController, sink: &'a SinkRef) -> Self {
        Self { client, throttle, sink }
    }

    async fn reachable(&self, url: &str) -> bool {
        self.throttle.wait().await;
        match self.client.fetch(&FetchRequest::get(url)).await {
            Ok(_) => true,
            Err(e) => {
                debug!("{} not reachable: {}", url, e);
                false
            }
        }
    }

    /// Tries `http://<label>.<domain>` for every wordlist label.
    pub async fn check_subdomains(&self, host: &str) -> Vec<String> {
        let Some(domain) = registrable_domain(host) else {
            debug!("no registrable domain for {}, skipping subdomain check", host);
            return Vec::new();
        };

        self.sink.on_progress(&format!("checking for sensitive subdomains on {}", host));
        let mut hits = Vec::new();
        for label in SENSITIVE_SUBDOMAINS {
            let candidate = format!("http://{}.{}", label, domain);
            self.sink.on_progress(&format!("checking: {}", candidate));
            if self.reachable(&candidate).await {
                hits.push(format!("found sensitive subdomain: {}", candidate));
            }
        }
        hits
    }

    /// True when the host serves content for a path that cannot exist.
    pub async fn is_catch_all(&self, host: &str) -> bool {
        let probe = format!("{}{}", base_url(host), FALSE_POSITIVE_PROBE);
        let catch_all = self.reachable(&probe).await;
        if catch_all {
            self.sink.on_log(
                "warn",
                &format!("{} answers for any path, skipping directory and login checks", host),
            );
        }
        catch_all
    }

    /// Probes `<host>/<path>` for every sensitive path.
    pub async fn check_directories<'p, I>(&self, host: &str, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'p str>,
    {
        let mut hits = Vec::new();
        for path in paths {
            let candidate = format!("{}/{}", base_url(host), path);
            self.sink.on_progress(&format!("checking: {}", candidate));
            if self.reachable(&candidate).await {
                hits.push(format!("found sensitive directory: {}", candidate));
            }
        }
        hits
    }

    /// Common login/signup pages that answer, to be injected alongside
    /// crawled URLs.
    pub async fn check_auth_forms(&self, host: &str) -> Vec<String> {
        let mut found = Vec::new();
        for path in AUTH_FORM_PATHS {
            let candidate = format!("{}{}", base_url(host), path);
            self.sink.on_progress(&format!("checking: {}", candidate));
            if self.reachable(&candidate).await {
                found.push(candidate);
            }
        }
        found
    }
}
