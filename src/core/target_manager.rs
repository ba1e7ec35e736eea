use std::collections::HashSet;
use url::Url;

/// Deduplicating, order-preserving list of URLs discovered for one host.
pub struct TargetManager {
    origin: Option<(String, Option<u16>)>,
    targets: Vec<String>,
    seen: HashSet<String>,
}

/// Host (lowercased) and effective port of a URL.
fn network_location(url: &str) -> Option<(String, Option<u16>)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some((host, parsed.port_or_known_default()))
}

impl TargetManager {
    /// Creates a manager scoped to `host`'s network location.
    pub fn new(host: &str) -> Self {
        Self {
            origin: network_location(host),
            targets: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Adds a target unless it has been seen before.
    pub fn add_target(&mut self, target: String) {
        if self.seen.insert(target.clone()) {
            self.targets.push(target);
        }
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, targets: I) {
        for t in targets {
            self.add_target(t);
        }
    }

    /// Whether `url` shares host and port with the scanned host.
    pub fn is_in_scope(&self, url: &str) -> bool {
        match (&self.origin, network_location(url)) {
            (Some(origin), Some(loc)) => *origin == loc,
            _ => false,
        }
    }

    /// All targets in first-seen order.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// In-scope targets in first-seen order.
    pub fn in_scope(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| self.is_in_scope(t))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
