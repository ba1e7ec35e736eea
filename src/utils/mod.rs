pub mod detector;
pub mod payload_loader;

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::net::IpAddr;
use std::path::Path;
use url::Url;

/// Reads a file line-by-line, returning all non-empty trimmed lines.
pub fn read_lines(path: &str) -> io::Result<Vec<String>> {
    let file = File::open(Path::new(path))?;
    let reader = io::BufReader::new(file);
    let lines = reader
        .lines()
        .filter_map(|line| {
            let line = line.ok()?;
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() { None } else { Some(trimmed) }
        })
        .collect();
    Ok(lines)
}

/// Last two DNS labels of the target's host, e.g. `example.com` for
/// `https://shop.example.com:8443/`. `None` for IP literals and
/// single-label hosts, where prepending a subdomain is meaningless.
pub fn registrable_domain(target: &str) -> Option<String> {
    let url = Url::parse(target).ok()?;
    let host = url.host_str()?.trim_end_matches('.').to_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return None;
    }
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }
    Some(labels[labels.len() - 2..].join("."))
}

/// `host` without trailing slashes, used as the base for path probes.
pub fn base_url(host: &str) -> &str {
    host.trim_end_matches('/')
}
