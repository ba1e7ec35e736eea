use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};

use crate::SinkRef;

/// Collects hit lines across all scan phases.
///
/// Hits are exact strings; the set keeps them unique and sorted, so
/// collecting the same findings twice changes nothing.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    hits: BTreeSet<String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hit. Returns false when the exact line was already known.
    pub fn add(&mut self, hit: impl Into<String>) -> bool {
        self.hits.insert(hit.into())
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, hits: I) {
        self.hits.extend(hits);
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hits in lexicographic order.
    pub fn sorted(&self) -> Vec<String> {
        self.hits.iter().cloned().collect()
    }

    /// Prints the final findings and mirrors them into `log`, one per line.
    pub fn report(&self, host: &str, sink: &SinkRef, log: &mut dyn Write) -> io::Result<()> {
        if self.hits.is_empty() {
            let line = nothing_found(host);
            sink.on_log("success", &line);
            writeln!(log, "{}", line)?;
        } else {
            for hit in &self.hits {
                sink.on_finding(hit);
                writeln!(log, "{}", hit)?;
            }
        }
        log.flush()
    }
}

pub fn nothing_found(host: &str) -> String {
    format!("we didn't find anything interesting on {}", host)
}

/// Opens the hit log for appending, creating it if needed.
pub fn open_log(path: &str) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScanEventSink;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, String)>>,
    }

    impl ScanEventSink for RecordingSink {
        fn on_log(&self, level: &str, message: &str) {
            self.events.lock().unwrap().push((level.to_string(), message.to_string()));
        }
        fn on_finding(&self, hit: &str) {
            self.events.lock().unwrap().push(("finding".to_string(), hit.to_string()));
        }
        fn on_progress(&self, _message: &str) {}
        fn on_clear(&self) {}
    }

    fn hits() -> Vec<String> {
        vec![
            "xss in url: http://h/<p>cobra</p>".to_string(),
            "found sensitive directory: http://h/.git".to_string(),
            "command injection in cookie (sleep 30): http://h".to_string(),
        ]
    }

    #[test]
    fn test_dedup_and_sort_idempotent() {
        let mut once = ResultAggregator::new();
        once.extend(hits());

        let mut twice = ResultAggregator::new();
        twice.extend(hits());
        twice.extend(hits());

        assert_eq!(once.sorted(), twice.sorted());
        let mut expected = hits();
        expected.sort();
        assert_eq!(twice.sorted(), expected);
        assert!(!twice.add(hits()[0].clone()));
    }

    #[test]
    fn test_report_writes_one_line_per_hit() {
        let mut agg = ResultAggregator::new();
        agg.extend(hits());
        agg.extend(hits());

        let recorder = Arc::new(RecordingSink::default());
        let sink: SinkRef = recorder.clone();
        let mut log = Vec::new();
        agg.report("http://h", &sink, &mut log).unwrap();

        let text = String::from_utf8(log).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.windows(2).all(|w| w[0] < w[1]));
        assert!(text.ends_with('\n'));

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|(kind, _)| kind == "finding"));
    }

    #[test]
    fn test_report_nothing_found() {
        let agg = ResultAggregator::new();
        let recorder = Arc::new(RecordingSink::default());
        let sink: SinkRef = recorder.clone();
        let mut log = Vec::new();
        agg.report("http://h", &sink, &mut log).unwrap();

        assert_eq!(String::from_utf8(log).unwrap(), "we didn't find anything interesting on http://h\n");
        let events = recorder.events.lock().unwrap();
        assert_eq!(events[0].0, "success");
    }

    #[test]
    fn test_open_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cobra.log");
        let path = path.to_str().unwrap();
        writeln!(open_log(path).unwrap(), "first").unwrap();
        writeln!(open_log(path).unwrap(), "second").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "first\nsecond\n");
    }
}
