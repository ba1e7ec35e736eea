use std::time::Duration;

use crate::core::Detection;
use crate::http::{FetchError, FetchResponse};

/// Responses slower than this are attributed to an executed sleep payload.
pub const DEFAULT_TIMING_THRESHOLD: Duration = Duration::from_secs(25);

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Hit,
    Clean,
    /// The request itself failed; nothing can be said about the surface.
    Inconclusive(FetchError),
}

impl Verdict {
    pub fn is_hit(&self) -> bool {
        matches!(self, Verdict::Hit)
    }
}

/// Classifies probe responses for timing and reflection payloads.
#[derive(Debug, Clone)]
pub struct VulnerabilityDetector {
    timing_threshold: Duration,
}

impl VulnerabilityDetector {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_TIMING_THRESHOLD)
    }

    pub fn with_threshold(timing_threshold: Duration) -> Self {
        Self { timing_threshold }
    }

    pub fn timing_threshold(&self) -> Duration {
        self.timing_threshold
    }

    /// Inclusive: a response taking exactly the threshold counts.
    pub fn is_timing_hit(&self, elapsed: Duration) -> bool {
        elapsed >= self.timing_threshold
    }

    /// The payload must come back byte-for-byte; an escaped echo is clean.
    pub fn is_reflected(&self, body: &str, payload: &str) -> bool {
        !payload.is_empty() && body.contains(payload)
    }

    /// Turns a finished request into a verdict.
    pub fn classify(
        &self,
        detection: Detection,
        payload: &str,
        outcome: Result<FetchResponse, FetchError>,
        elapsed: Duration,
    ) -> Verdict {
        match outcome {
            Err(e) => Verdict::Inconclusive(e),
            Ok(response) => {
                let hit = match detection {
                    Detection::Timing => self.is_timing_hit(elapsed),
                    Detection::Reflection => self.is_reflected(&response.body, payload),
                };
                if hit {
                    Verdict::Hit
                } else {
                    Verdict::Clean
                }
            }
        }
    }
}

impl Default for VulnerabilityDetector {
    fn default() -> Self {
        Self::new()
    }
}
