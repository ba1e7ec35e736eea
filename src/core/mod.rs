pub mod engine;
pub mod mutator;
pub mod result_aggregator;
pub mod target_manager;
pub mod throttle;

use serde::{Deserialize, Serialize};

/// Payload families the scanner knows how to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadCategory {
    Command,
    Directory,
    Php,
    Python,
    Xss,
    Emoji,
}

/// How a probe in a given category is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Payload asks the server to sleep; a slow answer is the signal.
    Timing,
    /// Payload is harmless markup; seeing it echoed back verbatim is the signal.
    Reflection,
}

impl PayloadCategory {
    /// Categories injected into crawled pages, in probing order.
    pub const INJECTION_ORDER: [PayloadCategory; 5] = [
        PayloadCategory::Command,
        PayloadCategory::Emoji,
        PayloadCategory::Php,
        PayloadCategory::Python,
        PayloadCategory::Xss,
    ];

    pub const ALL: [PayloadCategory; 6] = [
        PayloadCategory::Command,
        PayloadCategory::Directory,
        PayloadCategory::Php,
        PayloadCategory::Python,
        PayloadCategory::Xss,
        PayloadCategory::Emoji,
    ];

    pub fn detection(&self) -> Detection {
        match self {
            PayloadCategory::Command | PayloadCategory::Php | PayloadCategory::Python => {
                Detection::Timing
            }
            PayloadCategory::Directory | PayloadCategory::Xss | PayloadCategory::Emoji => {
                Detection::Reflection
            }
        }
    }

    /// File stem used when loading custom seeds (`<stem>.txt`).
    pub fn file_stem(&self) -> &'static str {
        match self {
            PayloadCategory::Command => "command",
            PayloadCategory::Directory => "directory",
            PayloadCategory::Php => "php",
            PayloadCategory::Python => "python",
            PayloadCategory::Xss => "xss",
            PayloadCategory::Emoji => "emoji",
        }
    }
}

impl std::fmt::Display for PayloadCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadCategory::Command => write!(f, "command injection"),
            PayloadCategory::Directory => write!(f, "sensitive directory"),
            PayloadCategory::Php => write!(f, "php injection"),
            PayloadCategory::Python => write!(f, "python injection"),
            PayloadCategory::Xss => write!(f, "xss"),
            PayloadCategory::Emoji => write!(f, "emoji injection"),
        }
    }
}
