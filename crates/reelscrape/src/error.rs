//! Error types and failure classification for the scrape pipeline.

use std::fmt;
use std::path::PathBuf;

/// Output formats produced by the writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Csv => write!(f, "CSV"),
        }
    }
}

/// All errors that can occur while scraping a profile.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("profile not found or private: @{profile}")]
    ProfileNotFound { profile: String },

    #[error("navigation timeout after {timeout_ms}ms loading {url}")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("item {index} skipped: {reason}")]
    ExtractionItem { index: usize, reason: String },

    #[error("failed to write {format} to {}: {source}", path.display())]
    WriteFailure {
        format: OutputFormat,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Map a renderer failure raised while loading `url` onto a typed error.
    pub fn from_navigation(err: &anyhow::Error, url: &str, timeout_ms: u64) -> Self {
        let message = format!("{err:#}");
        match ErrorKind::classify_message(&message) {
            ErrorKind::NavigationTimeout => ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms,
            },
            ErrorKind::NetworkUnavailable => ScrapeError::NetworkUnavailable(message),
            _ => ScrapeError::Browser(message),
        }
    }

    /// Wrap any other renderer failure, keeping network failures distinguishable.
    pub fn from_renderer(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        match ErrorKind::classify_message(&message) {
            ErrorKind::NetworkUnavailable => ScrapeError::NetworkUnavailable(message),
            _ => ScrapeError::Browser(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::ProfileNotFound { .. } => ErrorKind::ProfileNotFound,
            ScrapeError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            ScrapeError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            ScrapeError::ExtractionItem { .. } => ErrorKind::ExtractionItem,
            ScrapeError::WriteFailure { .. } => ErrorKind::WriteFailure,
            ScrapeError::Browser(msg) => ErrorKind::classify_message(msg),
            ScrapeError::Config(_) => ErrorKind::Other,
        }
    }
}

/// Coarse failure categories used for user-facing guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProfileNotFound,
    NavigationTimeout,
    NetworkUnavailable,
    ExtractionItem,
    WriteFailure,
    Other,
}

const NETWORK_PATTERNS: &[&str] = &[
    "net::ERR_INTERNET_DISCONNECTED",
    "net::ERR_NAME_NOT_RESOLVED",
    "net::ERR_NETWORK_CHANGED",
    "net::ERR_ADDRESS_UNREACHABLE",
    "net::ERR_PROXY_CONNECTION_FAILED",
];

const TIMEOUT_PATTERNS: &[&str] = &["navigation timeout", "timed out"];

const NOT_FOUND_PATTERNS: &[&str] = &["profile not found"];

impl ErrorKind {
    /// Classify a raw failure message by the patterns browsers report.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if NETWORK_PATTERNS
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()))
        {
            ErrorKind::NetworkUnavailable
        } else if NOT_FOUND_PATTERNS.iter().any(|p| lower.contains(p)) {
            ErrorKind::ProfileNotFound
        } else if TIMEOUT_PATTERNS.iter().any(|p| lower.contains(p)) {
            ErrorKind::NavigationTimeout
        } else {
            ErrorKind::Other
        }
    }

    /// Hint shown to the user next to the failure, if one applies.
    pub fn guidance(self) -> Option<&'static str> {
        match self {
            ErrorKind::NetworkUnavailable => Some("Check your internet connection"),
            ErrorKind::ProfileNotFound => Some("The username does not exist or the profile is private"),
            ErrorKind::NavigationTimeout => {
                Some("Timed out, the site may be throttling automated requests")
            }
            _ => None,
        }
    }
}

/// Convenience result type.
pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_network_message() {
        let kind = ErrorKind::classify_message(
            "navigation failed: net::ERR_INTERNET_DISCONNECTED at https://example.com",
        );
        assert_eq!(kind, ErrorKind::NetworkUnavailable);
    }

    #[test]
    fn test_classify_timeout_message() {
        assert_eq!(
            ErrorKind::classify_message("navigation timed out after 30000ms"),
            ErrorKind::NavigationTimeout
        );
        assert_eq!(
            ErrorKind::classify_message("Navigation timeout of 30000 ms exceeded"),
            ErrorKind::NavigationTimeout
        );
    }

    #[test]
    fn test_classify_unknown_message() {
        assert_eq!(
            ErrorKind::classify_message("websocket closed"),
            ErrorKind::Other
        );
        assert!(ErrorKind::Other.guidance().is_none());
    }

    #[test]
    fn test_from_navigation_distinguishes_kinds() {
        let timeout = anyhow::anyhow!("navigation timed out after 10ms");
        let err = ScrapeError::from_navigation(&timeout, "https://x.test/@a", 10);
        assert!(matches!(err, ScrapeError::NavigationTimeout { timeout_ms: 10, .. }));

        let offline = anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED");
        let err = ScrapeError::from_navigation(&offline, "https://x.test/@a", 10);
        assert_eq!(err.kind(), ErrorKind::NetworkUnavailable);

        let other = anyhow::anyhow!("target crashed");
        let err = ScrapeError::from_navigation(&other, "https://x.test/@a", 10);
        assert!(matches!(err, ScrapeError::Browser(_)));
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_every_primary_kind_has_guidance() {
        let err = ScrapeError::ProfileNotFound {
            profile: "ghost".into(),
        };
        assert!(err.kind().guidance().is_some());
        assert!(err.to_string().contains("@ghost"));
    }
}
