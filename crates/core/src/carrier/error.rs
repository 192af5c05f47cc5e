//! Errors returned by the carrier scrape client.

use thiserror::Error;

/// Failure of a single tracking-number lookup.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// The browser or transport layer failed.
    #[error("browser fault: {0}")]
    Browser(String),

    /// A page element disappeared while it was being read.
    #[error("stale element: {0}")]
    StaleElement(String),

    /// The page never showed a result within the allowed attempts.
    #[error("tracking result did not load after {attempts} attempts")]
    PageLoad { attempts: u32 },

    /// The borrowed session is no longer usable.
    #[error("session fault: {0}")]
    Session(String),

    /// Anything not attributable to the automation layer.
    #[error("unexpected scrape error: {0}")]
    Other(String),
}

impl ScrapeError {
    /// Whether this is an automation/browser-level fault, the kind that
    /// indicates the carrier site is currently unreliable.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ScrapeError::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScrapeError::Browser("crash".to_string()).is_transient());
        assert!(ScrapeError::StaleElement("row".to_string()).is_transient());
        assert!(ScrapeError::PageLoad { attempts: 3 }.is_transient());
        assert!(ScrapeError::Session("closed".to_string()).is_transient());
        assert!(!ScrapeError::Other("bad date".to_string()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = ScrapeError::PageLoad { attempts: 3 };
        assert_eq!(
            err.to_string(),
            "tracking result did not load after 3 attempts"
        );
    }
}
