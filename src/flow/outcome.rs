//! Results of the posting recipes.

use serde::{Deserialize, Serialize};

use crate::llms::EngineKind;
use crate::quotes::IngestReport;

/// What a recipe did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlowOutcome {
    /// Text produced and printed, nothing posted by request.
    Generated { text: String, engine: EngineKind },
    /// A single post went out.
    Posted { text: String, id: String },
    /// A thread went out; `ids` may be shorter than `texts` when the chain
    /// broke part way.
    ThreadPosted { texts: Vec<String>, ids: Vec<String> },
    /// Dry run: everything up to the post was done.
    DryRun { texts: Vec<String> },
    /// Nothing was posted.
    Skipped { reason: String },
    /// Quote material was added to the store.
    Ingested(IngestReport),
    /// Configuration check.
    Health(HealthReport),
}

impl FlowOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_posted(&self) -> bool {
        matches!(self, Self::Posted { .. } | Self::ThreadPosted { .. })
    }
}

/// Result of the configuration check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Required platform variables that are unset.
    pub missing_credentials: Vec<String>,
    /// Engines with the configuration they need, in auto order.
    pub engines: Vec<EngineKind>,
    /// Image backends in the order they are tried.
    pub image_backends: Vec<String>,
    pub quote_count: usize,
    pub dry_run_default: bool,
}

impl HealthReport {
    pub fn config_ok(&self) -> bool {
        self.missing_credentials.is_empty()
    }

    /// `config: ok` or `config: missing: A, B`.
    pub fn config_line(&self) -> String {
        if self.config_ok() {
            "config: ok".to_string()
        } else {
            format!("config: missing: {}", self.missing_credentials.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_line() {
        let mut report = HealthReport {
            missing_credentials: vec![],
            engines: vec![EngineKind::Fallback],
            image_backends: vec!["horde".into()],
            quote_count: 0,
            dry_run_default: true,
        };
        assert_eq!(report.config_line(), "config: ok");
        report.missing_credentials = vec!["TWITTER_API_KEY".into(), "TWITTER_ACCESS_TOKEN".into()];
        assert_eq!(
            report.config_line(),
            "config: missing: TWITTER_API_KEY, TWITTER_ACCESS_TOKEN"
        );
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(FlowOutcome::skipped("duplicate")).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "duplicate");
        assert!(FlowOutcome::Posted { text: "a".into(), id: "1".into() }.is_posted());
        assert!(!FlowOutcome::DryRun { texts: vec![] }.is_posted());
    }
}
