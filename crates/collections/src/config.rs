//! Engine configuration.
//!
//! Everything is optional: an empty document, or no environment at all, yields
//! the defaults (4-bucket aging table, 7/30/60 severity tiers, 60/90 risk days,
//! outstanding invoices only).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use receivables_core::DomainError;
use receivables_invoicing::{
    AgingBucketTable, InvoiceFilter, OverdueEventBuilder, OverdueSeverityThresholds,
    RiskScorePolicy,
};
use receivables_parties::{RiskEvaluator, RiskThresholds};

/// Inline JSON configuration document.
pub const CONFIG_ENV: &str = "RECEIVABLES_CONFIG";
/// Overrides `invoice_filter` (`all`, `outstanding` or `overdue`).
pub const INVOICE_FILTER_ENV: &str = "RECEIVABLES_INVOICE_FILTER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] DomainError),

    #[error("invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceivablesConfig {
    /// Reporting brackets.
    pub aging_buckets: AgingBucketTable,
    /// Reminder urgency tiers (independent of `aging_buckets`).
    pub severity: OverdueSeverityThresholds,
    pub risk_score: RiskScorePolicy,
    pub risk: RiskThresholds,
    /// Which invoices are fed to the engines.
    pub invoice_filter: InvoiceFilter,
}

impl ReceivablesConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_ENV) {
            Some(json) if !json.trim().is_empty() => Self::from_json(&json)?,
            _ => Self::default(),
        };

        if let Some(raw) = lookup(INVOICE_FILTER_ENV) {
            config.invoice_filter = raw.parse().map_err(|e: DomainError| ConfigError::Env {
                var: INVOICE_FILTER_ENV,
                message: e.to_string(),
            })?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.severity.validate()?;
        self.risk_score.validate()?;
        self.risk.validate()?;
        Ok(())
    }

    pub fn overdue_builder(&self) -> OverdueEventBuilder {
        OverdueEventBuilder::new()
            .with_thresholds(self.severity)
            .with_score_policy(self.risk_score)
    }

    pub fn risk_evaluator(&self) -> RiskEvaluator {
        RiskEvaluator::new(self.risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ReceivablesConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ReceivablesConfig::default());
        assert_eq!(config.aging_buckets, AgingBucketTable::standard());
        assert_eq!(config.invoice_filter, InvoiceFilter::Outstanding);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = ReceivablesConfig::from_json(
            r#"{
                "aging_buckets": [
                    {"label": "CURRENT", "max_days": 0},
                    {"label": "1-30", "max_days": 30},
                    {"label": "31-60", "max_days": 60},
                    {"label": "61-90", "max_days": 90},
                    {"label": "90+", "max_days": null}
                ],
                "risk": {"warning_after_days": 45}
            }"#,
        )
        .unwrap();

        assert_eq!(config.aging_buckets, AgingBucketTable::with_current());
        assert_eq!(config.risk.warning_after_days, 45);
        assert_eq!(config.risk.high_risk_after_days, 90);
        assert_eq!(config.severity, OverdueSeverityThresholds::default());
    }

    #[test]
    fn invalid_bucket_table_is_a_parse_error() {
        let err = ReceivablesConfig::from_json(r#"{"aging_buckets": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn inconsistent_thresholds_are_rejected() {
        let err = ReceivablesConfig::from_json(
            r#"{"risk": {"warning_after_days": 90, "high_risk_after_days": 60}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn env_filter_override_applies_on_top_of_document() {
        let config = ReceivablesConfig::from_lookup(lookup(&[
            (CONFIG_ENV, r#"{"invoice_filter": "all"}"#),
            (INVOICE_FILTER_ENV, "overdue"),
        ]))
        .unwrap();
        assert_eq!(config.invoice_filter, InvoiceFilter::Overdue);
    }

    #[test]
    fn bad_env_filter_names_the_variable() {
        let err = ReceivablesConfig::from_lookup(lookup(&[(INVOICE_FILTER_ENV, "unpaid")]))
            .unwrap_err();
        match err {
            ConfigError::Env { var, .. } => assert_eq!(var, INVOICE_FILTER_ENV),
            other => panic!("Expected Env error, got {other:?}"),
        }
    }

    #[test]
    fn builders_carry_configured_policies() {
        let config = ReceivablesConfig::from_json(
            r#"{"severity": {"low_max_days": 3, "medium_max_days": 14, "high_max_days": 45}}"#,
        )
        .unwrap();
        assert_eq!(config.overdue_builder().thresholds().medium_max_days, 14);
        assert_eq!(config.risk_evaluator().thresholds(), &RiskThresholds::default());
    }
}
