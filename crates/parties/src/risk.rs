//! Customer risk evaluator.
//!
//! Rules, first match wins:
//! 1. credit limit configured and total debt above it → `HIGH_RISK`
//! 2. oldest invoice more than `high_risk_after_days` overdue → `HIGH_RISK`
//! 3. oldest invoice more than `warning_after_days` overdue → `WARNING`
//! 4. otherwise → `NORMAL`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use receivables_core::{DomainError, DomainResult, Money, ReferenceDate};
use receivables_invoicing::Invoice;

use crate::customer::Customer;
use crate::risk_level::RiskLevel;

/// Day thresholds for the aging rules (exclusive: "more than N days").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub warning_after_days: u32,
    pub high_risk_after_days: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            warning_after_days: 60,
            high_risk_after_days: 90,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> DomainResult<()> {
        if self.warning_after_days < self.high_risk_after_days {
            Ok(())
        } else {
            Err(DomainError::invariant(format!(
                "warning_after_days ({}) must be below high_risk_after_days ({})",
                self.warning_after_days, self.high_risk_after_days
            )))
        }
    }
}

/// Which rule decided the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskReason {
    CreditLimitExceeded,
    SeverelyOverdue,
    Overdue,
    WithinTerms,
}

/// Result of evaluating one customer, with the figures behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEvaluation {
    pub level: RiskLevel,
    pub reason: RiskReason,
    pub total_debt: Money,
    pub max_overdue_days: u32,
    pub credit_limit: Option<Money>,
}

impl RiskEvaluation {
    /// Share of the credit limit in use, in percent. `None` without a limit.
    pub fn credit_utilization(&self) -> Option<f64> {
        self.credit_limit
            .map(|limit| self.total_debt.as_f64() * 100.0 / limit.as_f64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiskEvaluator {
    thresholds: RiskThresholds,
}

impl RiskEvaluator {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Classify `customer` from `invoices` as of `reference`.
    ///
    /// Every supplied invoice counts; drop paid/cancelled ones beforehand if
    /// they should not (see `receivables_invoicing::InvoiceFilter`).
    pub fn evaluate<'a, I>(&self, customer: &Customer, invoices: I, reference: ReferenceDate) -> RiskEvaluation
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let (total_debt, max_overdue_days) = invoices.into_iter().fold(
            (Money::ZERO, 0u32),
            |(debt, max_days), inv| {
                (debt + inv.balance_amount, max_days.max(inv.days_overdue(reference)))
            },
        );
        let credit_limit = customer.credit_limit();

        let (level, reason) = if credit_limit.is_some_and(|limit| total_debt > limit) {
            (RiskLevel::HighRisk, RiskReason::CreditLimitExceeded)
        } else if max_overdue_days > self.thresholds.high_risk_after_days {
            (RiskLevel::HighRisk, RiskReason::SeverelyOverdue)
        } else if max_overdue_days > self.thresholds.warning_after_days {
            (RiskLevel::Warning, RiskReason::Overdue)
        } else {
            (RiskLevel::Normal, RiskReason::WithinTerms)
        };

        RiskEvaluation {
            level,
            reason,
            total_debt,
            max_overdue_days,
            credit_limit,
        }
    }

    /// Evaluate as of `as_of` and write the level to `customer` if it changed.
    ///
    /// `updated_at` is refreshed to `as_of` only on change. Returns whether
    /// anything was written.
    pub fn apply<'a, I>(&self, customer: &mut Customer, invoices: I, as_of: DateTime<Utc>) -> bool
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let evaluation = self.evaluate(customer, invoices, ReferenceDate::from_datetime(as_of));
        Self::apply_evaluation(customer, &evaluation, as_of)
    }

    /// Write an already computed evaluation to `customer` if its level differs.
    pub fn apply_evaluation(customer: &mut Customer, evaluation: &RiskEvaluation, as_of: DateTime<Utc>) -> bool {
        if evaluation.level == customer.risk_level {
            return false;
        }

        tracing::debug!(
            customer_id = %customer.id,
            from = %customer.risk_level,
            to = %evaluation.level,
            reason = ?evaluation.reason,
            "customer risk level changed"
        );
        customer.risk_level = evaluation.level;
        customer.updated_at = as_of;
        true
    }
}

/// [`RiskEvaluator::evaluate`] with default thresholds, level only.
pub fn evaluate_risk<'a, I>(customer: &Customer, invoices: I, reference: ReferenceDate) -> RiskLevel
where
    I: IntoIterator<Item = &'a Invoice>,
{
    RiskEvaluator::default()
        .evaluate(customer, invoices, reference)
        .level
}

/// [`RiskEvaluator::apply`] with default thresholds.
pub fn apply_risk_assessment<'a, I>(customer: &mut Customer, invoices: I, as_of: DateTime<Utc>) -> bool
where
    I: IntoIterator<Item = &'a Invoice>,
{
    RiskEvaluator::default().apply(customer, invoices, as_of)
}
