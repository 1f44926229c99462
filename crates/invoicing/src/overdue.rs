//! Overdue event builder.
//!
//! Turns a single invoice into an [`OverdueAssessment`]: how urgent it is, how
//! risky it looks and what collections should do next. Used by reminder and
//! automation jobs to pick recipients and the tone of the message.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use receivables_core::{CustomerId, DomainError, DomainResult, InvoiceId, Money, ReferenceDate};
use receivables_events::{Event, EventEnvelope};

use crate::aging::days_overdue;
use crate::invoice::Invoice;

/// Per-invoice urgency tier for reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverdueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OverdueSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            OverdueSeverity::Low => "LOW",
            OverdueSeverity::Medium => "MEDIUM",
            OverdueSeverity::High => "HIGH",
            OverdueSeverity::Critical => "CRITICAL",
        }
    }

    /// Human label shown in notifications.
    pub fn category(self) -> &'static str {
        match self {
            OverdueSeverity::Low => "Recently Overdue",
            OverdueSeverity::Medium => "Moderately Overdue",
            OverdueSeverity::High => "Seriously Overdue",
            OverdueSeverity::Critical => "Critically Overdue",
        }
    }

    pub fn recommended_action(self) -> &'static str {
        match self {
            OverdueSeverity::Low => "Send a friendly payment reminder",
            OverdueSeverity::Medium => "Send a formal payment request",
            OverdueSeverity::High => "Call the customer and send a final notice",
            OverdueSeverity::Critical => "Escalate to collections or legal action",
        }
    }
}

impl core::fmt::Display for OverdueSeverity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day thresholds for [`OverdueSeverity`] (inclusive upper bounds).
///
/// Independent of the aging bucket table: reminders escalate
/// within the first month, while reports bucket by 30-day periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverdueSeverityThresholds {
    pub low_max_days: u32,
    pub medium_max_days: u32,
    pub high_max_days: u32,
}

impl Default for OverdueSeverityThresholds {
    fn default() -> Self {
        Self {
            low_max_days: 7,
            medium_max_days: 30,
            high_max_days: 60,
        }
    }
}

impl OverdueSeverityThresholds {
    pub fn validate(&self) -> DomainResult<()> {
        if self.low_max_days < self.medium_max_days && self.medium_max_days < self.high_max_days {
            Ok(())
        } else {
            Err(DomainError::invariant(format!(
                "severity thresholds must be strictly increasing (low={}, medium={}, high={})",
                self.low_max_days, self.medium_max_days, self.high_max_days
            )))
        }
    }

    pub fn classify(&self, days_overdue: u32) -> OverdueSeverity {
        if days_overdue <= self.low_max_days {
            OverdueSeverity::Low
        } else if days_overdue <= self.medium_max_days {
            OverdueSeverity::Medium
        } else if days_overdue <= self.high_max_days {
            OverdueSeverity::High
        } else {
            OverdueSeverity::Critical
        }
    }
}

/// Weights for the 0–100 overdue risk score.
///
/// Age contributes linearly up to `age_weight` points at `age_horizon_days`;
/// the outstanding balance adds a tiered amount component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskScorePolicy {
    pub age_weight: f64,
    pub age_horizon_days: u32,
    /// Balances strictly above this get `large_balance_points` and, at HIGH
    /// severity, require immediate action.
    pub large_balance: Money,
    pub large_balance_points: f64,
    pub elevated_balance: Money,
    pub elevated_balance_points: f64,
    pub base_balance_points: f64,
}

impl Default for RiskScorePolicy {
    fn default() -> Self {
        Self {
            age_weight: 70.0,
            age_horizon_days: 90,
            large_balance: Money::new(10_000_000),
            large_balance_points: 30.0,
            elevated_balance: Money::new(5_000_000),
            elevated_balance_points: 20.0,
            base_balance_points: 10.0,
        }
    }
}

impl RiskScorePolicy {
    pub fn validate(&self) -> DomainResult<()> {
        if self.age_horizon_days == 0 {
            return Err(DomainError::invariant("age_horizon_days must be positive"));
        }
        let weights = [
            self.age_weight,
            self.large_balance_points,
            self.elevated_balance_points,
            self.base_balance_points,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::invariant(
                "risk score weights must be finite and non-negative",
            ));
        }
        if self.elevated_balance > self.large_balance {
            return Err(DomainError::invariant(
                "elevated_balance must not exceed large_balance",
            ));
        }
        Ok(())
    }

    pub fn is_large_balance(&self, balance: Money) -> bool {
        balance > self.large_balance
    }

    /// Age component + amount component, clamped to 100 and rounded.
    pub fn score(&self, days_overdue: u32, balance: Money) -> u8 {
        let horizon = f64::from(self.age_horizon_days.max(1));
        let age = (f64::from(days_overdue) / horizon * self.age_weight).min(self.age_weight);

        let amount = if balance > self.large_balance {
            self.large_balance_points
        } else if balance > self.elevated_balance {
            self.elevated_balance_points
        } else {
            self.base_balance_points
        };

        (age + amount).clamp(0.0, 100.0).round() as u8
    }
}

/// What the builder needs from an invoice.
///
/// `days_overdue` may be supplied precomputed; otherwise it is derived from
/// `due_date` and the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueInput {
    pub due_date: Option<NaiveDate>,
    pub balance_amount: Money,
    pub total_amount: Money,
    pub days_overdue: Option<u32>,
}

impl OverdueInput {
    pub fn with_days_overdue(mut self, days: u32) -> Self {
        self.days_overdue = Some(days);
        self
    }
}

impl From<&Invoice> for OverdueInput {
    fn from(invoice: &Invoice) -> Self {
        Self {
            due_date: invoice.due_date,
            balance_amount: invoice.balance_amount,
            total_amount: invoice.total_amount,
            days_overdue: None,
        }
    }
}

/// Derived, transient urgency assessment for one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueAssessment {
    pub days_overdue: u32,
    pub severity: OverdueSeverity,
    pub category: String,
    pub risk_score: u8,
    pub requires_immediate_action: bool,
    pub recommended_action: String,
}

/// Builds [`OverdueAssessment`]s and [`InvoiceOverdue`] events from invoices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverdueEventBuilder {
    thresholds: OverdueSeverityThresholds,
    score_policy: RiskScorePolicy,
}

impl OverdueEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(mut self, thresholds: OverdueSeverityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_score_policy(mut self, score_policy: RiskScorePolicy) -> Self {
        self.score_policy = score_policy;
        self
    }

    pub fn thresholds(&self) -> &OverdueSeverityThresholds {
        &self.thresholds
    }

    pub fn score_policy(&self) -> &RiskScorePolicy {
        &self.score_policy
    }

    pub fn assess(&self, input: &OverdueInput, reference: ReferenceDate) -> OverdueAssessment {
        let days = input
            .days_overdue
            .unwrap_or_else(|| days_overdue(input.due_date, reference));
        let severity = self.thresholds.classify(days);
        let balance = input.balance_amount;

        let requires_immediate_action = match severity {
            OverdueSeverity::Critical => true,
            OverdueSeverity::High => self.score_policy.is_large_balance(balance),
            _ => false,
        };

        OverdueAssessment {
            days_overdue: days,
            severity,
            category: severity.category().to_string(),
            risk_score: self.score_policy.score(days, balance),
            requires_immediate_action,
            recommended_action: severity.recommended_action().to_string(),
        }
    }

    pub fn assess_invoice(&self, invoice: &Invoice, reference: ReferenceDate) -> OverdueAssessment {
        self.assess(&OverdueInput::from(invoice), reference)
    }

    /// Notification payload for `invoice`, stamped with `occurred_at`.
    pub fn build_event(
        &self,
        invoice: &Invoice,
        reference: ReferenceDate,
        occurred_at: DateTime<Utc>,
    ) -> InvoiceOverdue {
        InvoiceOverdue {
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            due_date: invoice.due_date,
            total_amount: invoice.total_amount,
            balance_amount: invoice.balance_amount,
            reference_date: reference,
            assessment: self.assess_invoice(invoice, reference),
            occurred_at,
        }
    }
}

/// Assess `invoice` with the default thresholds and score policy.
pub fn build_overdue_assessment(invoice: &Invoice, reference: ReferenceDate) -> OverdueAssessment {
    OverdueEventBuilder::default().assess_invoice(invoice, reference)
}

/// Event: an invoice is overdue (assessment attached).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceOverdue {
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub due_date: Option<NaiveDate>,
    pub total_amount: Money,
    pub balance_amount: Money,
    pub reference_date: ReferenceDate,
    pub assessment: OverdueAssessment,
    pub occurred_at: DateTime<Utc>,
}

impl InvoiceOverdue {
    pub const SUBJECT_TYPE: &'static str = "invoicing.invoice";

    pub fn into_envelope(self, event_id: Uuid) -> EventEnvelope<Self> {
        let subject = *self.invoice_id.as_uuid();
        EventEnvelope::wrap(event_id, subject, Self::SUBJECT_TYPE, self)
    }
}

impl Event for InvoiceOverdue {
    fn event_type(&self) -> &'static str {
        "invoicing.invoice.overdue"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
