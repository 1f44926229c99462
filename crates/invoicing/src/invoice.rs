use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use receivables_core::{
    CustomerId, DomainError, DomainResult, Entity, InvoiceId, Money, ReferenceDate,
};

use crate::aging::days_overdue;

/// Invoice status lifecycle (as stored by the invoicing back office).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Paid and cancelled invoices carry no exposure.
    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Issued and not yet settled or cancelled.
    pub fn is_outstanding(self) -> bool {
        matches!(
            self,
            InvoiceStatus::Pending | InvoiceStatus::Partial | InvoiceStatus::Overdue
        )
    }
}

/// Read-only invoice record handed to the engine by the storage collaborator.
///
/// `balance_amount` is the amount at risk. Amount fields accept every money
/// shape [`Money`] understands, and `due_date` accepts either a plain date or
/// a timestamp (the time-of-day is dropped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(alias = "customerId")]
    pub customer_id: CustomerId,
    #[serde(default, alias = "dueDate", deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, alias = "totalAmount")]
    pub total_amount: Money,
    #[serde(default, alias = "balanceAmount")]
    pub balance_amount: Money,
    pub status: InvoiceStatus,
}

impl Invoice {
    /// A freshly issued, unpaid invoice.
    pub fn new(customer_id: CustomerId, due_date: Option<NaiveDate>, total_amount: Money) -> Self {
        Self {
            id: InvoiceId::new(),
            customer_id,
            due_date,
            total_amount,
            balance_amount: total_amount,
            status: InvoiceStatus::Pending,
        }
    }

    pub fn with_id(mut self, id: InvoiceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_balance(mut self, balance_amount: Money) -> Self {
        self.balance_amount = balance_amount;
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }

    /// Whole days past due on `reference`, floored at zero.
    pub fn days_overdue(&self, reference: ReferenceDate) -> u32 {
        days_overdue(self.due_date, reference)
    }

    /// Strict check for callers that want to reject inconsistent records.
    ///
    /// The engine itself never calls this; it works on whatever it is given.
    pub fn ensure_consistent(&self) -> DomainResult<()> {
        if self.balance_amount > self.total_amount {
            return Err(DomainError::invariant(format!(
                "invoice {}: balance {} exceeds total {}",
                self.id, self.balance_amount, self.total_amount
            )));
        }
        Ok(())
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Which invoices a use case feeds into the aging and risk engines.
///
/// The engine functions take exactly the invoices they are given; selecting
/// them is the caller's job, and this makes that selection explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceFilter {
    /// Every invoice, regardless of status.
    All,
    /// Pending, partially paid or overdue invoices (no drafts, paid or cancelled).
    #[default]
    Outstanding,
    /// Outstanding invoices that are at least one day past due.
    Overdue,
}

impl InvoiceFilter {
    pub fn admits(self, invoice: &Invoice, reference: ReferenceDate) -> bool {
        match self {
            InvoiceFilter::All => true,
            InvoiceFilter::Outstanding => invoice.status.is_outstanding(),
            InvoiceFilter::Overdue => {
                invoice.status.is_outstanding() && invoice.days_overdue(reference) > 0
            }
        }
    }

    pub fn apply<'a, I>(self, invoices: I, reference: ReferenceDate) -> Vec<&'a Invoice>
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        invoices
            .into_iter()
            .filter(|inv| self.admits(inv, reference))
            .collect()
    }
}

impl core::str::FromStr for InvoiceFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(InvoiceFilter::All),
            "outstanding" => Ok(InvoiceFilter::Outstanding),
            "overdue" => Ok(InvoiceFilter::Overdue),
            other => Err(DomainError::validation(format!(
                "unknown invoice filter: {other}"
            ))),
        }
    }
}

/// Raw `due_date` as it arrives from storage.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Text(String),
    Other(IgnoredAny),
}

/// Accepts `null`, `"2025-01-31"`, an RFC 3339 timestamp or a naive timestamp
/// (`T` or space separated). Timestamps keep the calendar day as written; the
/// offset is not applied. Anything else, including non-string values, is
/// treated as a missing date.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawDate>::deserialize(deserializer)? {
        Some(RawDate::Text(s)) => parse_date(s.trim()),
        Some(RawDate::Other(_)) | None => None,
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .into_iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}
