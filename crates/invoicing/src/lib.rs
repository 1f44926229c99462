//! Invoicing domain module: invoice records plus the aging and overdue engines.
//!
//! This crate contains business rules for accounts receivable aging,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage,
//! no system clock).

pub mod aging;
pub mod invoice;
pub mod overdue;

pub use aging::{
    AgedInvoice, AgingBucket, AgingBucketSummary, AgingBucketTable, AgingReport, aggregate,
    aging_by_customer, bucketize, days_overdue,
};
pub use invoice::{Invoice, InvoiceFilter, InvoiceStatus};
pub use overdue::{
    InvoiceOverdue, OverdueAssessment, OverdueEventBuilder, OverdueInput, OverdueSeverity,
    OverdueSeverityThresholds, RiskScorePolicy, build_overdue_assessment,
};
