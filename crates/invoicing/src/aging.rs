//! Aging calculator and aggregator.
//!
//! `days_overdue` is the single formula every consumer (aging report, risk
//! evaluation, overdue notifications) uses to measure how late an invoice is.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use receivables_core::{
    CustomerId, DomainError, DomainResult, InvoiceId, Money, ReferenceDate, ValueObject,
};

use crate::invoice::Invoice;

/// Whole days between `due_date` and `reference`, floored at zero.
///
/// A missing due date, or one on/after the reference day, yields 0.
pub fn days_overdue(due_date: Option<NaiveDate>, reference: ReferenceDate) -> u32 {
    let Some(due) = due_date else {
        return 0;
    };
    let days = reference.date().signed_duration_since(due).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// One aging bracket. `max_days == None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingBucket {
    pub label: String,
    pub max_days: Option<u32>,
}

impl ValueObject for AgingBucket {}

impl AgingBucket {
    pub fn bounded(label: impl Into<String>, max_days: u32) -> Self {
        Self {
            label: label.into(),
            max_days: Some(max_days),
        }
    }

    pub fn unbounded(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            max_days: None,
        }
    }

    pub fn contains(&self, days_overdue: u32) -> bool {
        self.max_days.is_none_or(|max| days_overdue <= max)
    }
}

/// Ordered aging bucket definition used for reporting.
///
/// Invariants (checked on construction and deserialization):
/// - at least one bucket, labels non-empty and unique
/// - bounded buckets strictly increasing in `max_days`
/// - exactly one unbounded bucket, and it is last
///
/// These brackets are for reporting. Notification urgency uses
/// [`crate::OverdueSeverityThresholds`], which is finer-grained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AgingBucket>", into = "Vec<AgingBucket>")]
pub struct AgingBucketTable {
    bounded: Vec<AgingBucket>,
    overflow: AgingBucket,
}

impl ValueObject for AgingBucketTable {}

impl AgingBucketTable {
    pub fn new(buckets: Vec<AgingBucket>) -> DomainResult<Self> {
        let mut buckets = buckets;
        let overflow = buckets
            .pop()
            .ok_or_else(|| DomainError::invariant("aging bucket table must not be empty"))?;
        if overflow.max_days.is_some() {
            return Err(DomainError::invariant(format!(
                "last aging bucket '{}' must be unbounded",
                overflow.label
            )));
        }

        let mut seen = HashSet::new();
        let mut previous: Option<u32> = None;
        for bucket in buckets.iter().chain(core::iter::once(&overflow)) {
            if bucket.label.trim().is_empty() {
                return Err(DomainError::invariant("aging bucket label must not be empty"));
            }
            if !seen.insert(bucket.label.as_str()) {
                return Err(DomainError::invariant(format!(
                    "duplicate aging bucket label '{}'",
                    bucket.label
                )));
            }
        }
        for bucket in &buckets {
            let Some(max) = bucket.max_days else {
                return Err(DomainError::invariant(format!(
                    "only the last aging bucket may be unbounded (found '{}')",
                    bucket.label
                )));
            };
            if previous.is_some_and(|p| max <= p) {
                return Err(DomainError::invariant(format!(
                    "aging bucket '{}' must have max_days greater than the previous bucket",
                    bucket.label
                )));
            }
            previous = Some(max);
        }

        Ok(Self {
            bounded: buckets,
            overflow,
        })
    }

    /// Canonical reporting table: 0-30, 31-60, 61-90, >90.
    pub fn standard() -> Self {
        Self {
            bounded: vec![
                AgingBucket::bounded("0-30", 30),
                AgingBucket::bounded("31-60", 60),
                AgingBucket::bounded("61-90", 90),
            ],
            overflow: AgingBucket::unbounded(">90"),
        }
    }

    /// Alternative layout separating not-yet-due invoices: CURRENT, 1-30,
    /// 31-60, 61-90, 90+.
    pub fn with_current() -> Self {
        Self {
            bounded: vec![
                AgingBucket::bounded("CURRENT", 0),
                AgingBucket::bounded("1-30", 30),
                AgingBucket::bounded("31-60", 60),
                AgingBucket::bounded("61-90", 90),
            ],
            overflow: AgingBucket::unbounded("90+"),
        }
    }

    /// Buckets in ascending order, unbounded bucket last.
    pub fn buckets(&self) -> impl Iterator<Item = &AgingBucket> {
        self.bounded.iter().chain(core::iter::once(&self.overflow))
    }

    pub fn len(&self) -> usize {
        self.bounded.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// First bucket whose `max_days >= days_overdue`; the unbounded bucket
    /// otherwise.
    pub fn bucket_for(&self, days_overdue: u32) -> &AgingBucket {
        self.bounded
            .iter()
            .find(|b| b.contains(days_overdue))
            .unwrap_or(&self.overflow)
    }
}

impl Default for AgingBucketTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<AgingBucket>> for AgingBucketTable {
    type Error = DomainError;

    fn try_from(value: Vec<AgingBucket>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AgingBucketTable> for Vec<AgingBucket> {
    fn from(value: AgingBucketTable) -> Self {
        let mut buckets = value.bounded;
        buckets.push(value.overflow);
        buckets
    }
}

/// Label of the bucket `invoice` falls into on `reference`.
pub fn bucketize<'t>(
    invoice: &Invoice,
    table: &'t AgingBucketTable,
    reference: ReferenceDate,
) -> &'t str {
    &table.bucket_for(invoice.days_overdue(reference)).label
}

/// Invoice line inside an aging bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgedInvoice {
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub due_date: Option<NaiveDate>,
    pub days_overdue: u32,
    pub balance_amount: Money,
}

/// Totals for one aging bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingBucketSummary {
    pub label: String,
    pub max_days: Option<u32>,
    pub invoices: Vec<AgedInvoice>,
    pub count: usize,
    /// Sum of outstanding balances (not invoice totals).
    pub total_amount: Money,
}

impl AgingBucketSummary {
    fn empty(bucket: &AgingBucket) -> Self {
        Self {
            label: bucket.label.clone(),
            max_days: bucket.max_days,
            invoices: Vec::new(),
            count: 0,
            total_amount: Money::ZERO,
        }
    }

    fn push(&mut self, line: AgedInvoice) {
        self.count += 1;
        self.total_amount = self.total_amount + line.balance_amount;
        self.invoices.push(line);
    }
}

/// Aging report: every configured bucket, in table order, even when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingReport {
    pub reference_date: ReferenceDate,
    pub buckets: Vec<AgingBucketSummary>,
}

impl AgingReport {
    pub fn bucket(&self, label: &str) -> Option<&AgingBucketSummary> {
        self.buckets.iter().find(|b| b.label == label)
    }

    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn total_amount(&self) -> Money {
        self.buckets.iter().map(|b| b.total_amount).sum()
    }

    /// Oldest invoice in the report, in days past due (0 when empty).
    pub fn max_days_overdue(&self) -> u32 {
        self.buckets
            .iter()
            .flat_map(|b| b.invoices.iter())
            .map(|i| i.days_overdue)
            .max()
            .unwrap_or(0)
    }
}

/// Group `invoices` into the buckets of `table` as of `reference`.
///
/// Invoices are taken as given: filtering by status is the caller's job
/// (see [`crate::InvoiceFilter`]).
pub fn aggregate<'a, I>(invoices: I, table: &AgingBucketTable, reference: ReferenceDate) -> AgingReport
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut buckets: Vec<AgingBucketSummary> =
        table.buckets().map(AgingBucketSummary::empty).collect();
    let overflow_index = buckets.len() - 1;

    for invoice in invoices {
        let days = invoice.days_overdue(reference);
        let index = table
            .buckets()
            .position(|b| b.contains(days))
            .unwrap_or(overflow_index);
        buckets[index].push(AgedInvoice {
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            due_date: invoice.due_date,
            days_overdue: days,
            balance_amount: invoice.balance_amount,
        });
    }

    AgingReport {
        reference_date: reference,
        buckets,
    }
}

/// One aging report per customer, keyed by customer id.
pub fn aging_by_customer<'a, I>(
    invoices: I,
    table: &AgingBucketTable,
    reference: ReferenceDate,
) -> BTreeMap<CustomerId, AgingReport>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut grouped: BTreeMap<CustomerId, Vec<&Invoice>> = BTreeMap::new();
    for invoice in invoices {
        grouped.entry(invoice.customer_id).or_default().push(invoice);
    }

    grouped
        .into_iter()
        .map(|(customer_id, invs)| (customer_id, aggregate(invs, table, reference)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference(y: i32, m: u32, d: u32) -> ReferenceDate {
        ReferenceDate::new(date(y, m, d))
    }

    fn invoice_due(due: Option<NaiveDate>, balance: u64) -> Invoice {
        Invoice::new(CustomerId::new(), due, Money::new(balance))
    }

    #[test]
    fn days_overdue_counts_whole_days() {
        assert_eq!(days_overdue(Some(date(2025, 1, 1)), reference(2025, 1, 31)), 30);
        assert_eq!(days_overdue(Some(date(2024, 10, 1)), reference(2025, 1, 31)), 122);
    }

    #[test]
    fn days_overdue_is_zero_on_due_date_future_or_missing() {
        let r = reference(2025, 1, 31);
        assert_eq!(days_overdue(Some(date(2025, 1, 31)), r), 0);
        assert_eq!(days_overdue(Some(date(2025, 3, 1)), r), 0);
        assert_eq!(days_overdue(None, r), 0);
    }

    #[test]
    fn invoice_due_today_lands_in_first_bucket() {
        let table = AgingBucketTable::standard();
        let inv = invoice_due(Some(date(2025, 1, 31)), 100);
        assert_eq!(bucketize(&inv, &table, reference(2025, 1, 31)), "0-30");

        let table = AgingBucketTable::with_current();
        assert_eq!(bucketize(&inv, &table, reference(2025, 1, 31)), "CURRENT");
    }

    #[test]
    fn bucket_boundaries_are_inclusive() {
        let table = AgingBucketTable::standard();
        let labels: Vec<&str> = [0, 30, 31, 60, 61, 90, 91, 400]
            .into_iter()
            .map(|d| table.bucket_for(d).label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["0-30", "0-30", "31-60", "31-60", "61-90", "61-90", ">90", ">90"]
        );
    }

    #[test]
    fn scenario_thirty_days_falls_in_first_bucket() {
        let table = AgingBucketTable::standard();
        let inv = invoice_due(Some(date(2025, 1, 1)), 20_000_000);
        assert_eq!(inv.days_overdue(reference(2025, 1, 31)), 30);
        assert_eq!(bucketize(&inv, &table, reference(2025, 1, 31)), "0-30");
    }

    #[test]
    fn aggregate_includes_empty_buckets_and_sums_balances() {
        let table = AgingBucketTable::standard();
        let r = reference(2025, 1, 31);
        let invoices = vec![
            invoice_due(Some(date(2025, 1, 20)), 1_000).with_balance(Money::new(400)),
            invoice_due(Some(date(2024, 10, 1)), 5_000),
        ];

        let report = aggregate(&invoices, &table, r);

        let labels: Vec<&str> = report.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["0-30", "31-60", "61-90", ">90"]);

        let current = report.bucket("0-30").unwrap();
        assert_eq!(current.count, 1);
        assert_eq!(current.total_amount, Money::new(400));

        let empty = report.bucket("31-60").unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.total_amount, Money::ZERO);
        assert!(empty.invoices.is_empty());

        let oldest = report.bucket(">90").unwrap();
        assert_eq!(oldest.invoices[0].days_overdue, 122);
        assert_eq!(report.max_days_overdue(), 122);
        assert_eq!(report.total_amount(), Money::new(5_400));
    }

    #[test]
    fn aggregate_of_nothing_still_lists_every_bucket() {
        let table = AgingBucketTable::with_current();
        let report = aggregate(&Vec::<Invoice>::new(), &table, reference(2025, 1, 31));
        assert_eq!(report.buckets.len(), 5);
        assert_eq!(report.total_count(), 0);
        assert_eq!(report.max_days_overdue(), 0);
    }

    #[test]
    fn aging_by_customer_groups_before_bucketing() {
        let table = AgingBucketTable::standard();
        let a = CustomerId::new();
        let b = CustomerId::new();
        let due = Some(date(2025, 1, 1));
        let invoices = vec![
            Invoice::new(a, due, Money::new(10)),
            Invoice::new(b, due, Money::new(20)),
            Invoice::new(a, due, Money::new(30)),
        ];

        let per_customer = aging_by_customer(&invoices, &table, reference(2025, 1, 31));
        assert_eq!(per_customer.len(), 2);
        assert_eq!(per_customer[&a].total_count(), 2);
        assert_eq!(per_customer[&a].total_amount(), Money::new(40));
        assert_eq!(per_customer[&b].total_amount(), Money::new(20));
    }

    #[test]
    fn table_rejects_malformed_definitions() {
        let cases = vec![
            vec![],
            vec![AgingBucket::bounded("0-30", 30)],
            vec![
                AgingBucket::bounded("0-60", 60),
                AgingBucket::bounded("0-30", 30),
                AgingBucket::unbounded("rest"),
            ],
            vec![
                AgingBucket::unbounded("all"),
                AgingBucket::unbounded("rest"),
            ],
            vec![
                AgingBucket::bounded("x", 30),
                AgingBucket::unbounded("x"),
            ],
            vec![AgingBucket::unbounded("  ")],
        ];

        for buckets in cases {
            match AgingBucketTable::new(buckets.clone()) {
                Err(DomainError::InvariantViolation(_)) => {}
                other => panic!("Expected invariant violation for {buckets:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn table_deserializes_with_validation() {
        let table: AgingBucketTable = serde_json::from_str(
            r#"[{"label": "0-45", "max_days": 45}, {"label": "45+", "max_days": null}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.bucket_for(46).label, "45+");

        let err = serde_json::from_str::<AgingBucketTable>(
            r#"[{"label": "0-45", "max_days": 45}]"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn presets_pass_validation() {
        for table in [AgingBucketTable::standard(), AgingBucketTable::with_current()] {
            let rebuilt = AgingBucketTable::new(table.buckets().cloned().collect()).unwrap();
            assert_eq!(rebuilt, table);
        }
    }

    fn arb_invoice() -> impl Strategy<Value = Invoice> {
        (prop::option::of(-400i64..400i64), 0u64..50_000_000u64).prop_map(|(offset, balance)| {
            let due = offset.map(|o| date(2025, 1, 31) + chrono::Duration::days(o));
            invoice_due(due, balance)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no invoice is dropped or double-counted by aggregation.
        #[test]
        fn aggregation_conserves_count_and_amount(
            invoices in prop::collection::vec(arb_invoice(), 0..50),
            use_current in any::<bool>(),
        ) {
            let table = if use_current {
                AgingBucketTable::with_current()
            } else {
                AgingBucketTable::standard()
            };
            let report = aggregate(&invoices, &table, reference(2025, 1, 31));

            let expected_amount: Money = invoices.iter().map(|i| i.balance_amount).sum();
            prop_assert_eq!(report.total_count(), invoices.len());
            prop_assert_eq!(report.total_amount(), expected_amount);
            prop_assert_eq!(report.buckets.len(), table.len());
        }

        /// Property: aging never decreases as the reference date advances.
        #[test]
        fn days_overdue_is_monotonic(
            due_offset in -1000i64..1000i64,
            start in -1000i64..1000i64,
            step in 0i64..1000i64,
        ) {
            let base = date(2025, 1, 31);
            let due = Some(base + chrono::Duration::days(due_offset));
            let earlier = ReferenceDate::new(base + chrono::Duration::days(start));
            let later = ReferenceDate::new(base + chrono::Duration::days(start + step));
            prop_assert!(days_overdue(due, earlier) <= days_overdue(due, later));
        }

        /// Property: future due dates are never overdue.
        #[test]
        fn future_due_dates_are_not_overdue(ahead in 0i64..5000i64) {
            let r = reference(2025, 1, 31);
            let due = Some(r.date() + chrono::Duration::days(ahead));
            prop_assert_eq!(days_overdue(due, r), 0);
        }
    }
}
