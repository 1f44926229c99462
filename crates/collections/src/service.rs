//! Receivables use cases: aging reports, risk refresh and overdue reminders.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use receivables_core::{Clock, CustomerId, Money, ReferenceDate};
use receivables_events::EventEnvelope;
use receivables_invoicing::{
    AgingReport, Invoice, InvoiceOverdue, OverdueEventBuilder, OverdueSeverity, aggregate,
    aging_by_customer,
};
use receivables_parties::{Customer, RiskEvaluation, RiskEvaluator, RiskLevel};

use crate::config::ReceivablesConfig;
use crate::repository::{CustomerRepository, InvoiceRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum CollectionsError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),
}

/// A customer whose stored risk level was updated (and saved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskChange {
    pub customer_id: CustomerId,
    pub previous: RiskLevel,
    pub current: RiskLevel,
    pub evaluation: RiskEvaluation,
}

/// Everything a reminder job needs to contact one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderCandidate {
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
    /// Sorted most urgent first.
    pub invoices: Vec<InvoiceOverdue>,
    /// Frames the message: the worst invoice decides the tone.
    pub most_severe: OverdueSeverity,
    pub highest_risk_score: u8,
    pub total_overdue: Money,
    pub requires_immediate_action: bool,
}

/// Application service over the repositories and the engines.
///
/// Generic over the storage collaborators and the clock so tests can pin
/// "now" and swap in in-memory stores.
pub struct ReceivablesService<I, C, K>
where
    I: InvoiceRepository,
    C: CustomerRepository,
    K: Clock,
{
    invoices: I,
    customers: C,
    clock: K,
    config: ReceivablesConfig,
    overdue: OverdueEventBuilder,
    risk: RiskEvaluator,
}

impl<I, C, K> ReceivablesService<I, C, K>
where
    I: InvoiceRepository,
    C: CustomerRepository,
    K: Clock,
{
    pub fn new(invoices: I, customers: C, clock: K, config: ReceivablesConfig) -> Self {
        let overdue = config.overdue_builder();
        let risk = config.risk_evaluator();
        Self {
            invoices,
            customers,
            clock,
            config,
            overdue,
            risk,
        }
    }

    pub fn config(&self) -> &ReceivablesConfig {
        &self.config
    }

    fn select<'a>(&self, invoices: &'a [Invoice], reference: ReferenceDate) -> Vec<&'a Invoice> {
        let selected = self.config.invoice_filter.apply(invoices, reference);
        for invoice in &selected {
            if let Err(err) = invoice.ensure_consistent() {
                tracing::warn!(invoice_id = %invoice.id, error = %err, "inconsistent invoice record");
            }
        }
        selected
    }

    /// Aging report for today.
    pub fn aging_report(&self) -> Result<AgingReport, CollectionsError> {
        self.aging_report_as_of(self.clock.today())
    }

    /// Aging report for an explicit day (reproducible, e.g. month-end).
    pub fn aging_report_as_of(&self, reference: ReferenceDate) -> Result<AgingReport, CollectionsError> {
        let invoices = self.invoices.list()?;
        let selected = self.select(&invoices, reference);
        let report = aggregate(selected, &self.config.aging_buckets, reference);

        tracing::info!(
            reference_date = %reference,
            invoices = report.total_count(),
            outstanding = %report.total_amount(),
            "aging report built"
        );
        Ok(report)
    }

    /// One aging report per customer, for today.
    pub fn customer_aging(&self) -> Result<BTreeMap<CustomerId, AgingReport>, CollectionsError> {
        let reference = self.clock.today();
        let invoices = self.invoices.list()?;
        let selected = self.select(&invoices, reference);
        Ok(aging_by_customer(selected, &self.config.aging_buckets, reference))
    }

    /// Current risk evaluation for one customer, without writing anything.
    pub fn evaluate_customer(&self, customer_id: CustomerId) -> Result<RiskEvaluation, CollectionsError> {
        let customer = self
            .customers
            .get(customer_id)?
            .ok_or(CollectionsError::CustomerNotFound(customer_id))?;
        let reference = self.clock.today();
        let invoices = self.invoices.list_for_customer(customer_id)?;
        let selected = self.select(&invoices, reference);
        Ok(self.risk.evaluate(&customer, selected, reference))
    }

    /// Re-evaluate one customer and save it if the level changed.
    pub fn refresh_customer_risk(&self, customer_id: CustomerId) -> Result<Option<RiskChange>, CollectionsError> {
        let mut customer = self
            .customers
            .get(customer_id)?
            .ok_or(CollectionsError::CustomerNotFound(customer_id))?;
        let invoices = self.invoices.list_for_customer(customer_id)?;
        self.refresh(&mut customer, &invoices)
    }

    /// Re-evaluate every customer; returns the ones that changed.
    pub fn refresh_all_risk_levels(&self) -> Result<Vec<RiskChange>, CollectionsError> {
        let mut by_customer: HashMap<CustomerId, Vec<Invoice>> = HashMap::new();
        for invoice in self.invoices.list()? {
            by_customer.entry(invoice.customer_id).or_default().push(invoice);
        }

        let customers = self.customers.list()?;
        let evaluated = customers.len();
        let mut changes = Vec::new();
        for mut customer in customers {
            let invoices = by_customer.remove(&customer.id).unwrap_or_default();
            if let Some(change) = self.refresh(&mut customer, &invoices)? {
                changes.push(change);
            }
        }

        tracing::info!(evaluated, changed = changes.len(), "customer risk levels refreshed");
        Ok(changes)
    }

    fn refresh(
        &self,
        customer: &mut Customer,
        invoices: &[Invoice],
    ) -> Result<Option<RiskChange>, CollectionsError> {
        let now = self.clock.now();
        let reference = ReferenceDate::from_datetime(now);
        let selected = self.select(invoices, reference);
        let evaluation = self.risk.evaluate(customer, selected, reference);

        let previous = customer.risk_level;
        if !RiskEvaluator::apply_evaluation(customer, &evaluation, now) {
            return Ok(None);
        }
        self.customers.save(customer)?;

        tracing::info!(
            customer_id = %customer.id,
            from = %previous,
            to = %customer.risk_level,
            total_debt = %evaluation.total_debt,
            max_overdue_days = evaluation.max_overdue_days,
            "customer risk level updated"
        );
        Ok(Some(RiskChange {
            customer_id: customer.id,
            previous,
            current: customer.risk_level,
            evaluation,
        }))
    }

    /// Overdue notifications for every selected invoice at least one day late,
    /// highest risk score first.
    pub fn overdue_alerts(&self) -> Result<Vec<InvoiceOverdue>, CollectionsError> {
        let now = self.clock.now();
        let reference = ReferenceDate::from_datetime(now);
        let invoices = self.invoices.list()?;

        let mut alerts: Vec<InvoiceOverdue> = self
            .select(&invoices, reference)
            .into_iter()
            .filter(|inv| inv.days_overdue(reference) > 0)
            .map(|inv| self.overdue.build_event(inv, reference, now))
            .collect();
        sort_by_urgency(&mut alerts);

        let immediate = alerts
            .iter()
            .filter(|a| a.assessment.requires_immediate_action)
            .count();
        tracing::info!(alerts = alerts.len(), immediate, "overdue alerts generated");
        Ok(alerts)
    }

    /// [`Self::overdue_alerts`] wrapped for a notification channel, one fresh
    /// event id each.
    pub fn overdue_notifications(&self) -> Result<Vec<EventEnvelope<InvoiceOverdue>>, CollectionsError> {
        Ok(self
            .overdue_alerts()?
            .into_iter()
            .map(|alert| alert.into_envelope(Uuid::now_v7()))
            .collect())
    }

    /// Overdue alerts grouped per customer, most urgent customer first.
    pub fn reminder_candidates(&self) -> Result<Vec<ReminderCandidate>, CollectionsError> {
        let mut grouped: BTreeMap<CustomerId, Vec<InvoiceOverdue>> = BTreeMap::new();
        for alert in self.overdue_alerts()? {
            grouped.entry(alert.customer_id).or_default().push(alert);
        }

        let mut candidates = Vec::with_capacity(grouped.len());
        for (customer_id, invoices) in grouped {
            let customer_name = match self.customers.get(customer_id)? {
                Some(c) => Some(c.name),
                None => {
                    tracing::warn!(%customer_id, "overdue invoices for unknown customer");
                    None
                }
            };
            // Non-empty by construction; alerts stay sorted within the group.
            let most_severe = invoices
                .iter()
                .map(|a| a.assessment.severity)
                .max()
                .unwrap_or(OverdueSeverity::Low);
            let highest_risk_score = invoices
                .iter()
                .map(|a| a.assessment.risk_score)
                .max()
                .unwrap_or(0);
            let total_overdue = invoices.iter().map(|a| a.balance_amount).sum();
            let requires_immediate_action = invoices
                .iter()
                .any(|a| a.assessment.requires_immediate_action);

            candidates.push(ReminderCandidate {
                customer_id,
                customer_name,
                invoices,
                most_severe,
                highest_risk_score,
                total_overdue,
                requires_immediate_action,
            });
        }

        candidates.sort_by(|a, b| {
            b.highest_risk_score
                .cmp(&a.highest_risk_score)
                .then(b.most_severe.cmp(&a.most_severe))
                .then(b.total_overdue.cmp(&a.total_overdue))
        });
        Ok(candidates)
    }
}

fn sort_by_urgency(alerts: &mut [InvoiceOverdue]) {
    alerts.sort_by(|a, b| {
        b.assessment
            .risk_score
            .cmp(&a.assessment.risk_score)
            .then(b.assessment.days_overdue.cmp(&a.assessment.days_overdue))
            .then(a.invoice_id.cmp(&b.invoice_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDate, TimeZone, Utc};
    use receivables_core::FixedClock;
    use receivables_invoicing::InvoiceStatus;

    use crate::repository::{InMemoryCustomerRepository, InMemoryInvoiceRepository};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn inconsistency_warnings_only_cover_selected_invoices() {
        let customer = CustomerId::new();
        let due = NaiveDate::from_ymd_opt(2025, 1, 1);
        let over_balance = |status| {
            Invoice::new(customer, due, Money::new(100))
                .with_balance(Money::new(150))
                .with_status(status)
        };
        let paid = over_balance(InvoiceStatus::Paid);
        let cancelled = over_balance(InvoiceStatus::Cancelled);
        let pending = over_balance(InvoiceStatus::Pending);

        let invoices = InMemoryInvoiceRepository::new();
        for inv in [&paid, &cancelled, &pending] {
            invoices.upsert(inv.clone()).unwrap();
        }
        let svc = ReceivablesService::new(
            invoices,
            InMemoryCustomerRepository::new(),
            FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 31, 8, 0, 0).unwrap()),
            ReceivablesConfig::default(),
        );

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let report = tracing::subscriber::with_default(subscriber, || svc.aging_report().unwrap());

        assert_eq!(report.total_count(), 1);
        let logs = captured.text();
        assert_eq!(logs.matches("inconsistent invoice record").count(), 1, "{logs}");
        assert!(logs.contains(&pending.id.to_string()));
        assert!(!logs.contains(&paid.id.to_string()));
        assert!(!logs.contains(&cancelled.id.to_string()));
    }
}
