//! Repository ports for the storage collaborator, plus in-memory versions for
//! tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use receivables_core::CustomerId;
use receivables_core::InvoiceId;
use receivables_invoicing::Invoice;
use receivables_parties::Customer;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("failed to decode records: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read access to invoices.
pub trait InvoiceRepository: Send + Sync {
    fn list(&self) -> Result<Vec<Invoice>, RepositoryError>;

    fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Invoice>, RepositoryError>;
}

/// Customer records; `save` commits a changed risk level.
pub trait CustomerRepository: Send + Sync {
    fn get(&self, customer_id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    fn list(&self) -> Result<Vec<Customer>, RepositoryError>;

    fn save(&self, customer: &Customer) -> Result<(), RepositoryError>;
}

impl<R> InvoiceRepository for Arc<R>
where
    R: InvoiceRepository + ?Sized,
{
    fn list(&self) -> Result<Vec<Invoice>, RepositoryError> {
        (**self).list()
    }

    fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Invoice>, RepositoryError> {
        (**self).list_for_customer(customer_id)
    }
}

impl<R> CustomerRepository for Arc<R>
where
    R: CustomerRepository + ?Sized,
{
    fn get(&self, customer_id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        (**self).get(customer_id)
    }

    fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        (**self).list()
    }

    fn save(&self, customer: &Customer) -> Result<(), RepositoryError> {
        (**self).save(customer)
    }
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("lock poisoned".to_string())
}

/// In-memory invoice store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    inner: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of invoice records (storage export shape).
    pub fn from_json(json: &str) -> Result<Self, RepositoryError> {
        let invoices: Vec<Invoice> = serde_json::from_str(json)?;
        let repo = Self::new();
        for invoice in invoices {
            repo.upsert(invoice)?;
        }
        Ok(repo)
    }

    pub fn upsert(&self, invoice: Invoice) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.insert(invoice.id, invoice);
        Ok(())
    }
}

impl InvoiceRepository for InMemoryInvoiceRepository {
    fn list(&self) -> Result<Vec<Invoice>, RepositoryError> {
        let map = self.inner.read().map_err(poisoned)?;
        let mut invoices: Vec<Invoice> = map.values().cloned().collect();
        invoices.sort_by_key(|i| i.id);
        Ok(invoices)
    }

    fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Invoice>, RepositoryError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|i| i.customer_id == customer_id)
            .collect())
    }
}

/// In-memory customer store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    inner: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of customer records (storage export shape).
    pub fn from_json(json: &str) -> Result<Self, RepositoryError> {
        let customers: Vec<Customer> = serde_json::from_str(json)?;
        let repo = Self::new();
        for customer in &customers {
            repo.save(customer)?;
        }
        Ok(repo)
    }
}

impl CustomerRepository for InMemoryCustomerRepository {
    fn get(&self, customer_id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(&customer_id).cloned())
    }

    fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let map = self.inner.read().map_err(poisoned)?;
        let mut customers: Vec<Customer> = map.values().cloned().collect();
        customers.sort_by_key(|c| c.id);
        Ok(customers)
    }

    fn save(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.insert(customer.id, customer.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use receivables_core::Money;

    #[test]
    fn invoices_are_listed_per_customer() {
        let repo = InMemoryInvoiceRepository::new();
        let a = CustomerId::new();
        let b = CustomerId::new();
        repo.upsert(Invoice::new(a, None, Money::new(1))).unwrap();
        repo.upsert(Invoice::new(b, None, Money::new(2))).unwrap();
        repo.upsert(Invoice::new(a, None, Money::new(3))).unwrap();

        assert_eq!(repo.list().unwrap().len(), 3);
        assert_eq!(repo.list_for_customer(a).unwrap().len(), 2);
        assert!(repo.list_for_customer(CustomerId::new()).unwrap().is_empty());
    }

    #[test]
    fn save_replaces_existing_customer() {
        let repo = Arc::new(InMemoryCustomerRepository::new());
        let c = Customer::new(CustomerId::new(), "Acme", Utc::now());
        repo.save(&c).unwrap();
        repo.save(&c.clone().with_credit_limit(Money::new(10))).unwrap();

        let stored = repo.get(c.id).unwrap().unwrap();
        assert_eq!(stored.credit_limit, Money::new(10));
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn from_json_reports_decode_errors() {
        let err = InMemoryInvoiceRepository::from_json("[{]").unwrap_err();
        assert!(matches!(err, RepositoryError::Decode(_)));
    }
}
