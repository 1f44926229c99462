//! `receivables-collections`: application layer over the aging and risk engines.
//!
//! This is the caller the engines expect: it loads invoices and customers from
//! repository ports, picks which invoices count ([`InvoiceFilter`]), resolves
//! "now" through a [`Clock`], and hands results back for persistence, reporting
//! or reminder automation.
//!
//! [`InvoiceFilter`]: receivables_invoicing::InvoiceFilter
//! [`Clock`]: receivables_core::Clock

pub mod config;
pub mod repository;
pub mod service;

pub use config::{ConfigError, ReceivablesConfig};
pub use repository::{
    CustomerRepository, InMemoryCustomerRepository, InMemoryInvoiceRepository, InvoiceRepository,
    RepositoryError,
};
pub use service::{CollectionsError, ReceivablesService, ReminderCandidate, RiskChange};
