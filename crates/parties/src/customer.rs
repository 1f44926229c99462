use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use receivables_core::{CustomerId, Entity, Money};

use crate::risk_level::RiskLevel;

/// Customer record as exchanged with the storage collaborator.
///
/// `credit_limit` accepts a raw number or an `{amount}` wrapper; zero (or a
/// missing value) means no limit is configured. `risk_level` and `updated_at`
/// are the only fields the risk evaluator writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "creditLimit")]
    pub credit_limit: Money,
    #[serde(default, alias = "riskLevel")]
    pub risk_level: RiskLevel,
    #[serde(alias = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            credit_limit: Money::ZERO,
            risk_level: RiskLevel::Normal,
            updated_at,
        }
    }

    pub fn with_credit_limit(mut self, credit_limit: Money) -> Self {
        self.credit_limit = credit_limit;
        self
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    /// Configured credit limit, if any.
    pub fn credit_limit(&self) -> Option<Money> {
        (!self.credit_limit.is_zero()).then_some(self.credit_limit)
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
