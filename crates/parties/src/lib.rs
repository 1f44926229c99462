//! Parties domain module: customers and their credit-risk classification.
//!
//! Pure, deterministic domain logic (no IO, no HTTP, no storage). The only
//! mutation is [`apply_risk_assessment`] writing to the `Customer` it is given;
//! committing that change is the caller's job.

pub mod customer;
pub mod risk;
pub mod risk_level;

pub use customer::Customer;
pub use risk::{
    RiskEvaluation, RiskEvaluator, RiskReason, RiskThresholds, apply_risk_assessment,
    evaluate_risk,
};
pub use risk_level::RiskLevel;
