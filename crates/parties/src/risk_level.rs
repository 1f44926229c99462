use core::str::FromStr;

use serde::{Deserialize, Serialize};

use receivables_core::{DomainError, ValueObject};

/// Customer-level credit risk classification.
///
/// Closed set; the only way to build one from text is [`FromStr`] (or serde),
/// which rejects anything other than `NORMAL`, `WARNING` or `HIGH_RISK`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum RiskLevel {
    #[default]
    Normal,
    Warning,
    HighRisk,
}

impl ValueObject for RiskLevel {}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Normal, RiskLevel::Warning, RiskLevel::HighRisk];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Normal => "NORMAL",
            RiskLevel::Warning => "WARNING",
            RiskLevel::HighRisk => "HIGH_RISK",
        }
    }
}

impl core::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("invalid risk level: {s:?}")))
    }
}

impl TryFrom<String> for RiskLevel {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RiskLevel> for &'static str {
    fn from(value: RiskLevel) -> Self {
        value.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_level_from_its_text() {
        for level in RiskLevel::ALL {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
            assert_eq!(level.to_string(), level.as_str());
        }
    }

    #[test]
    fn rejects_anything_outside_the_closed_set() {
        for bad in ["", "normal", "HIGH", "CRITICAL", " NORMAL"] {
            match bad.parse::<RiskLevel>() {
                Err(DomainError::Validation(msg)) if msg.contains("invalid risk level") => {}
                other => panic!("Expected Validation error for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn serde_uses_the_same_mapping() {
        assert_eq!(serde_json::to_string(&RiskLevel::HighRisk).unwrap(), r#""HIGH_RISK""#);
        assert_eq!(
            serde_json::from_str::<RiskLevel>(r#""WARNING""#).unwrap(),
            RiskLevel::Warning
        );
        assert!(serde_json::from_str::<RiskLevel>(r#""SEVERE""#).is_err());
    }

    #[test]
    fn equality_is_by_value() {
        let a: RiskLevel = "WARNING".parse().unwrap();
        let b: RiskLevel = "WARNING".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, RiskLevel::Normal);
    }
}
