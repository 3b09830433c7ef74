//! Comparison operators for rule conditions.
//!
//! Operators are stored as SQL-flavoured text (`=`, `!=`, `IS NULL`, ...).
//! Parsing never fails: anything unrecognised becomes [`Operator::Unknown`],
//! which the evaluator treats as a non-match.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    NotEq,
    IsNull,
    IsNotNull,
    Unknown(String),
}

impl Operator {
    /// The operators accepted when authoring a condition, in display order.
    pub const KNOWN: [Operator; 4] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// Parse stored operator text. Case and surrounding/repeated whitespace
    /// are ignored; `<>` is an alias for `!=`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match normalized.as_str() {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            _ => Operator::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Unknown(raw) => raw,
        }
    }

    /// `=` and `!=` compare against a target value; the NULL checks do not.
    pub fn requires_value(&self) -> bool {
        matches!(self, Operator::Eq | Operator::NotEq)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Operator::Unknown(_))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Operator {
    fn from(raw: String) -> Self {
        Operator::parse(&raw)
    }
}

impl From<&str> for Operator {
    fn from(raw: &str) -> Self {
        Operator::parse(raw)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_and_space_insensitive() {
        assert_eq!(Operator::parse("="), Operator::Eq);
        assert_eq!(Operator::parse(" != "), Operator::NotEq);
        assert_eq!(Operator::parse("<>"), Operator::NotEq);
        assert_eq!(Operator::parse("is null"), Operator::IsNull);
        assert_eq!(Operator::parse("Is  Not   Null"), Operator::IsNotNull);
    }

    #[test]
    fn unknown_keeps_raw_text() {
        let op = Operator::parse("LIKE");
        assert_eq!(op, Operator::Unknown("LIKE".to_string()));
        assert_eq!(op.as_str(), "LIKE");
        assert!(!op.is_known());
        assert!(!op.requires_value());
    }

    #[test]
    fn only_comparisons_require_value() {
        assert!(Operator::Eq.requires_value());
        assert!(Operator::NotEq.requires_value());
        assert!(!Operator::IsNull.requires_value());
        assert!(!Operator::IsNotNull.requires_value());
    }

    #[test]
    fn serde_uses_canonical_text() {
        let json = serde_json::to_string(&Operator::parse("<>")).unwrap();
        assert_eq!(json, "\"!=\"");
        let back: Operator = serde_json::from_str("\"is not null\"").unwrap();
        assert_eq!(back, Operator::IsNotNull);
    }
}
