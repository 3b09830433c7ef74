//! Identifier aliases and the preference snapshot shared by every crate.

use std::collections::HashMap;

pub type CategoryId = i64;
pub type SubcategoryId = i64;
pub type NodeId = i64;
pub type ValueId = i64;
pub type RuleId = i64;
pub type ConditionId = i64;

/// A user's selections for one data source: pillar node → chosen value.
///
/// Nodes without a stored selection are absent from the map.
pub type PreferenceMap = HashMap<NodeId, ValueId>;

/// Trim a user-supplied name, returning `None` when nothing is left.
pub fn clean_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Optional free text is stored as NULL when blank.
pub fn clean_optional(raw: Option<&str>) -> Option<String> {
    raw.and_then(clean_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_name_trims() {
        assert_eq!(clean_name("  Source Format "), Some("Source Format".to_string()));
        assert_eq!(clean_name("   "), None);
        assert_eq!(clean_name(""), None);
    }

    #[test]
    fn clean_optional_blank_is_none() {
        assert_eq!(clean_optional(None), None);
        assert_eq!(clean_optional(Some(" ")), None);
        assert_eq!(clean_optional(Some(" x ")), Some("x".to_string()));
    }
}
