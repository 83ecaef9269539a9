//! Priority-ordered role keyword table

use once_cell::sync::Lazy;
use regex::Regex;

pub const PROPERTY_ROLE: &str = "property-tester";
pub const INTEGRATION_ROLE: &str = "integration-tester";
pub const UNIT_ROLE: &str = "unit-tester";

/// Role used when no pattern matches
pub const DEFAULT_ROLE: &str = UNIT_ROLE;

pub(crate) struct RoleRule {
    pub role: &'static str,
    pattern: Regex,
}

impl RoleRule {
    fn new(role: &'static str, pattern: &str) -> Self {
        Self {
            role,
            pattern: Regex::new(pattern).expect("Invalid role pattern"),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Checked top to bottom; the first match wins. The most specific techniques come
/// first so that e.g. "property test for the repository" lands with the property
/// tester rather than the integration tester.
pub(crate) static ROLE_RULES: Lazy<Vec<RoleRule>> = Lazy::new(|| {
    vec![
        RoleRule::new(
            PROPERTY_ROLE,
            r"(?i)\b(property|properties|proptest|quickcheck|hypothesis|invariants?|generative|fuzz\w*|arbitrary|round-?trips?)\b",
        ),
        RoleRule::new(
            INTEGRATION_ROLE,
            r"(?i)\b(integration|database|db|sql\w*|containers?|docker|testcontainers|persist\w*|repositor(y|ies)|http|api|endpoints?|e2e|end-to-end|network\w*)\b",
        ),
        RoleRule::new(
            UNIT_ROLE,
            r"(?i)\b(unit|mock\w*|stub\w*|fakes?|isolat\w*|pure)\b",
        ),
    ]
});

/// Every role of the table, in priority order
pub fn roles() -> Vec<&'static str> {
    ROLE_RULES.iter().map(|rule| rule.role).collect()
}

/// Classify free text into a role; never fails
pub fn classify(text: &str) -> &'static str {
    ROLE_RULES
        .iter()
        .find(|rule| rule.matches(text))
        .map(|rule| rule.role)
        .unwrap_or(DEFAULT_ROLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("mock the clock"), UNIT_ROLE);
        assert_eq!(classify("Isolation of parser"), UNIT_ROLE);
        assert_eq!(classify("needs a Postgres container"), INTEGRATION_ROLE);
        assert_eq!(classify("persistence layer"), INTEGRATION_ROLE);
        assert_eq!(classify("proptest for encoder"), PROPERTY_ROLE);
        assert_eq!(classify("check invariants"), PROPERTY_ROLE);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(classify("property test against the repository"), PROPERTY_ROLE);
        assert_eq!(classify("mock the database"), INTEGRATION_ROLE);
    }

    #[test]
    fn test_unmatched_falls_back() {
        assert_eq!(classify(""), DEFAULT_ROLE);
        assert_eq!(classify("something else entirely"), DEFAULT_ROLE);
        // word boundaries: "dbg" and "apiary" are not keywords
        assert_eq!(classify("dbg output of apiary"), DEFAULT_ROLE);
    }

    #[test]
    fn test_roles_in_priority_order() {
        assert_eq!(roles(), vec![PROPERTY_ROLE, INTEGRATION_ROLE, UNIT_ROLE]);
    }
}
