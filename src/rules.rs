// 🏷️ Violation Rules - Rules as Data
// Ordered pattern table that turns OCR text into findings

use crate::findings::Finding;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ViolationRule {
    /// Rule ID for tracking
    pub id: String,

    /// Case-insensitive pattern, matched anywhere in the text
    pattern: Regex,

    /// Finding emitted when the pattern matches
    pub finding: Finding,
}

impl ViolationRule {
    pub fn new(id: &str, pattern: &str, finding: Finding) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid pattern for rule {}", id))?;

        Ok(ViolationRule {
            id: id.to_string(),
            pattern,
            finding,
        })
    }

    /// Check if pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

pub struct RuleEngine {
    rules: Vec<ViolationRule>,
    fallback: Finding,
}

impl RuleEngine {
    /// Create engine from an ordered list of rules and the no-match finding
    pub fn new(rules: Vec<ViolationRule>, fallback: Finding) -> Self {
        RuleEngine { rules, fallback }
    }

    /// The fixed table shipped with the app
    pub fn builtin() -> Self {
        let late_payment = ViolationRule {
            id: "late-payment".to_string(),
            pattern: builtin_pattern("late|payment|past"),
            finding: Finding::new(
                "Inaccurate Late Payment",
                "15 USC 1681i",
                "Report shows unverified late status.",
            ),
        };

        let charge_off = ViolationRule {
            id: "charge-off".to_string(),
            pattern: builtin_pattern("charge|off|profit"),
            finding: Finding::new(
                "Charge-Off Violation",
                "15 USC 1681eb",
                "Maximum possible accuracy failure.",
            ),
        };

        let fallback = Finding::new(
            "Metro 2 Data Format Error",
            "FCRA Sec 611",
            "General unverified formatting item detected.",
        );

        RuleEngine::new(vec![late_payment, charge_off], fallback)
    }

    /// Apply every rule in table order; all matches are kept.
    /// Never returns an empty list: no match yields the fallback finding.
    pub fn classify(&self, text: &str) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(text))
            .map(|rule| rule.finding.clone())
            .collect();

        if findings.is_empty() {
            findings.push(self.fallback.clone());
        }

        findings
    }

    /// IDs of the rules that match, in table order
    pub fn matched_rule_ids(&self, text: &str) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(text))
            .map(|rule| rule.id.as_str())
            .collect()
    }

    pub fn rules(&self) -> &[ViolationRule] {
        &self.rules
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

// Literal alternations, known valid at build time.
fn builtin_pattern(alternation: &str) -> Regex {
    match RegexBuilder::new(alternation).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => unreachable!("builtin pattern {alternation:?} failed to compile: {e}"),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.title.as_str()).collect()
    }

    #[test]
    fn test_late_payment_keywords() {
        let engine = RuleEngine::builtin();

        for text in ["LATE 30 days", "Payment history", "account PAST due"] {
            let findings = engine.classify(text);
            let hit = findings
                .iter()
                .find(|f| f.title == "Inaccurate Late Payment")
                .expect("late payment finding");
            assert_eq!(hit.code, "15 USC 1681i");
        }
    }

    #[test]
    fn test_charge_off_keywords() {
        let engine = RuleEngine::builtin();

        for text in ["Charged to loss", "written OFF", "profit and loss"] {
            let findings = engine.classify(text);
            let hit = findings
                .iter()
                .find(|f| f.title == "Charge-Off Violation")
                .expect("charge-off finding");
            assert_eq!(hit.code, "15 USC 1681eb");
        }
    }

    #[test]
    fn test_both_rules_in_table_order() {
        let engine = RuleEngine::builtin();
        let findings = engine.classify("Charge-off after late payment");

        assert_eq!(
            titles(&findings),
            vec!["Inaccurate Late Payment", "Charge-Off Violation"]
        );
        assert_eq!(engine.matched_rule_ids("charge-off after late payment"), vec!["late-payment", "charge-off"]);
    }

    #[test]
    fn test_fallback_on_no_match() {
        let engine = RuleEngine::builtin();

        for text in ["", "Account in good standing", "   \n"] {
            let findings = engine.classify(text);
            assert_eq!(findings.len(), 1);
            assert_eq!(findings[0].title, "Metro 2 Data Format Error");
            assert_eq!(findings[0].code, "FCRA Sec 611");
        }
    }

    #[test]
    fn test_substring_semantics() {
        // No word boundaries: "offer" contains "off"
        let engine = RuleEngine::builtin();
        let findings = engine.classify("special offer");
        assert_eq!(titles(&findings), vec!["Charge-Off Violation"]);
    }

    #[test]
    fn test_custom_rule_table() {
        let rule = ViolationRule::new(
            "eviction",
            r"evict(ed|ion)",
            Finding::new("Eviction Record", "15 USC 1681c", "Stale eviction."),
        )
        .unwrap();
        assert_eq!(rule.pattern(), r"evict(ed|ion)");

        let engine = RuleEngine::new(vec![rule], Finding::new("None", "-", "-"));
        assert_eq!(engine.rule_count(), 1);
        assert_eq!(titles(&engine.classify("EVICTION filed")), vec!["Eviction Record"]);
        assert_eq!(titles(&engine.classify("clean")), vec!["None"]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = ViolationRule::new("broken", "(unclosed", Finding::new("x", "y", "z"));
        assert!(result.is_err());
    }
}
