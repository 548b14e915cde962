//! Token-safety verdict aggregation

use super::finding::{FindingLevel, SafetyFinding};
use crate::risk::types::{RiskLevel, Verdict};

/// Fold findings into one verdict, worst signal wins
///
/// Verified danger is High. Any danger, or any verified warning, is
/// Medium. Unverified warnings alone stay Low.
pub fn compute_verdict(findings: &[SafetyFinding]) -> Verdict {
    let verified_danger = findings
        .iter()
        .any(|f| f.level == FindingLevel::Danger && f.is_verified());
    let any_danger = findings.iter().any(|f| f.level == FindingLevel::Danger);
    let verified_warnings = findings
        .iter()
        .filter(|f| f.level == FindingLevel::Warning && f.is_verified())
        .count();

    let level = if verified_danger {
        RiskLevel::High
    } else if any_danger || verified_warnings > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    // Stable sort keeps discovery order within a level
    let mut flagged: Vec<&SafetyFinding> = findings
        .iter()
        .filter(|f| f.level != FindingLevel::Safe)
        .collect();
    flagged.sort_by(|a, b| b.level.cmp(&a.level));

    Verdict::new(level, flagged.into_iter().map(|f| f.reason().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::finding::Verification;

    fn finding(level: FindingLevel, verified: Verification, summary: &str) -> SafetyFinding {
        SafetyFinding::new(summary, level, verified, summary)
    }

    #[test]
    fn test_verified_danger_is_high() {
        let verdict = compute_verdict(&[finding(
            FindingLevel::Danger,
            Verification::Verified,
            "Liquidity is not locked",
        )]);
        assert_eq!(verdict.label, "High Risk");
        assert_eq!(verdict.level, RiskLevel::High);
        assert_eq!(verdict.reasons, vec!["Liquidity is not locked"]);
    }

    #[test]
    fn test_single_verified_warning_is_medium() {
        let verdict = compute_verdict(&[finding(
            FindingLevel::Warning,
            Verification::Verified,
            "Top holder owns 30%",
        )]);
        assert_eq!(verdict.label, "Medium Risk");
    }

    #[test]
    fn test_unverified_danger_is_medium() {
        let verdict = compute_verdict(&[finding(
            FindingLevel::Danger,
            Verification::NotVerified,
            "Possible honeypot",
        )]);
        assert_eq!(verdict.level, RiskLevel::Medium);
    }

    #[test]
    fn test_unverified_warning_alone_is_low() {
        let verdict = compute_verdict(&[finding(
            FindingLevel::Warning,
            Verification::NotVerified,
            "Low volume",
        )]);
        assert_eq!(verdict.label, "Low Risk");
        assert_eq!(verdict.reasons, vec!["Low volume"]);
    }

    #[test]
    fn test_empty_findings_are_low() {
        let verdict = compute_verdict(&[]);
        assert_eq!(verdict.level, RiskLevel::Low);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_reasons_ordered_deduplicated_and_capped() {
        let findings = vec![
            finding(FindingLevel::Info, Verification::Verified, "info one"),
            finding(FindingLevel::Safe, Verification::Verified, "all good"),
            finding(FindingLevel::Warning, Verification::Verified, "warn one"),
            finding(FindingLevel::Danger, Verification::NotVerified, "danger one"),
            finding(FindingLevel::Warning, Verification::Verified, "warn one"),
            finding(FindingLevel::Warning, Verification::NotVerified, "warn two"),
            finding(FindingLevel::Danger, Verification::NotVerified, "danger two"),
        ];

        let verdict = compute_verdict(&findings);
        assert_eq!(verdict.level, RiskLevel::Medium);
        assert_eq!(
            verdict.reasons,
            vec!["danger one", "danger two", "warn one", "warn two"]
        );
    }
}
