//! Token-safety findings supplied by external scanners

use serde::{Deserialize, Serialize};

/// Severity of a single finding, ordered from harmless to dangerous
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Safe,
    Info,
    Warning,
    Danger,
}

/// Whether the scanner could back the finding with on-chain data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Verified,
    #[default]
    NotVerified,
}

/// One atomic safety observation about a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyFinding {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub level: FindingLevel,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub verified: Verification,
    /// Link or signature backing a verified finding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
}

impl SafetyFinding {
    pub fn new(key: &str, level: FindingLevel, verified: Verification, summary: &str) -> Self {
        Self {
            key: key.to_string(),
            title: key.to_string(),
            level,
            summary: summary.to_string(),
            detail: String::new(),
            verified,
            proof: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified == Verification::Verified
    }

    /// Text used as a verdict reason
    pub fn reason(&self) -> &str {
        if self.summary.is_empty() {
            &self.title
        } else {
            &self.summary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_finding() {
        let finding: SafetyFinding =
            serde_json::from_str(r#"{"level":"danger","verified":"verified"}"#).unwrap();
        assert_eq!(finding.level, FindingLevel::Danger);
        assert!(finding.is_verified());
        assert!(finding.proof.is_none());
    }

    #[test]
    fn test_deserialize_full_finding() {
        let json = r#"{
            "key": "mint_authority",
            "title": "Mint authority",
            "level": "warning",
            "summary": "Mint authority is still active",
            "detail": "The creator can mint more tokens",
            "verified": "not_verified",
            "proof": null
        }"#;
        let finding: SafetyFinding = serde_json::from_str(json).unwrap();
        assert_eq!(finding.level, FindingLevel::Warning);
        assert!(!finding.is_verified());
        assert_eq!(finding.reason(), "Mint authority is still active");
    }

    #[test]
    fn test_unknown_level_rejected() {
        let result = serde_json::from_str::<SafetyFinding>(r#"{"level":"critical"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_level_ordering() {
        assert!(FindingLevel::Danger > FindingLevel::Warning);
        assert!(FindingLevel::Warning > FindingLevel::Info);
        assert!(FindingLevel::Info > FindingLevel::Safe);
    }
}
