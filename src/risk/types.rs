//! Shared types for risk classification results

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::solana::drainer::DrainerDetection;

/// Overall risk level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Signing must not proceed
    Blocked,
}

impl RiskLevel {
    /// Label shown on the verdict card
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::Blocked => "Blocked",
        }
    }

    /// Raise to at least `floor`, never lower
    pub fn at_least(self, floor: RiskLevel) -> RiskLevel {
        self.max(floor)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Blocked => write!(f, "blocked"),
        }
    }
}

/// What the caller says the user is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Swap,
    Dapp,
    #[default]
    Unknown,
}

impl Intent {
    /// Swap and dApp flows may legitimately move token authorities
    pub fn is_declared(&self) -> bool {
        matches!(self, Intent::Swap | Intent::Dapp)
    }
}

impl std::str::FromStr for Intent {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "swap" => Ok(Intent::Swap),
            "dapp" => Ok(Intent::Dapp),
            "unknown" => Ok(Intent::Unknown),
            other => Err(crate::error::Error::Config(format!(
                "unknown intent '{}', expected swap, dapp or unknown",
                other
            ))),
        }
    }
}

/// Caller-supplied context for a decode request
///
/// Only ambiguous signals are affected by the context. A provably
/// dangerous instruction is blocked whatever the declared intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeContext {
    /// The wallet's own address. The fee payer is used when absent.
    pub user_pubkey: Option<Pubkey>,
    pub intent: Intent,
}

impl DecodeContext {
    pub fn new(user_pubkey: Pubkey, intent: Intent) -> Self {
        Self {
            user_pubkey: Some(user_pubkey),
            intent,
        }
    }
}

/// Which wire shape a payload turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Legacy message, every account in the static key list
    Legacy,
    /// Version 0 message, may reference address lookup tables
    V0,
    /// Bytes did not parse as any supported format
    Unrecognized,
    /// Several transactions folded into one result
    Batch,
}

/// Decoded structure plus risk verdict for one transaction (or a batch)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTransaction {
    pub format: WireFormat,
    pub instruction_count: usize,
    /// Resolved program IDs, deduplicated, in first-seen order
    pub program_ids: Vec<String>,
    /// One label per entry of `program_ids`, in the same order, followed
    /// by any "(via lookup table)" hint labels
    pub program_labels: Vec<String>,
    pub uses_system_program: bool,
    pub uses_token_program: bool,
    #[serde(rename = "usesATAProgram")]
    pub uses_ata_program: bool,
    pub has_unknown_programs: bool,
    pub unknown_program_ids: Vec<String>,
    pub has_lookup_tables: bool,
    pub unresolved_lookup_programs: usize,
    pub is_simple_transfer: bool,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub drainer_detection: DrainerDetection,
}

impl DecodedTransaction {
    /// Conservative result for bytes that could not be parsed
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        Self {
            format: WireFormat::Unrecognized,
            instruction_count: 0,
            program_ids: Vec::new(),
            program_labels: Vec::new(),
            uses_system_program: false,
            uses_token_program: false,
            uses_ata_program: false,
            has_unknown_programs: false,
            unknown_program_ids: Vec::new(),
            has_lookup_tables: false,
            unresolved_lookup_programs: 0,
            is_simple_transfer: false,
            risk_level: RiskLevel::High,
            risk_reason: reason.into(),
            drainer_detection: DrainerDetection::not_inspected(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.risk_level == RiskLevel::Blocked
    }

    /// Render this result in the shared verdict shape
    pub fn verdict(&self) -> Verdict {
        let mut reasons = Vec::new();
        if self.drainer_detection.is_blocked || self.drainer_detection.warning {
            reasons.push(self.drainer_detection.description.clone());
        }
        reasons.push(self.risk_reason.clone());
        if self.drainer_detection.is_degraded() && !self.drainer_detection.is_blocked {
            reasons.push(self.drainer_detection.description.clone());
        }
        for id in &self.unknown_program_ids {
            reasons.push(format!("Unrecognized program {}", id));
        }
        Verdict::new(self.risk_level, reasons)
    }
}

/// Maximum number of reasons carried by a verdict
pub const MAX_VERDICT_REASONS: usize = 4;

/// Aggregated conclusion shared by transaction risk and token safety
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub label: String,
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

impl Verdict {
    /// Build a verdict, deduplicating reasons and keeping the first four
    ///
    /// `reasons` must already be in severity-then-discovery order.
    pub fn new(level: RiskLevel, reasons: impl IntoIterator<Item = String>) -> Self {
        let mut kept: Vec<String> = Vec::with_capacity(MAX_VERDICT_REASONS);
        for reason in reasons {
            if kept.len() == MAX_VERDICT_REASONS {
                break;
            }
            if reason.is_empty() || kept.contains(&reason) {
                continue;
            }
            kept.push(reason);
        }

        Self {
            label: level.label().to_string(),
            level,
            reasons: kept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Blocked);
        assert_eq!(RiskLevel::Low.at_least(RiskLevel::Medium), RiskLevel::Medium);
        assert_eq!(RiskLevel::High.at_least(RiskLevel::Medium), RiskLevel::High);
    }

    #[test]
    fn test_intent_parsing() {
        assert_eq!("swap".parse::<Intent>().unwrap(), Intent::Swap);
        assert_eq!("DApp".parse::<Intent>().unwrap(), Intent::Dapp);
        assert!("sign".parse::<Intent>().is_err());
        assert!(Intent::Swap.is_declared());
        assert!(!Intent::Unknown.is_declared());
    }

    #[test]
    fn test_verdict_dedup_and_cap() {
        let reasons = vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
            String::new(),
            "c".to_string(),
            "d".to_string(),
            "e".to_string(),
        ];
        let verdict = Verdict::new(RiskLevel::Medium, reasons);
        assert_eq!(verdict.label, "Medium Risk");
        assert_eq!(verdict.reasons, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_unrecognized_is_high() {
        let decoded = DecodedTransaction::unrecognized("Transaction format not recognized");
        assert_eq!(decoded.risk_level, RiskLevel::High);
        assert!(!decoded.is_simple_transfer);
        assert!(!decoded.drainer_detection.is_blocked);
    }

    #[test]
    fn test_serialized_field_names() {
        let decoded = DecodedTransaction::unrecognized("x");
        let json = serde_json::to_value(&decoded).unwrap();
        assert_eq!(json["riskLevel"], "High");
        assert!(json.get("usesATAProgram").is_some());
        assert!(json.get("unresolvedLookupPrograms").is_some());
    }
}
