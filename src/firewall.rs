//! Transaction safety engine
//!
//! Pipeline per transaction:
//! 1. Decode base64 bytes into resolved instructions
//! 2. Scan for drainer patterns with the caller's wallet and intent
//! 3. Classify structure; a drainer block overrides everything
//!
//! Every entry point returns a value. Parse failures become a conservative
//! `High` result instead of an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::evm::approval::{decode_approval, ApprovalIntent};
use crate::registry::programs::{
    ASSOCIATED_TOKEN_PROGRAM, SYSTEM_PROGRAM, TOKEN_2022_PROGRAM, TOKEN_PROGRAM,
};
use crate::registry::ProgramRegistry;
use crate::risk::batch::fold_batch;
use crate::risk::classifier::RiskClassifier;
use crate::risk::types::{DecodeContext, DecodedTransaction, RiskLevel, Verdict};
use crate::safety::{compute_verdict, FindingsCache, SafetyFinding};
use crate::solana::decoder::{self, ResolvedTransaction};
use crate::solana::drainer::DrainerMatcher;

/// Reason attached to payloads that do not parse
pub const UNRECOGNIZED_REASON: &str = "Transaction format not recognized";

/// Stateless decode/classify engine plus the token-safety findings cache
pub struct Firewall {
    registry: Arc<ProgramRegistry>,
    findings: FindingsCache,
}

impl Firewall {
    /// Engine over the production registry
    pub fn new() -> Self {
        Self::with_registry(ProgramRegistry::shared())
    }

    pub fn with_registry(registry: Arc<ProgramRegistry>) -> Self {
        Self {
            registry,
            findings: FindingsCache::default(),
        }
    }

    /// Replace the findings cache, e.g. to change its TTL
    pub fn with_findings_cache(mut self, findings: FindingsCache) -> Self {
        self.findings = findings;
        self
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn findings_cache(&self) -> &FindingsCache {
        &self.findings
    }

    /// Decode and classify one base64 Solana transaction
    pub fn decode(&self, tx_base64: &str, context: Option<&DecodeContext>) -> DecodedTransaction {
        match decoder::parse_base64(tx_base64) {
            Ok(tx) => self.inspect(&tx, context),
            Err(e) => {
                if e.is_malformed_input() {
                    debug!("Unrecognized transaction ({} base64 chars): {}", tx_base64.len(), e);
                } else {
                    warn!("Transaction decode failed: {}", e);
                }
                DecodedTransaction::unrecognized(UNRECOGNIZED_REASON)
            }
        }
    }

    /// Combined verdict for transactions signed together
    ///
    /// Members are decoded in signing order; decoding stops at the first
    /// blocked member.
    pub fn decode_batch<S: AsRef<str>>(
        &self,
        txs: &[S],
        context: Option<&DecodeContext>,
    ) -> DecodedTransaction {
        debug!("Decoding batch of {} transactions", txs.len());
        fold_batch(txs.iter().map(|tx| self.decode(tx.as_ref(), context)))
    }

    /// ERC-20 approval intent, or `None` when the call is not an approval
    pub fn decode_evm_approval(&self, to: &str, data: &str) -> Option<ApprovalIntent> {
        let intent = decode_approval(to, data)?;
        if intent.is_unlimited {
            info!(spender = %intent.spender, "Unlimited token approval requested");
        }
        Some(intent)
    }

    /// Aggregate externally sourced token-safety findings
    pub fn compute_verdict(&self, findings: &[SafetyFinding]) -> Verdict {
        compute_verdict(findings)
    }

    /// Store fresh findings for `mint` and return their verdict
    pub fn record_findings(&self, mint: &str, findings: Vec<SafetyFinding>) -> Verdict {
        let verdict = compute_verdict(&findings);
        self.findings.insert(mint, findings);
        verdict
    }

    /// Verdict from cached findings, `None` once they have expired
    pub fn cached_verdict(&self, mint: &str) -> Option<Verdict> {
        self.findings.get(mint).map(|findings| compute_verdict(&findings))
    }

    fn inspect(&self, tx: &ResolvedTransaction, context: Option<&DecodeContext>) -> DecodedTransaction {
        let mut context = context.copied().unwrap_or_default();
        if context.user_pubkey.is_none() {
            context.user_pubkey = tx.fee_payer().copied();
        }

        let drainer = DrainerMatcher::new(&self.registry).detect(&tx.instructions, &context);

        let classifier = RiskClassifier::new(&self.registry);
        let evidence = classifier.collect(tx);
        let classification = classifier.classify(&evidence, &drainer);

        debug!(
            format = ?tx.wire_format(),
            instructions = evidence.instruction_count,
            programs = evidence.program_ids.len(),
            unresolved = evidence.unresolved_lookup_programs,
            level = %classification.level,
            "Transaction classified"
        );

        let mut program_labels: Vec<String> = evidence
            .program_ids
            .iter()
            .map(|program| self.registry.display_label(program))
            .collect();
        program_labels.extend(
            evidence
                .hinted_programs
                .iter()
                .map(|program| format!("{} (via lookup table)", self.registry.display_label(program))),
        );

        let uses = |program| evidence.program_ids.contains(&program);
        let uses_token_program = uses(TOKEN_PROGRAM) || uses(TOKEN_2022_PROGRAM);

        let decoded = DecodedTransaction {
            format: tx.wire_format(),
            instruction_count: evidence.instruction_count,
            program_ids: evidence.program_ids.iter().map(|p| p.to_string()).collect(),
            program_labels,
            uses_system_program: uses(SYSTEM_PROGRAM),
            uses_token_program,
            uses_ata_program: uses(ASSOCIATED_TOKEN_PROGRAM),
            has_unknown_programs: !evidence.unknown_programs.is_empty(),
            unknown_program_ids: evidence.unknown_programs.iter().map(|p| p.to_string()).collect(),
            has_lookup_tables: evidence.has_lookup_tables,
            unresolved_lookup_programs: evidence.unresolved_lookup_programs,
            is_simple_transfer: classification.is_simple_transfer,
            risk_level: classification.level,
            risk_reason: classification.reason,
            drainer_detection: drainer,
        };

        debug_assert_eq!(
            decoded.risk_level == RiskLevel::Blocked,
            decoded.drainer_detection.is_blocked
        );
        decoded
    }
}

impl Default for Firewall {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::programs::JUPITER_V6;
    use crate::risk::types::{Intent, WireFormat};
    use crate::safety::{FindingLevel, Verification};
    use crate::solana::decoder::fixtures::{legacy_base64, v0_lookup_program_base64};
    use crate::solana::drainer::{AttackType, Confidence};
    use solana_sdk::instruction::{AccountMeta, Instruction};
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::system_instruction;
    use spl_token::instruction::AuthorityType;

    fn jupiter_route(wallet: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            JUPITER_V6,
            &[0xe5, 0x17, 0xcb, 0x97],
            vec![AccountMeta::new(*wallet, true)],
        )
    }

    fn close_authority_handoff(wallet: &Pubkey) -> Instruction {
        spl_token::instruction::set_authority(
            &spl_token::ID,
            &Pubkey::new_unique(),
            Some(&Pubkey::new_unique()),
            AuthorityType::CloseAccount,
            wallet,
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_assign_of_own_account_is_blocked() {
        let wallet = Pubkey::new_unique();
        let attacker = Pubkey::new_unique();
        let tx = legacy_base64(&[system_instruction::assign(&wallet, &attacker)], &wallet);

        let decoded = Firewall::new().decode(&tx, None);
        assert_eq!(decoded.risk_level, RiskLevel::Blocked);
        assert!(decoded.drainer_detection.is_blocked);
        assert_eq!(decoded.drainer_detection.attack_type, Some(AttackType::Assign));
        assert_eq!(decoded.verdict().label, "Blocked");
    }

    #[test]
    fn test_close_authority_inside_swap_is_not_blocked() {
        let wallet = Pubkey::new_unique();
        let tx = legacy_base64(
            &[jupiter_route(&wallet), close_authority_handoff(&wallet)],
            &wallet,
        );
        let context = DecodeContext::new(wallet, Intent::Swap);

        let decoded = Firewall::new().decode(&tx, Some(&context));
        assert_ne!(decoded.risk_level, RiskLevel::Blocked);
        assert!(!decoded.drainer_detection.is_blocked);
        assert!(!decoded.is_simple_transfer);
        assert_eq!(decoded.risk_reason, "Recognized DEX swap");
    }

    #[test]
    fn test_authority_handoff_without_intent_is_blocked() {
        let wallet = Pubkey::new_unique();
        let ix = spl_token::instruction::set_authority(
            &spl_token::ID,
            &Pubkey::new_unique(),
            Some(&Pubkey::new_unique()),
            AuthorityType::AccountOwner,
            &wallet,
            &[],
        )
        .unwrap();
        let tx = legacy_base64(&[jupiter_route(&wallet), ix], &wallet);
        let firewall = Firewall::new();

        let decoded = firewall.decode(&tx, None);
        assert_eq!(decoded.risk_level, RiskLevel::Blocked);
        assert_eq!(decoded.drainer_detection.attack_type, Some(AttackType::SetAuthority));

        // Declared swap intent softens it to a warning, never below Medium
        let context = DecodeContext::new(wallet, Intent::Swap);
        let decoded = firewall.decode(&tx, Some(&context));
        assert_eq!(decoded.risk_level, RiskLevel::Medium);
        assert!(decoded.drainer_detection.warning);
    }

    #[test]
    fn test_two_system_transfers_are_simple() {
        let wallet = Pubkey::new_unique();
        let tx = legacy_base64(
            &[
                system_instruction::transfer(&wallet, &Pubkey::new_unique(), 1_000),
                system_instruction::transfer(&wallet, &Pubkey::new_unique(), 2_000),
            ],
            &wallet,
        );

        let decoded = Firewall::new().decode(&tx, None);
        assert!(decoded.is_simple_transfer);
        assert_eq!(decoded.risk_level, RiskLevel::Low);
        assert_eq!(decoded.format, WireFormat::Legacy);
        assert!(decoded.uses_system_program);
        assert_eq!(decoded.program_labels, vec!["System Program"]);
    }

    #[test]
    fn test_lookup_table_program_is_high() {
        let payer = Pubkey::new_unique();
        let tx = v0_lookup_program_base64(&payer, &[JUPITER_V6]);

        let decoded = Firewall::new().decode(&tx, None);
        assert_eq!(decoded.format, WireFormat::V0);
        assert!(decoded.has_lookup_tables);
        assert!(decoded.unresolved_lookup_programs >= 1);
        assert_eq!(decoded.risk_level, RiskLevel::High);
        assert!(decoded.program_ids.is_empty());
        assert_eq!(
            decoded.program_labels,
            vec!["Jupiter Aggregator v6 (via lookup table)"]
        );
        assert_eq!(decoded.drainer_detection.confidence, Confidence::Degraded);
    }

    #[test]
    fn test_transfer_selector_is_not_an_approval() {
        let data = format!("0xa9059cbb{:0>64}{}", "1", "f".repeat(64));
        let firewall = Firewall::new();
        assert!(firewall
            .decode_evm_approval("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", &data)
            .is_none());
    }

    #[test]
    fn test_unlimited_approval_detected() {
        let data = format!("0x095ea7b3{:0>64}{}", "1", "f".repeat(64));
        let intent = Firewall::new()
            .decode_evm_approval("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", &data)
            .unwrap();
        assert!(intent.is_unlimited);
    }

    #[test]
    fn test_findings_verdicts() {
        let firewall = Firewall::new();
        let danger = SafetyFinding::new("lp", FindingLevel::Danger, Verification::Verified, "LP unlocked");
        let warning =
            SafetyFinding::new("holders", FindingLevel::Warning, Verification::Verified, "Top holder 40%");

        assert_eq!(firewall.compute_verdict(&[danger]).label, "High Risk");
        assert_eq!(firewall.compute_verdict(&[warning]).label, "Medium Risk");
    }

    #[test]
    fn test_cached_findings_verdict() {
        let firewall = Firewall::new();
        let warning =
            SafetyFinding::new("holders", FindingLevel::Warning, Verification::Verified, "Top holder 40%");

        assert!(firewall.cached_verdict("mint").is_none());
        let recorded = firewall.record_findings("mint", vec![warning]);
        assert_eq!(firewall.cached_verdict("mint"), Some(recorded));
    }

    #[test]
    fn test_garbage_fails_closed() {
        let firewall = Firewall::new();
        let oversized = "A".repeat(4000);
        let inputs: [&str; 5] = [
            "",
            "not base64!!",
            "AAAA",
            "////////////////////",
            oversized.as_str(),
        ];

        for input in inputs {
            let decoded = firewall.decode(input, None);
            assert!(
                matches!(decoded.risk_level, RiskLevel::Medium | RiskLevel::High),
                "{:?} gave {:?}",
                input,
                decoded.risk_level
            );
            assert_eq!(decoded.risk_reason, UNRECOGNIZED_REASON);
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let wallet = Pubkey::new_unique();
        let tx = legacy_base64(
            &[jupiter_route(&wallet), close_authority_handoff(&wallet)],
            &wallet,
        );
        let context = DecodeContext::new(wallet, Intent::Dapp);
        let firewall = Firewall::new();

        assert_eq!(firewall.decode(&tx, Some(&context)), firewall.decode(&tx, Some(&context)));
        assert_eq!(firewall.decode("garbage", None), firewall.decode("garbage", None));
    }

    #[test]
    fn test_batch_stops_at_blocked_member() {
        let wallet = Pubkey::new_unique();
        let ok = legacy_base64(
            &[system_instruction::transfer(&wallet, &Pubkey::new_unique(), 5)],
            &wallet,
        );
        let blocked = legacy_base64(
            &[system_instruction::assign(&wallet, &Pubkey::new_unique())],
            &wallet,
        );
        let batch = vec![ok, blocked, "definitely not a transaction".to_string()];

        let decoded = Firewall::new().decode_batch(&batch, None);
        assert_eq!(decoded.risk_level, RiskLevel::Blocked);
        assert!(decoded.risk_reason.starts_with("Transaction #2 in batch"));
        assert_eq!(decoded.format, WireFormat::Batch);
    }

    #[test]
    fn test_batch_with_garbage_member_is_not_low() {
        let wallet = Pubkey::new_unique();
        let ok = legacy_base64(
            &[system_instruction::transfer(&wallet, &Pubkey::new_unique(), 5)],
            &wallet,
        );

        let decoded = Firewall::new().decode_batch(&[ok.as_str(), "garbage"], None);
        assert_eq!(decoded.risk_level, RiskLevel::High);
        assert!(!decoded.is_simple_transfer);

        let empty: [&str; 0] = [];
        assert_eq!(Firewall::new().decode_batch(&empty, None).risk_level, RiskLevel::High);
    }

    #[test]
    fn test_zero_instructions_is_medium() {
        let payer = Pubkey::new_unique();
        let tx = legacy_base64(&[], &payer);

        let decoded = Firewall::new().decode(&tx, None);
        assert_eq!(decoded.instruction_count, 0);
        assert_eq!(decoded.risk_level, RiskLevel::Medium);
        assert!(!decoded.is_simple_transfer);
    }

    #[test]
    fn test_unknown_program_raises_risk() {
        let wallet = Pubkey::new_unique();
        let transfer = system_instruction::transfer(&wallet, &Pubkey::new_unique(), 5);
        let unknown = Instruction::new_with_bytes(Pubkey::new_unique(), &[1], vec![]);
        let firewall = Firewall::new();

        let base = firewall.decode(&legacy_base64(&[transfer.clone()], &wallet), None);
        let with_unknown = firewall.decode(&legacy_base64(&[transfer, unknown], &wallet), None);

        assert_eq!(base.risk_level, RiskLevel::Low);
        assert!(with_unknown.risk_level > base.risk_level);
        assert!(with_unknown.has_unknown_programs);
        assert_eq!(with_unknown.unknown_program_ids.len(), 1);
    }

    #[test]
    fn test_custom_registry_recognizes_program() {
        let wallet = Pubkey::new_unique();
        let router = Pubkey::new_unique();
        let registry = ProgramRegistry::builder()
            .program(router, "In-house router")
            .dex_aggregator(router)
            .build();
        let firewall = Firewall::with_registry(Arc::new(registry));

        let ix = Instruction::new_with_bytes(router, &[1], vec![AccountMeta::new(wallet, true)]);
        let decoded = firewall.decode(&legacy_base64(&[ix], &wallet), None);
        assert_eq!(decoded.risk_level, RiskLevel::Low);
        assert_eq!(decoded.program_labels, vec!["In-house router"]);
    }

    #[test]
    fn test_firewall_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Firewall>();
    }
}
