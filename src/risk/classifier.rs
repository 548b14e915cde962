//! Risk classifier
//!
//! Ordered decision list over decoded transaction structure. The first
//! matching rule sets the level; the post-rules afterwards may only raise
//! it, and only a drainer block can produce `Blocked`.

use solana_sdk::pubkey::Pubkey;

use super::types::RiskLevel;
use crate::registry::ProgramRegistry;
use crate::solana::decoder::{KeyRef, ResolvedTransaction};
use crate::solana::drainer::DrainerDetection;

/// Instruction count above which an otherwise clean transaction is "complex"
pub const COMPLEX_INSTRUCTION_COUNT: usize = 5;

/// Instruction count at or below which a transfer-only transaction is "simple"
pub const SIMPLE_INSTRUCTION_COUNT: usize = 2;

/// Structural facts about a transaction, collected once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    pub instruction_count: usize,
    /// Resolved program IDs, deduplicated, in first-seen order
    pub program_ids: Vec<Pubkey>,
    /// Known programs spotted among static keys when no program resolved
    pub hinted_programs: Vec<Pubkey>,
    pub unknown_programs: Vec<Pubkey>,
    pub has_lookup_tables: bool,
    pub unresolved_lookup_programs: usize,
    /// Every resolved program is System or a token program
    pub only_transfer_programs: bool,
    /// A recognised DEX aggregator is among the resolved programs
    pub touches_dex: bool,
    /// A swap-safe program is among the resolved or hinted programs
    pub touches_swap_program: bool,
}

/// Level and explanation from the decision list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub level: RiskLevel,
    pub reason: String,
    pub is_simple_transfer: bool,
}

impl Classification {
    fn new(level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            reason: reason.into(),
            is_simple_transfer: false,
        }
    }
}

/// Classifies decoded transactions against a program registry
pub struct RiskClassifier<'a> {
    registry: &'a ProgramRegistry,
}

impl<'a> RiskClassifier<'a> {
    pub fn new(registry: &'a ProgramRegistry) -> Self {
        Self { registry }
    }

    /// Gather the evidence the decision list needs
    pub fn collect(&self, tx: &ResolvedTransaction) -> Evidence {
        let mut program_ids: Vec<Pubkey> = Vec::new();
        let mut unresolved_lookup_programs = 0;

        for ix in &tx.instructions {
            match ix.program {
                KeyRef::Static(program) => {
                    if !program_ids.contains(&program) {
                        program_ids.push(program);
                    }
                }
                KeyRef::LookupTable { .. } => unresolved_lookup_programs += 1,
            }
        }

        let has_lookup_tables = tx.has_lookup_tables();

        // Labels only: hints never reduce the unresolved count
        let mut hinted_programs: Vec<Pubkey> = Vec::new();
        if program_ids.is_empty() && has_lookup_tables {
            for key in &tx.static_keys {
                if self.registry.is_known(key) && !hinted_programs.contains(key) {
                    hinted_programs.push(*key);
                }
            }
        }

        let unknown_programs: Vec<Pubkey> = program_ids
            .iter()
            .filter(|program| !self.registry.is_known(program))
            .copied()
            .collect();

        let only_transfer_programs = !program_ids.is_empty()
            && program_ids
                .iter()
                .all(|program| self.registry.is_transfer_program(program));

        let touches_dex = program_ids
            .iter()
            .any(|program| self.registry.is_dex_aggregator(program));

        let touches_swap_program = program_ids
            .iter()
            .chain(hinted_programs.iter())
            .any(|program| self.registry.is_swap_safe(program));

        Evidence {
            instruction_count: tx.instructions.len(),
            program_ids,
            hinted_programs,
            unknown_programs,
            has_lookup_tables,
            unresolved_lookup_programs,
            only_transfer_programs,
            touches_dex,
            touches_swap_program,
        }
    }

    /// Run the decision list
    pub fn classify(&self, evidence: &Evidence, drainer: &DrainerDetection) -> Classification {
        let base = self.decide(evidence, drainer);
        if base.level == RiskLevel::Blocked {
            return base;
        }

        let mut result = base;
        if drainer.warning {
            result = raise(result, RiskLevel::Medium, &drainer.description);
        }
        if drainer.is_degraded() {
            result = raise(result, RiskLevel::Medium, &drainer.description);
        }
        result
    }

    fn decide(&self, evidence: &Evidence, drainer: &DrainerDetection) -> Classification {
        // 1. Hard block
        if drainer.is_blocked {
            return Classification::new(RiskLevel::Blocked, drainer.description.clone());
        }

        let unknown_count = evidence.unknown_programs.len();

        // 2. Simple transfer
        if evidence.instruction_count > 0
            && evidence.instruction_count <= SIMPLE_INSTRUCTION_COUNT
            && evidence.only_transfer_programs
            && unknown_count == 0
            && !evidence.has_lookup_tables
            && evidence.unresolved_lookup_programs == 0
        {
            return Classification {
                is_simple_transfer: true,
                ..Classification::new(RiskLevel::Low, "Simple transfer")
            };
        }

        // 3. Programs hidden in lookup tables
        if evidence.unresolved_lookup_programs > 0 {
            let count = evidence.unresolved_lookup_programs;
            let reason = if evidence.touches_swap_program {
                format!(
                    "Swap route calls {} program{} from address lookup tables that could not be verified",
                    count,
                    plural(count)
                )
            } else {
                format!(
                    "{} program{} loaded from address lookup tables could not be verified",
                    count,
                    plural(count)
                )
            };
            return Classification::new(RiskLevel::High, reason);
        }

        // 4. Unrecognised programs
        if unknown_count > 0 {
            if unknown_count == 1 && evidence.touches_dex {
                let dex = evidence
                    .program_ids
                    .iter()
                    .find(|program| self.registry.is_dex_aggregator(program))
                    .map(|program| self.registry.display_label(program))
                    .unwrap_or_else(|| "a DEX aggregator".to_string());
                return Classification::new(
                    RiskLevel::Medium,
                    format!("Swap via {} also calls one unrecognized program", dex),
                );
            }
            return Classification::new(
                RiskLevel::High,
                format!(
                    "Transaction calls {} unrecognized program{}",
                    unknown_count,
                    plural(unknown_count)
                ),
            );
        }

        // 5. Everything recognised
        if evidence.touches_dex {
            return Classification::new(RiskLevel::Low, "Recognized DEX swap");
        }
        if evidence.instruction_count == 0 {
            return Classification::new(RiskLevel::Medium, "Transaction contains no instructions");
        }
        if evidence.instruction_count > COMPLEX_INSTRUCTION_COUNT {
            return Classification::new(
                RiskLevel::Medium,
                format!(
                    "Complex transaction with {} instructions",
                    evidence.instruction_count
                ),
            );
        }

        Classification::new(RiskLevel::Low, "Only recognized programs")
    }
}

/// Raise to `floor`, replacing the reason only when the level actually moves
fn raise(current: Classification, floor: RiskLevel, reason: &str) -> Classification {
    if current.level >= floor {
        return current;
    }
    Classification {
        level: floor,
        reason: reason.to_string(),
        is_simple_transfer: false,
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::programs::{
        JUPITER_V6, RAYDIUM_AMM_V4, SYSTEM_PROGRAM, TOKEN_PROGRAM,
    };
    use crate::solana::decoder::{DecodedInstruction, MessageShape};

    fn ix(program: KeyRef) -> DecodedInstruction {
        DecodedInstruction {
            program,
            data: vec![],
            accounts: vec![],
        }
    }

    fn legacy(programs: &[Pubkey]) -> ResolvedTransaction {
        ResolvedTransaction {
            shape: MessageShape::Legacy,
            static_keys: programs.to_vec(),
            instructions: programs.iter().map(|p| ix(KeyRef::Static(*p))).collect(),
        }
    }

    fn classify(tx: &ResolvedTransaction) -> Classification {
        let registry = ProgramRegistry::default();
        let classifier = RiskClassifier::new(&registry);
        let evidence = classifier.collect(tx);
        classifier.classify(&evidence, &DrainerDetection::clear())
    }

    #[test]
    fn test_simple_transfer() {
        let result = classify(&legacy(&[SYSTEM_PROGRAM, SYSTEM_PROGRAM]));
        assert_eq!(result.level, RiskLevel::Low);
        assert!(result.is_simple_transfer);
    }

    #[test]
    fn test_three_transfers_not_simple() {
        let result = classify(&legacy(&[SYSTEM_PROGRAM, TOKEN_PROGRAM, SYSTEM_PROGRAM]));
        assert_eq!(result.level, RiskLevel::Low);
        assert!(!result.is_simple_transfer);
    }

    #[test]
    fn test_empty_transaction_is_not_low() {
        let result = classify(&legacy(&[]));
        assert_eq!(result.level, RiskLevel::Medium);
        assert!(!result.is_simple_transfer);
    }

    #[test]
    fn test_unresolved_lookup_program_is_high() {
        let tx = ResolvedTransaction {
            shape: MessageShape::V0 { lookup_tables: 1 },
            static_keys: vec![Pubkey::new_unique(), JUPITER_V6],
            instructions: vec![ix(KeyRef::LookupTable { index: 2 })],
        };
        let registry = ProgramRegistry::default();
        let classifier = RiskClassifier::new(&registry);
        let evidence = classifier.collect(&tx);

        assert_eq!(evidence.unresolved_lookup_programs, 1);
        assert_eq!(evidence.hinted_programs, vec![JUPITER_V6]);
        assert!(evidence.touches_swap_program);

        let result = classifier.classify(&evidence, &DrainerDetection::clear());
        assert_eq!(result.level, RiskLevel::High);
        assert!(result.reason.starts_with("Swap route"));
    }

    #[test]
    fn test_single_unknown_with_dex_is_medium() {
        let result = classify(&legacy(&[JUPITER_V6, Pubkey::new_unique()]));
        assert_eq!(result.level, RiskLevel::Medium);
        assert!(result.reason.contains("Jupiter"));
    }

    #[test]
    fn test_unknowns_without_dex_are_high() {
        let result = classify(&legacy(&[Pubkey::new_unique()]));
        assert_eq!(result.level, RiskLevel::High);

        let result = classify(&legacy(&[JUPITER_V6, Pubkey::new_unique(), Pubkey::new_unique()]));
        assert_eq!(result.level, RiskLevel::High);
        assert!(result.reason.contains("2 unrecognized programs"));
    }

    #[test]
    fn test_dex_swap_is_low() {
        let result = classify(&legacy(&[SYSTEM_PROGRAM, JUPITER_V6, TOKEN_PROGRAM]));
        assert_eq!(result.level, RiskLevel::Low);
        assert_eq!(result.reason, "Recognized DEX swap");
    }

    #[test]
    fn test_complex_transaction_is_medium() {
        let programs = vec![RAYDIUM_AMM_V4; 6];
        let result = classify(&legacy(&programs));
        assert_eq!(result.level, RiskLevel::Medium);
    }

    #[test]
    fn test_block_overrides_everything() {
        let registry = ProgramRegistry::default();
        let classifier = RiskClassifier::new(&registry);
        let evidence = classifier.collect(&legacy(&[SYSTEM_PROGRAM]));
        let drainer = DrainerDetection {
            is_blocked: true,
            description: "Blocked: test".to_string(),
            ..DrainerDetection::clear()
        };

        let result = classifier.classify(&evidence, &drainer);
        assert_eq!(result.level, RiskLevel::Blocked);
        assert_eq!(result.reason, "Blocked: test");
    }

    #[test]
    fn test_warning_and_degraded_raise_to_medium() {
        let registry = ProgramRegistry::default();
        let classifier = RiskClassifier::new(&registry);
        let evidence = classifier.collect(&legacy(&[SYSTEM_PROGRAM]));

        let warning = DrainerDetection {
            warning: true,
            description: "Warning: authority change".to_string(),
            ..DrainerDetection::clear()
        };
        let result = classifier.classify(&evidence, &warning);
        assert_eq!(result.level, RiskLevel::Medium);
        assert!(!result.is_simple_transfer);

        let degraded = DrainerDetection::not_inspected();
        let result = classifier.classify(&evidence, &degraded);
        assert_eq!(result.level, RiskLevel::Medium);
        assert!(!degraded.is_blocked);
    }

    #[test]
    fn test_adding_unknown_program_never_lowers_risk() {
        let bases: Vec<Vec<Pubkey>> = vec![
            vec![SYSTEM_PROGRAM],
            vec![SYSTEM_PROGRAM, TOKEN_PROGRAM],
            vec![JUPITER_V6, TOKEN_PROGRAM],
            vec![RAYDIUM_AMM_V4],
        ];

        for base in bases {
            let before = classify(&legacy(&base)).level;

            let mut with_unknown = base.clone();
            with_unknown.push(Pubkey::new_unique());
            assert!(classify(&legacy(&with_unknown)).level >= before);

            let mut tx = legacy(&base);
            tx.shape = MessageShape::V0 { lookup_tables: 1 };
            tx.instructions.push(ix(KeyRef::LookupTable { index: 200 }));
            assert!(classify(&tx).level >= before);
        }
    }
}
