//! Batch aggregation for transactions signed together
//!
//! Results are consumed lazily in signing order. The first `Blocked`
//! member ends the fold: later members are never decoded, which also caps
//! the work an attacker can force by padding a batch with oversized
//! payloads.

use tracing::info;

use super::types::{DecodedTransaction, RiskLevel, WireFormat};
use crate::solana::drainer::Confidence;

/// Fold per-transaction results into one batch verdict, worst signal wins
pub fn fold_batch<I>(results: I) -> DecodedTransaction
where
    I: IntoIterator<Item = DecodedTransaction>,
{
    let mut combined: Option<DecodedTransaction> = None;
    let mut members = 0usize;

    for (index, result) in results.into_iter().enumerate() {
        members += 1;
        let position = index + 1;

        if result.is_blocked() {
            info!("Batch member #{} is blocked, skipping the rest of the batch", position);
            return DecodedTransaction {
                format: WireFormat::Batch,
                risk_reason: format!("Transaction #{} in batch: {}", position, result.risk_reason),
                ..result
            };
        }

        combined = Some(match combined {
            None => DecodedTransaction {
                format: WireFormat::Batch,
                risk_reason: member_reason(position, &result.risk_reason),
                ..result
            },
            Some(acc) => merge(acc, result, position),
        });
    }

    match combined {
        Some(mut batch) => {
            // Several transfers are not one simple transfer
            batch.is_simple_transfer &= members == 1;
            batch
        }
        None => DecodedTransaction {
            format: WireFormat::Batch,
            ..DecodedTransaction::unrecognized("Batch contains no transactions")
        },
    }
}

fn member_reason(position: usize, reason: &str) -> String {
    format!("Transaction #{}: {}", position, reason)
}

fn merge(mut acc: DecodedTransaction, next: DecodedTransaction, position: usize) -> DecodedTransaction {
    acc.instruction_count += next.instruction_count;

    // Hint labels carry no program id and stay behind the id-aligned labels
    let aligned = acc.program_ids.len().min(acc.program_labels.len());
    let mut hints = acc.program_labels.split_off(aligned);
    for (id, label) in next.program_ids.iter().zip(next.program_labels.iter()) {
        if !acc.program_ids.contains(id) {
            acc.program_ids.push(id.clone());
            acc.program_labels.push(label.clone());
        }
    }
    for label in next.program_labels.iter().skip(next.program_ids.len()) {
        if !hints.contains(label) {
            hints.push(label.clone());
        }
    }
    acc.program_labels.append(&mut hints);
    for id in next.unknown_program_ids {
        if !acc.unknown_program_ids.contains(&id) {
            acc.unknown_program_ids.push(id);
        }
    }

    acc.uses_system_program |= next.uses_system_program;
    acc.uses_token_program |= next.uses_token_program;
    acc.uses_ata_program |= next.uses_ata_program;
    acc.has_unknown_programs |= next.has_unknown_programs;
    acc.has_lookup_tables |= next.has_lookup_tables;
    acc.unresolved_lookup_programs += next.unresolved_lookup_programs;
    acc.is_simple_transfer &= next.is_simple_transfer;

    let detection = &mut acc.drainer_detection;
    detection.skipped_instructions += next.drainer_detection.skipped_instructions;
    if next.drainer_detection.confidence == Confidence::Degraded {
        detection.confidence = Confidence::Degraded;
    }
    if next.drainer_detection.warning && !detection.warning {
        detection.warning = true;
        detection.attack_type = next.drainer_detection.attack_type;
        detection.description = next.drainer_detection.description.clone();
        detection.instruction_index = next.drainer_detection.instruction_index;
    }

    // Strictly worse only, so ties keep the earliest reason
    if next.risk_level > acc.risk_level {
        acc.risk_level = next.risk_level;
        acc.risk_reason = member_reason(position, &next.risk_reason);
    }
    debug_assert!(acc.risk_level != RiskLevel::Blocked);

    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::drainer::{AttackType, DrainerDetection};

    fn member(level: RiskLevel, reason: &str, program: &str) -> DecodedTransaction {
        DecodedTransaction {
            format: WireFormat::Legacy,
            instruction_count: 1,
            program_ids: vec![program.to_string()],
            program_labels: vec![format!("label {}", program)],
            risk_level: level,
            risk_reason: reason.to_string(),
            is_simple_transfer: level == RiskLevel::Low,
            drainer_detection: DrainerDetection::clear(),
            ..DecodedTransaction::unrecognized("")
        }
    }

    fn blocked(reason: &str) -> DecodedTransaction {
        DecodedTransaction {
            drainer_detection: DrainerDetection {
                is_blocked: true,
                attack_type: Some(AttackType::Assign),
                description: reason.to_string(),
                ..DrainerDetection::clear()
            },
            ..member(RiskLevel::Blocked, reason, "evil")
        }
    }

    #[test]
    fn test_worst_level_wins() {
        let batch = fold_batch(vec![
            member(RiskLevel::Low, "Simple transfer", "a"),
            member(RiskLevel::High, "Unknown program", "b"),
            member(RiskLevel::Medium, "Complex", "c"),
        ]);

        assert_eq!(batch.format, WireFormat::Batch);
        assert_eq!(batch.risk_level, RiskLevel::High);
        assert_eq!(batch.risk_reason, "Transaction #2: Unknown program");
        assert_eq!(batch.instruction_count, 3);
        assert_eq!(batch.program_ids, vec!["a", "b", "c"]);
        assert!(!batch.is_simple_transfer);
    }

    #[test]
    fn test_labels_stay_aligned_after_hinted_member() {
        let hinted = DecodedTransaction {
            program_ids: Vec::new(),
            program_labels: vec!["Jupiter (via lookup table)".to_string()],
            ..member(RiskLevel::Medium, "Lookup tables", "unused")
        };

        let batch = fold_batch(vec![
            hinted,
            member(RiskLevel::Low, "ok", "a"),
            member(RiskLevel::Low, "ok", "b"),
        ]);

        assert_eq!(batch.program_ids, vec!["a", "b"]);
        assert_eq!(
            batch.program_labels,
            vec!["label a", "label b", "Jupiter (via lookup table)"]
        );
    }

    #[test]
    fn test_blocked_member_short_circuits() {
        let mut consumed = 0;
        let results = vec![
            member(RiskLevel::Low, "ok", "a"),
            blocked("Blocked: reassigns wallet"),
            member(RiskLevel::High, "never looked at", "c"),
        ]
        .into_iter()
        .inspect(|_| consumed += 1);

        let batch = fold_batch(results);
        assert_eq!(batch.risk_level, RiskLevel::Blocked);
        assert!(batch.drainer_detection.is_blocked);
        assert_eq!(batch.risk_reason, "Transaction #2 in batch: Blocked: reassigns wallet");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_empty_batch_is_high() {
        let batch = fold_batch(Vec::new());
        assert_eq!(batch.risk_level, RiskLevel::High);
        assert_eq!(batch.format, WireFormat::Batch);
    }

    #[test]
    fn test_single_simple_member_stays_simple() {
        let batch = fold_batch(vec![member(RiskLevel::Low, "Simple transfer", "a")]);
        assert!(batch.is_simple_transfer);
        assert_eq!(batch.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_two_simple_members_not_simple() {
        let batch = fold_batch(vec![
            member(RiskLevel::Low, "Simple transfer", "a"),
            member(RiskLevel::Low, "Simple transfer", "a"),
        ]);
        assert!(!batch.is_simple_transfer);
        assert_eq!(batch.program_ids, vec!["a"]);
    }

    #[test]
    fn test_warning_and_degraded_carry_over() {
        let mut warned = member(RiskLevel::Medium, "Warning: authority", "b");
        warned.drainer_detection.warning = true;
        warned.drainer_detection.attack_type = Some(AttackType::SetAuthority);
        warned.drainer_detection.description = "Warning: authority".to_string();

        let unrecognized = DecodedTransaction::unrecognized("Transaction format not recognized");

        let batch = fold_batch(vec![member(RiskLevel::Low, "ok", "a"), warned, unrecognized]);
        assert!(batch.drainer_detection.warning);
        assert_eq!(batch.drainer_detection.attack_type, Some(AttackType::SetAuthority));
        assert_eq!(batch.drainer_detection.confidence, Confidence::Degraded);
        assert_eq!(batch.risk_level, RiskLevel::High);
        assert!(!batch.drainer_detection.is_blocked);
    }
}
