//! Drainer pattern matcher
//!
//! Scans every instruction for the two account-takeover shapes seen in
//! wallet drainers:
//!
//! - **Assign**: a System `Assign` that hands the wallet's own account to a
//!   program outside the safe-owner list. Always blocks.
//! - **SetAuthority**: a token `SetAuthority` that moves an authority held
//!   by the wallet to someone else. Ignored for the close-authority step some
//!   swap routers perform, downgraded to a warning when the caller declared a
//!   swap or dApp intent, blocked otherwise.
//!
//! Per-instruction parse failures skip that instruction and mark the result
//! [`Confidence::Degraded`]. A degraded scan never blocks on its own; the
//! standard classifier still runs and treats it as a reason to raise risk.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use super::decoder::{DecodedInstruction, KeyRef};
use super::instruction::{AssignInstruction, AuthorityKind, SetAuthorityInstruction};
use crate::error::{Error, Result};
use crate::registry::programs::{SYSTEM_PROGRAM, TOKEN_2022_PROGRAM, TOKEN_PROGRAM};
use crate::registry::{short_address, ProgramRegistry};
use crate::risk::types::DecodeContext;

/// Attack signature that triggered a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttackType {
    SetAuthority,
    Assign,
}

impl std::fmt::Display for AttackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttackType::SetAuthority => write!(f, "SetAuthority"),
            AttackType::Assign => write!(f, "Assign"),
        }
    }
}

/// Whether every instruction could be inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Complete,
    /// Some instructions were skipped; absence of a match proves less
    Degraded,
}

/// Outcome of a drainer scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainerDetection {
    pub is_blocked: bool,
    pub attack_type: Option<AttackType>,
    pub description: String,
    pub confidence: Confidence,
    /// Instructions the scan had to skip
    pub skipped_instructions: usize,
    /// A SetAuthority match was downgraded to a warning
    pub warning: bool,
    /// Index of the instruction that produced the block or warning
    pub instruction_index: Option<usize>,
}

impl DrainerDetection {
    /// Clean scan, nothing found
    pub fn clear() -> Self {
        Self {
            is_blocked: false,
            attack_type: None,
            description: "No drainer patterns detected".to_string(),
            confidence: Confidence::Complete,
            skipped_instructions: 0,
            warning: false,
            instruction_index: None,
        }
    }

    /// Placeholder for payloads that never reached the matcher
    pub fn not_inspected() -> Self {
        Self {
            description: "Drainer checks did not run: transaction could not be decoded"
                .to_string(),
            confidence: Confidence::Degraded,
            ..Self::clear()
        }
    }

    fn blocked(attack_type: AttackType, index: usize, description: String) -> Self {
        Self {
            is_blocked: true,
            attack_type: Some(attack_type),
            description,
            instruction_index: Some(index),
            ..Self::clear()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.confidence == Confidence::Degraded
    }

    fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped_instructions = skipped;
        if skipped > 0 {
            self.confidence = Confidence::Degraded;
        }
        self
    }
}

/// Per-instruction result
#[derive(Debug, Clone, PartialEq, Eq)]
enum Signal {
    Clear,
    /// Matched the close-authority pattern used by swap routers
    Ignored,
    Warn(AttackType, String),
    Block(AttackType, String),
}

/// Scans decoded instructions for known drainer shapes
pub struct DrainerMatcher<'a> {
    registry: &'a ProgramRegistry,
}

impl<'a> DrainerMatcher<'a> {
    pub fn new(registry: &'a ProgramRegistry) -> Self {
        Self { registry }
    }

    /// Scan all instructions, stopping early only on a confirmed block
    ///
    /// `context.user_pubkey` must already be filled in (the firewall falls
    /// back to the fee payer). Without a wallet address nothing can be
    /// compared, so the scan reports itself degraded.
    pub fn detect(
        &self,
        instructions: &[DecodedInstruction],
        context: &DecodeContext,
    ) -> DrainerDetection {
        let Some(wallet) = context.user_pubkey else {
            warn!("Drainer scan has no wallet address to compare against");
            return DrainerDetection {
                description: "Drainer checks incomplete: wallet address unknown".to_string(),
                confidence: Confidence::Degraded,
                ..DrainerDetection::clear()
            }
            .with_skipped(instructions.len());
        };

        let touches_swap_safe = instructions.iter().any(|ix| {
            ix.program
                .as_static()
                .is_some_and(|program| self.registry.is_swap_safe(program))
        });

        let mut skipped = 0usize;
        let mut warning: Option<(usize, AttackType, String)> = None;

        for (index, ix) in instructions.iter().enumerate() {
            match self.inspect(ix, &wallet, context, touches_swap_safe) {
                Ok(Signal::Clear) => {}
                Ok(Signal::Ignored) => {
                    debug!("Instruction {}: close-authority handoff inside swap, ignored", index);
                }
                Ok(Signal::Warn(attack, description)) => {
                    debug!("Instruction {}: {} downgraded to warning", index, attack);
                    if warning.is_none() {
                        warning = Some((index, attack, description));
                    }
                }
                Ok(Signal::Block(attack, description)) => {
                    warn!("Instruction {}: {} drainer pattern, blocking", index, attack);
                    return DrainerDetection::blocked(attack, index, description)
                        .with_skipped(skipped);
                }
                Err(e) => {
                    debug!("Instruction {} skipped by drainer scan: {}", index, e);
                    skipped += 1;
                }
            }
        }

        let detection = match warning {
            Some((index, attack, description)) => DrainerDetection {
                attack_type: Some(attack),
                description,
                warning: true,
                instruction_index: Some(index),
                ..DrainerDetection::clear()
            },
            None if skipped > 0 => {
                warn!("Drainer scan incomplete: {} instruction(s) skipped", skipped);
                DrainerDetection {
                    description: format!(
                        "Drainer checks incomplete: {} instruction(s) could not be inspected",
                        skipped
                    ),
                    ..DrainerDetection::clear()
                }
            }
            None => DrainerDetection::clear(),
        };

        detection.with_skipped(skipped)
    }

    fn inspect(
        &self,
        ix: &DecodedInstruction,
        wallet: &Pubkey,
        context: &DecodeContext,
        touches_swap_safe: bool,
    ) -> Result<Signal> {
        let program = match ix.program {
            KeyRef::Static(program) => program,
            KeyRef::LookupTable { index } => return Err(Error::UnresolvedAccount(index)),
        };

        if program == SYSTEM_PROGRAM {
            return self.inspect_assign(ix, wallet);
        }
        if program == TOKEN_PROGRAM || program == TOKEN_2022_PROGRAM {
            return self.inspect_set_authority(ix, wallet, context, touches_swap_safe);
        }
        Ok(Signal::Clear)
    }

    fn inspect_assign(&self, ix: &DecodedInstruction, wallet: &Pubkey) -> Result<Signal> {
        let Some(assign) = AssignInstruction::parse(&ix.data)? else {
            return Ok(Signal::Clear);
        };

        // The assigned account must sign, and signers are always static keys
        if !ix.account(0)?.is(wallet) {
            return Ok(Signal::Clear);
        }

        if self.registry.is_safe_owner(&assign.owner) {
            return Ok(Signal::Clear);
        }

        Ok(Signal::Block(
            AttackType::Assign,
            format!(
                "Blocked: this transaction reassigns ownership of your wallet account to program {}",
                short_address(&assign.owner)
            ),
        ))
    }

    fn inspect_set_authority(
        &self,
        ix: &DecodedInstruction,
        wallet: &Pubkey,
        context: &DecodeContext,
        touches_swap_safe: bool,
    ) -> Result<Signal> {
        let Some(set_authority) = SetAuthorityInstruction::parse(&ix.data)? else {
            return Ok(Signal::Clear);
        };

        if !ix.account(1)?.is(wallet) {
            return Ok(Signal::Clear);
        }

        let new_authority = match set_authority.new_authority {
            Some(new_authority) if new_authority != *wallet => new_authority,
            _ => return Ok(Signal::Clear),
        };

        if touches_swap_safe && set_authority.authority_type == AuthorityKind::CloseAccount {
            return Ok(Signal::Ignored);
        }

        let description = format!(
            "Token {} authority moves from your wallet to {}",
            set_authority.authority_type,
            short_address(&new_authority)
        );

        if context.intent.is_declared() {
            return Ok(Signal::Warn(
                AttackType::SetAuthority,
                format!("Warning: {}", description),
            ));
        }

        Ok(Signal::Block(
            AttackType::SetAuthority,
            format!("Blocked: {}", description),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::programs::JUPITER_V6;
    use crate::risk::types::Intent;
    use solana_sdk::system_instruction;
    use spl_token::instruction::AuthorityType;

    fn static_ix(program: Pubkey, data: Vec<u8>, accounts: &[Pubkey]) -> DecodedInstruction {
        DecodedInstruction {
            program: KeyRef::Static(program),
            data,
            accounts: accounts.iter().map(|key| KeyRef::Static(*key)).collect(),
        }
    }

    fn set_authority_ix(
        wallet: &Pubkey,
        new_authority: &Pubkey,
        kind: AuthorityType,
    ) -> DecodedInstruction {
        let token_account = Pubkey::new_unique();
        let ix = spl_token::instruction::set_authority(
            &spl_token::ID,
            &token_account,
            Some(new_authority),
            kind,
            wallet,
            &[],
        )
        .unwrap();
        static_ix(TOKEN_PROGRAM, ix.data, &[token_account, *wallet])
    }

    /// Raw `SetAuthority` under Token-2022: `[6, kind, 1, new_authority]`
    fn token_2022_set_authority_ix(
        wallet: &Pubkey,
        new_authority: &Pubkey,
        kind: u8,
    ) -> DecodedInstruction {
        let mut data = vec![6, kind, 1];
        data.extend_from_slice(new_authority.as_ref());
        static_ix(TOKEN_2022_PROGRAM, data, &[Pubkey::new_unique(), *wallet])
    }

    fn jupiter_ix(wallet: &Pubkey) -> DecodedInstruction {
        static_ix(JUPITER_V6, vec![0xe5, 0x17, 0xcb, 0x97], &[*wallet])
    }

    fn assign_ix(account: &Pubkey, owner: &Pubkey) -> DecodedInstruction {
        let ix = system_instruction::assign(account, owner);
        static_ix(SYSTEM_PROGRAM, ix.data, &[*account])
    }

    #[test]
    fn test_assign_to_unknown_owner_blocks() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![assign_ix(&wallet, &Pubkey::new_unique())];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Swap));

        assert!(detection.is_blocked);
        assert_eq!(detection.attack_type, Some(AttackType::Assign));
        assert_eq!(detection.instruction_index, Some(0));
    }

    #[test]
    fn test_assign_to_safe_owner_is_clear() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![assign_ix(&wallet, &TOKEN_PROGRAM)];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert_eq!(detection, DrainerDetection::clear());
    }

    #[test]
    fn test_assign_of_other_account_is_clear() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let fresh = Pubkey::new_unique();
        let instructions = vec![assign_ix(&fresh, &Pubkey::new_unique())];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert!(!detection.is_blocked);
    }

    #[test]
    fn test_set_authority_without_intent_blocks() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![set_authority_ix(
            &wallet,
            &Pubkey::new_unique(),
            AuthorityType::AccountOwner,
        )];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert!(detection.is_blocked);
        assert_eq!(detection.attack_type, Some(AttackType::SetAuthority));
    }

    #[test]
    fn test_set_authority_with_swap_intent_warns() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![set_authority_ix(
            &wallet,
            &Pubkey::new_unique(),
            AuthorityType::AccountOwner,
        )];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Dapp));

        assert!(!detection.is_blocked);
        assert!(detection.warning);
        assert_eq!(detection.attack_type, Some(AttackType::SetAuthority));
    }

    #[test]
    fn test_token_2022_set_authority_without_intent_blocks() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![token_2022_set_authority_ix(&wallet, &Pubkey::new_unique(), 2)];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert!(detection.is_blocked);
        assert_eq!(detection.attack_type, Some(AttackType::SetAuthority));
        assert!(detection.description.contains("account owner"));
    }

    #[test]
    fn test_token_2022_extension_authority() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![token_2022_set_authority_ix(&wallet, &Pubkey::new_unique(), 12)];
        let matcher = DrainerMatcher::new(&registry);

        let detection = matcher.detect(&instructions, &DecodeContext::new(wallet, Intent::Swap));
        assert!(!detection.is_blocked);
        assert!(detection.warning);
        assert_eq!(detection.confidence, Confidence::Complete);
        assert!(detection.description.contains("extension #12"));

        let detection = matcher.detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));
        assert!(detection.is_blocked);
        assert_eq!(detection.attack_type, Some(AttackType::SetAuthority));
    }

    #[test]
    fn test_close_authority_inside_swap_is_ignored() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![
            jupiter_ix(&wallet),
            set_authority_ix(&wallet, &Pubkey::new_unique(), AuthorityType::CloseAccount),
        ];

        for intent in [Intent::Swap, Intent::Unknown] {
            let detection = DrainerMatcher::new(&registry)
                .detect(&instructions, &DecodeContext::new(wallet, intent));
            assert_eq!(detection, DrainerDetection::clear());
        }
    }

    #[test]
    fn test_close_authority_without_swap_program_still_blocks() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![set_authority_ix(
            &wallet,
            &Pubkey::new_unique(),
            AuthorityType::CloseAccount,
        )];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert!(detection.is_blocked);
    }

    #[test]
    fn test_set_authority_to_self_is_clear() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![set_authority_ix(&wallet, &wallet, AuthorityType::AccountOwner)];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert!(!detection.is_blocked);
        assert!(!detection.warning);
    }

    #[test]
    fn test_malformed_instruction_skipped_and_scan_continues() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![
            static_ix(SYSTEM_PROGRAM, vec![1, 0, 0, 0, 9], &[wallet]),
            assign_ix(&wallet, &Pubkey::new_unique()),
        ];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert!(detection.is_blocked);
        assert_eq!(detection.instruction_index, Some(1));
        assert_eq!(detection.skipped_instructions, 1);
        assert!(detection.is_degraded());
    }

    #[test]
    fn test_degraded_scan_does_not_block() {
        let registry = ProgramRegistry::default();
        let wallet = Pubkey::new_unique();
        let instructions = vec![
            static_ix(TOKEN_PROGRAM, vec![6, 2], &[Pubkey::new_unique(), wallet]),
            DecodedInstruction {
                program: KeyRef::LookupTable { index: 4 },
                data: vec![],
                accounts: vec![],
            },
        ];

        let detection = DrainerMatcher::new(&registry)
            .detect(&instructions, &DecodeContext::new(wallet, Intent::Unknown));

        assert!(!detection.is_blocked);
        assert!(detection.is_degraded());
        assert_eq!(detection.skipped_instructions, 2);
        assert!(detection.description.contains("incomplete"));
    }

    #[test]
    fn test_missing_wallet_is_degraded() {
        let registry = ProgramRegistry::default();
        let instructions = vec![jupiter_ix(&Pubkey::new_unique())];

        let detection =
            DrainerMatcher::new(&registry).detect(&instructions, &DecodeContext::default());

        assert!(!detection.is_blocked);
        assert!(detection.is_degraded());
    }

    #[test]
    fn test_fixture_registry_changes_safe_owners() {
        let custom_owner = Pubkey::new_unique();
        let registry = ProgramRegistry::empty().safe_owner(custom_owner).build();
        let wallet = Pubkey::new_unique();

        let matcher = DrainerMatcher::new(&registry);
        let context = DecodeContext::new(wallet, Intent::Unknown);

        assert!(!matcher.detect(&[assign_ix(&wallet, &custom_owner)], &context).is_blocked);
        // Only the custom owner is safe in this fixture
        assert!(matcher.detect(&[assign_ix(&wallet, &TOKEN_PROGRAM)], &context).is_blocked);
    }
}
