//! Program registry
//!
//! Immutable tables the decoder and classifier consult: display labels for
//! known programs plus three allow-lists (safe reassignment owners, DEX
//! aggregators, swap-safe programs). The engine receives a registry by
//! value at construction, so tests can substitute fixtures and deployments
//! can append entries without touching the decode/classify code.

pub mod programs;

use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

lazy_static::lazy_static! {
    /// Production tables, built once and shared
    static ref DEFAULT_REGISTRY: Arc<ProgramRegistry> = Arc::new(ProgramRegistry::builder().build());
}

/// Lookup tables for program identities
#[derive(Debug, Clone)]
pub struct ProgramRegistry {
    labels: HashMap<Pubkey, String>,
    safe_owners: HashSet<Pubkey>,
    dex_aggregators: HashSet<Pubkey>,
    swap_safe: HashSet<Pubkey>,
    transfer_programs: HashSet<Pubkey>,
}

impl ProgramRegistry {
    /// Shared handle to the production tables
    pub fn shared() -> Arc<ProgramRegistry> {
        Arc::clone(&DEFAULT_REGISTRY)
    }

    /// Builder pre-loaded with the production tables
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::production()
    }

    /// Builder with no entries at all (for fixtures)
    pub fn empty() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn label(&self, program: &Pubkey) -> Option<&str> {
        self.labels.get(program).map(String::as_str)
    }

    pub fn is_known(&self, program: &Pubkey) -> bool {
        self.labels.contains_key(program)
    }

    pub fn is_safe_owner(&self, owner: &Pubkey) -> bool {
        self.safe_owners.contains(owner)
    }

    pub fn is_dex_aggregator(&self, program: &Pubkey) -> bool {
        self.dex_aggregators.contains(program)
    }

    pub fn is_swap_safe(&self, program: &Pubkey) -> bool {
        self.swap_safe.contains(program)
    }

    /// Programs a simple transfer may touch (System and the token programs)
    pub fn is_transfer_program(&self, program: &Pubkey) -> bool {
        self.transfer_programs.contains(program)
    }

    /// Label for display, falling back to a shortened address
    pub fn display_label(&self, program: &Pubkey) -> String {
        match self.label(program) {
            Some(label) => label.to_string(),
            None => format!("Unknown program ({})", short_address(program)),
        }
    }

    /// Number of labelled programs
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sizes of the three allow-lists, in (safe owners, aggregators, swap-safe) order
    pub fn allow_list_sizes(&self) -> (usize, usize, usize) {
        (
            self.safe_owners.len(),
            self.dex_aggregators.len(),
            self.swap_safe.len(),
        )
    }
}

impl Default for ProgramRegistry {
    fn default() -> Self {
        DEFAULT_REGISTRY.as_ref().clone()
    }
}

/// Append-only builder for [`ProgramRegistry`]
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    registry: ProgramRegistryParts,
}

#[derive(Debug, Clone, Default)]
struct ProgramRegistryParts {
    labels: HashMap<Pubkey, String>,
    safe_owners: HashSet<Pubkey>,
    dex_aggregators: HashSet<Pubkey>,
    swap_safe: HashSet<Pubkey>,
    transfer_programs: HashSet<Pubkey>,
}

impl RegistryBuilder {
    fn production() -> Self {
        let mut builder = Self::default();
        for (id, label) in programs::KNOWN_PROGRAMS {
            builder = builder.program(*id, label);
        }
        for id in programs::SAFE_OWNERS {
            builder = builder.safe_owner(*id);
        }
        for id in programs::DEX_AGGREGATORS {
            builder = builder.dex_aggregator(*id);
        }
        for id in programs::SWAP_SAFE_PROGRAMS {
            builder = builder.swap_safe(*id);
        }
        for id in programs::TRANSFER_PROGRAMS {
            builder = builder.transfer_program(*id);
        }
        builder
    }

    /// Add a display label. Existing labels are kept.
    pub fn program(mut self, id: Pubkey, label: &str) -> Self {
        self.registry
            .labels
            .entry(id)
            .or_insert_with(|| label.to_string());
        self
    }

    pub fn safe_owner(mut self, id: Pubkey) -> Self {
        self.registry.safe_owners.insert(id);
        self
    }

    /// Aggregators are always swap-safe as well
    pub fn dex_aggregator(mut self, id: Pubkey) -> Self {
        self.registry.dex_aggregators.insert(id);
        self.registry.swap_safe.insert(id);
        self
    }

    pub fn swap_safe(mut self, id: Pubkey) -> Self {
        self.registry.swap_safe.insert(id);
        self
    }

    pub fn transfer_program(mut self, id: Pubkey) -> Self {
        self.registry.transfer_programs.insert(id);
        self
    }

    pub fn build(self) -> ProgramRegistry {
        let parts = self.registry;
        ProgramRegistry {
            labels: parts.labels,
            safe_owners: parts.safe_owners,
            dex_aggregators: parts.dex_aggregators,
            swap_safe: parts.swap_safe,
            transfer_programs: parts.transfer_programs,
        }
    }
}

/// First and last four characters of a base58 address
pub fn short_address(key: &Pubkey) -> String {
    let s = key.to_string();
    if s.len() <= 8 {
        return s;
    }
    format!("{}…{}", &s[..4], &s[s.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::programs::*;
    use super::*;

    #[test]
    fn test_production_lists() {
        let registry = ProgramRegistry::default();

        assert!(registry.is_safe_owner(&SYSTEM_PROGRAM));
        assert!(registry.is_safe_owner(&COMPUTE_BUDGET_PROGRAM));
        assert!(!registry.is_safe_owner(&JUPITER_V6));

        assert!(registry.is_dex_aggregator(&JUPITER_V6));
        assert!(!registry.is_dex_aggregator(&RAYDIUM_AMM_V4));

        assert!(registry.is_swap_safe(&RAYDIUM_AMM_V4));
        assert!(registry.is_swap_safe(&JUPITER_V4));

        assert!(registry.is_transfer_program(&TOKEN_2022_PROGRAM));
        assert!(!registry.is_transfer_program(&ASSOCIATED_TOKEN_PROGRAM));
    }

    #[test]
    fn test_labels() {
        let registry = ProgramRegistry::default();
        assert_eq!(registry.label(&JUPITER_V6), Some("Jupiter Aggregator v6"));

        let stranger = Pubkey::new_unique();
        assert!(!registry.is_known(&stranger));
        assert!(registry.display_label(&stranger).starts_with("Unknown program ("));
    }

    #[test]
    fn test_builder_appends_without_overwriting() {
        let custom = Pubkey::new_unique();
        let registry = ProgramRegistry::builder()
            .program(custom, "In-house router")
            .dex_aggregator(custom)
            .program(SYSTEM_PROGRAM, "Renamed")
            .build();

        assert_eq!(registry.label(&custom), Some("In-house router"));
        assert!(registry.is_dex_aggregator(&custom));
        assert!(registry.is_swap_safe(&custom));
        assert_eq!(registry.label(&SYSTEM_PROGRAM), Some("System Program"));
    }

    #[test]
    fn test_empty_fixture() {
        let registry = ProgramRegistry::empty().program(SYSTEM_PROGRAM, "sys").build();
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_safe_owner(&SYSTEM_PROGRAM));
        assert_eq!(registry.allow_list_sizes(), (0, 0, 0));
        assert!(!registry.is_transfer_program(&SYSTEM_PROGRAM));

        let registry = ProgramRegistry::empty().transfer_program(SYSTEM_PROGRAM).build();
        assert!(registry.is_transfer_program(&SYSTEM_PROGRAM));
        assert!(!registry.is_transfer_program(&TOKEN_PROGRAM));
    }

    #[test]
    fn test_short_address() {
        let short = short_address(&SYSTEM_PROGRAM);
        assert_eq!(short, "1111…1111");
    }
}
