//! Well-known Solana program IDs
//!
//! # Updating these tables
//! Entries are append-only. Adding a program here changes how transactions
//! touching it are labelled and classified, so every addition should come
//! with a test in `registry::tests` that pins which lists it belongs to.

use solana_sdk::pubkey::Pubkey;

// === Native programs ===

pub const SYSTEM_PROGRAM: Pubkey = solana_sdk::pubkey!("11111111111111111111111111111111");
pub const COMPUTE_BUDGET_PROGRAM: Pubkey =
    solana_sdk::pubkey!("ComputeBudget111111111111111111111111111111");
pub const ADDRESS_LOOKUP_TABLE_PROGRAM: Pubkey =
    solana_sdk::pubkey!("AddressLookupTab1e1111111111111111111111111");
pub const VOTE_PROGRAM: Pubkey = solana_sdk::pubkey!("Vote111111111111111111111111111111111111111");
pub const STAKE_PROGRAM: Pubkey =
    solana_sdk::pubkey!("Stake11111111111111111111111111111111111111");
pub const BPF_LOADER_UPGRADEABLE: Pubkey =
    solana_sdk::pubkey!("BPFLoaderUpgradeab1e11111111111111111111111");

// === SPL programs ===

pub const TOKEN_PROGRAM: Pubkey =
    solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const TOKEN_2022_PROGRAM: Pubkey =
    solana_sdk::pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
pub const ASSOCIATED_TOKEN_PROGRAM: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const MEMO_PROGRAM: Pubkey =
    solana_sdk::pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");
pub const TOKEN_METADATA_PROGRAM: Pubkey =
    solana_sdk::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

// === Aggregators ===

pub const JUPITER_V6: Pubkey = solana_sdk::pubkey!("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4");
pub const JUPITER_V4: Pubkey = solana_sdk::pubkey!("JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB");

// === AMMs and order books ===

pub const RAYDIUM_AMM_V4: Pubkey =
    solana_sdk::pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");
pub const RAYDIUM_CLMM: Pubkey =
    solana_sdk::pubkey!("CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK");
pub const RAYDIUM_CPMM: Pubkey =
    solana_sdk::pubkey!("CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C");
pub const ORCA_WHIRLPOOL: Pubkey =
    solana_sdk::pubkey!("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc");
pub const ORCA_TOKEN_SWAP_V2: Pubkey =
    solana_sdk::pubkey!("9W959DqEETiGZocYWCQPaJ6sBmUzgfxXfqGeTEdp3aQP");
pub const METEORA_DLMM: Pubkey =
    solana_sdk::pubkey!("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo");
pub const METEORA_POOLS: Pubkey =
    solana_sdk::pubkey!("Eo7WjKq67rjJQSZxS6z3YkapzY3eMj6Xy8X5EQVn5UaB");
pub const PHOENIX: Pubkey = solana_sdk::pubkey!("PhoeNiXZ8ByJGLkxNfZRnkUfjvmuYqLR89jjFHGqdXY");
pub const OPENBOOK_V2: Pubkey = solana_sdk::pubkey!("opnb2LAfJYbRMAHHvqjCwQxanZn7ReEHp1k81EohpZb");
pub const LIFINITY_V2: Pubkey =
    solana_sdk::pubkey!("2wT8Yq49kHgDzXuPxZSaeLaH1qbmGXtEyPy64bL7aD3c");
pub const PUMP_FUN: Pubkey = solana_sdk::pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
pub const PUMP_AMM: Pubkey = solana_sdk::pubkey!("pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA");

/// Display labels for every program the engine recognises
pub const KNOWN_PROGRAMS: &[(Pubkey, &str)] = &[
    (SYSTEM_PROGRAM, "System Program"),
    (COMPUTE_BUDGET_PROGRAM, "Compute Budget"),
    (ADDRESS_LOOKUP_TABLE_PROGRAM, "Address Lookup Table"),
    (VOTE_PROGRAM, "Vote Program"),
    (STAKE_PROGRAM, "Stake Program"),
    (BPF_LOADER_UPGRADEABLE, "BPF Upgradeable Loader"),
    (TOKEN_PROGRAM, "SPL Token"),
    (TOKEN_2022_PROGRAM, "Token-2022"),
    (ASSOCIATED_TOKEN_PROGRAM, "Associated Token Account"),
    (MEMO_PROGRAM, "Memo"),
    (TOKEN_METADATA_PROGRAM, "Metaplex Token Metadata"),
    (JUPITER_V6, "Jupiter Aggregator v6"),
    (JUPITER_V4, "Jupiter Aggregator v4"),
    (RAYDIUM_AMM_V4, "Raydium AMM v4"),
    (RAYDIUM_CLMM, "Raydium CLMM"),
    (RAYDIUM_CPMM, "Raydium CPMM"),
    (ORCA_WHIRLPOOL, "Orca Whirlpool"),
    (ORCA_TOKEN_SWAP_V2, "Orca Token Swap v2"),
    (METEORA_DLMM, "Meteora DLMM"),
    (METEORA_POOLS, "Meteora Pools"),
    (PHOENIX, "Phoenix"),
    (OPENBOOK_V2, "OpenBook v2"),
    (LIFINITY_V2, "Lifinity v2"),
    (PUMP_FUN, "Pump.fun"),
    (PUMP_AMM, "Pump.fun AMM"),
];

/// Owners an account may legitimately be reassigned to
pub const SAFE_OWNERS: &[Pubkey] = &[
    SYSTEM_PROGRAM,
    TOKEN_PROGRAM,
    ASSOCIATED_TOKEN_PROGRAM,
    COMPUTE_BUDGET_PROGRAM,
];

/// Routers whose presence marks a transaction as a DEX swap
pub const DEX_AGGREGATORS: &[Pubkey] = &[JUPITER_V6, JUPITER_V4];

/// Programs under which authority changes on close are a known routing step
///
/// Superset of [`DEX_AGGREGATORS`].
pub const SWAP_SAFE_PROGRAMS: &[Pubkey] = &[
    JUPITER_V6,
    JUPITER_V4,
    RAYDIUM_AMM_V4,
    RAYDIUM_CLMM,
    RAYDIUM_CPMM,
    ORCA_WHIRLPOOL,
    ORCA_TOKEN_SWAP_V2,
    METEORA_DLMM,
    METEORA_POOLS,
    PHOENIX,
    OPENBOOK_V2,
    LIFINITY_V2,
    PUMP_FUN,
    PUMP_AMM,
];

/// Programs a "simple transfer" may touch
pub const TRANSFER_PROGRAMS: &[Pubkey] = &[SYSTEM_PROGRAM, TOKEN_PROGRAM, TOKEN_2022_PROGRAM];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_ids_match_sdk() {
        assert_eq!(SYSTEM_PROGRAM, solana_sdk::system_program::ID);
        assert_eq!(TOKEN_PROGRAM, spl_token::ID);
        assert_eq!(ASSOCIATED_TOKEN_PROGRAM, spl_associated_token_account::ID);
    }

    #[test]
    fn test_aggregators_are_swap_safe() {
        for aggregator in DEX_AGGREGATORS {
            assert!(SWAP_SAFE_PROGRAMS.contains(aggregator));
        }
    }

    #[test]
    fn test_every_listed_program_has_a_label() {
        let labelled: Vec<Pubkey> = KNOWN_PROGRAMS.iter().map(|(id, _)| *id).collect();
        for id in SAFE_OWNERS.iter().chain(SWAP_SAFE_PROGRAMS).chain(TRANSFER_PROGRAMS) {
            assert!(labelled.contains(id), "{} has no label", id);
        }
    }
}
