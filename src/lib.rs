//! Wallet Firewall Library
//!
//! Decodes untrusted Solana transactions and EVM call data into
//! conservative, explainable risk verdicts before anything is signed.

pub mod cli;
pub mod config;
pub mod error;
pub mod evm;
pub mod firewall;
pub mod registry;
pub mod risk;
pub mod safety;
pub mod solana;

// Re-export commonly used types
pub use config::FirewallConfig;
pub use error::{Error, Result};
pub use evm::ApprovalIntent;
pub use firewall::Firewall;
pub use registry::ProgramRegistry;
pub use risk::{DecodeContext, DecodedTransaction, Intent, RiskLevel, Verdict};
pub use safety::{FindingLevel, FindingsCache, SafetyFinding, Verification};
