//! CLI command implementations
//!
//! Every command prints pretty JSON to stdout; logs go to stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::FirewallConfig;
use crate::firewall::Firewall;
use crate::risk::types::{DecodeContext, Intent};
use crate::safety::SafetyFinding;

/// Decode one base64 transaction
pub fn decode(firewall: &Firewall, tx: &str, user: Option<&str>, intent: &str) -> Result<()> {
    let context = build_context(user, intent)?;
    let decoded = firewall.decode(tx, Some(&context));
    if decoded.is_blocked() {
        warn!("Transaction blocked: {}", decoded.risk_reason);
    }
    print_json(&decoded)
}

/// Decode transactions signed together, in signing order
pub fn batch(firewall: &Firewall, txs: &[String], user: Option<&str>, intent: &str) -> Result<()> {
    let context = build_context(user, intent)?;
    let decoded = firewall.decode_batch(txs, Some(&context));
    info!(
        "Batch of {} transactions: {}",
        txs.len(),
        decoded.risk_level.label()
    );
    print_json(&decoded)
}

/// Classify EVM call data as an ERC-20 approval
pub fn approval(firewall: &Firewall, to: &str, data: &str) -> Result<()> {
    match firewall.decode_evm_approval(to, data) {
        Some(intent) => print_json(&intent),
        None => {
            info!("Call data is not an ERC-20 approval");
            print_json(&serde_json::Value::Null)
        }
    }
}

/// Aggregate token-safety findings from a JSON file
pub fn verdict(firewall: &Firewall, path: &Path) -> Result<()> {
    let findings = load_findings(path)?;
    print_json(&firewall.compute_verdict(&findings))
}

/// Show effective configuration
pub fn show_config(config: &FirewallConfig, firewall: &Firewall) -> Result<()> {
    let registry = firewall.registry();
    let (safe_owners, dex_aggregators, swap_safe) = registry.allow_list_sizes();

    print_json(&serde_json::json!({
        "logging": { "json": config.logging.json },
        "cache": { "findingsTtlSecs": config.cache.findings_ttl_secs },
        "registry": {
            "knownPrograms": registry.len(),
            "safeOwners": safe_owners,
            "dexAggregators": dex_aggregators,
            "swapSafe": swap_safe,
            "extraPrograms": config.registry.extra_programs.len(),
        },
    }))
}

fn build_context(user: Option<&str>, intent: &str) -> Result<DecodeContext> {
    let intent = Intent::from_str(intent)?;
    let user_pubkey = user
        .map(|user| {
            Pubkey::from_str(user.trim()).with_context(|| format!("Invalid --user address: {}", user))
        })
        .transpose()?;

    Ok(DecodeContext {
        user_pubkey,
        intent,
    })
}

fn load_findings(path: &Path) -> Result<Vec<SafetyFinding>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read findings file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid findings JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::FindingLevel;
    use std::io::Write;

    #[test]
    fn test_build_context() {
        let user = Pubkey::new_unique();
        let context = build_context(Some(&user.to_string()), "swap").unwrap();
        assert_eq!(context.user_pubkey, Some(user));
        assert_eq!(context.intent, Intent::Swap);

        let context = build_context(None, "unknown").unwrap();
        assert!(context.user_pubkey.is_none());

        assert!(build_context(Some("nope"), "swap").is_err());
        assert!(build_context(None, "transfer").is_err());
    }

    #[test]
    fn test_load_findings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"key":"lp","title":"Liquidity","level":"danger","summary":"LP unlocked","verified":"verified"}]"#,
        )
        .unwrap();

        let findings = load_findings(file.path()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, FindingLevel::Danger);

        assert!(load_findings(Path::new("/nonexistent/findings.json")).is_err());
    }
}
