//! Configuration loading and validation
//!
//! Only the binary reads configuration. The library engine takes a
//! [`ProgramRegistry`] and never looks at files or the environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::firewall::Firewall;
use crate::registry::ProgramRegistry;
use crate::safety::FindingsCache;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FirewallConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Log output settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Deployment-specific additions to the built-in program tables
///
/// Entries extend the production registry; they can never remove or
/// relabel a built-in program.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub extra_programs: Vec<ProgramLabel>,
    #[serde(default)]
    pub extra_dex_aggregators: Vec<String>,
    #[serde(default)]
    pub extra_swap_safe: Vec<String>,
    #[serde(default)]
    pub extra_safe_owners: Vec<String>,
}

/// A labelled program id
///
/// Kept as a list of tables rather than a map: configuration keys may be
/// case-folded, base58 values are not.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramLabel {
    pub id: String,
    pub label: String,
}

/// Token-safety findings cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_findings_ttl_secs")]
    pub findings_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            findings_ttl_secs: default_findings_ttl_secs(),
        }
    }
}

fn default_findings_ttl_secs() -> u64 {
    300
}

impl FirewallConfig {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .set_default("cache.findings_ttl_secs", default_findings_ttl_secs() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix FIREWALL_)
            .add_source(
                config::Environment::with_prefix("FIREWALL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: FirewallConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.cache.findings_ttl_secs == 0 {
            anyhow::bail!("cache.findings_ttl_secs must be positive");
        }

        for entry in &self.registry.extra_programs {
            parse_program_id(&entry.id).context("Invalid id in registry.extra_programs")?;
            if entry.label.trim().is_empty() {
                anyhow::bail!("registry.extra_programs label for {} is empty", entry.id);
            }
        }
        for (field, ids) in [
            ("registry.extra_dex_aggregators", &self.registry.extra_dex_aggregators),
            ("registry.extra_swap_safe", &self.registry.extra_swap_safe),
            ("registry.extra_safe_owners", &self.registry.extra_safe_owners),
        ] {
            for id in ids {
                parse_program_id(id).with_context(|| format!("Invalid entry in {}", field))?;
            }
        }

        Ok(())
    }

    /// Production registry plus the configured additions
    pub fn build_registry(&self) -> Result<ProgramRegistry> {
        let mut builder = ProgramRegistry::builder();

        for entry in &self.registry.extra_programs {
            builder = builder.program(parse_program_id(&entry.id)?, &entry.label);
        }
        for id in &self.registry.extra_dex_aggregators {
            builder = builder.dex_aggregator(parse_program_id(id)?);
        }
        for id in &self.registry.extra_swap_safe {
            builder = builder.swap_safe(parse_program_id(id)?);
        }
        for id in &self.registry.extra_safe_owners {
            builder = builder.safe_owner(parse_program_id(id)?);
        }

        Ok(builder.build())
    }

    pub fn findings_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.findings_ttl_secs)
    }

    /// Engine configured from this file
    pub fn build_firewall(&self) -> Result<Firewall> {
        let registry = self.build_registry()?;
        Ok(Firewall::with_registry(Arc::new(registry))
            .with_findings_cache(FindingsCache::new(self.findings_ttl())))
    }
}

fn parse_program_id(id: &str) -> Result<Pubkey> {
    Pubkey::from_str(id.trim()).with_context(|| format!("'{}' is not a base58 public key", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::programs::SYSTEM_PROGRAM;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = FirewallConfig::default();
        assert!(!config.logging.json);
        assert_eq!(config.cache.findings_ttl_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FirewallConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.findings_ttl(), Duration::from_secs(300));
        assert!(config.registry.extra_programs.is_empty());
    }

    #[test]
    fn test_load_registry_extensions() {
        let router = Pubkey::new_unique();
        let file = write_config(&format!(
            r#"
[logging]
json = true

[registry]
extra_dex_aggregators = ["{router}"]

[[registry.extra_programs]]
id = "{router}"
label = "In-house router"

[cache]
findings_ttl_secs = 60
"#
        ));

        let config = FirewallConfig::load(file.path()).unwrap();
        assert!(config.logging.json);
        assert_eq!(config.findings_ttl(), Duration::from_secs(60));

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.label(&router), Some("In-house router"));
        assert!(registry.is_dex_aggregator(&router));
        assert!(registry.is_swap_safe(&router));
        assert_eq!(registry.label(&SYSTEM_PROGRAM), Some("System Program"));
    }

    #[test]
    fn test_rejects_invalid_program_id() {
        let file = write_config(
            r#"
[registry]
extra_safe_owners = ["not-a-pubkey"]
"#,
        );
        assert!(FirewallConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let mut config = FirewallConfig::default();
        config.cache.findings_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_firewall_uses_ttl() {
        let mut config = FirewallConfig::default();
        config.cache.findings_ttl_secs = 42;
        let firewall = config.build_firewall().unwrap();
        assert_eq!(firewall.findings_cache().ttl(), Duration::from_secs(42));
    }
}
