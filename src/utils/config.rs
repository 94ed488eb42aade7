use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Login credentials for one seeded account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

/// The three seeded accounts the suites authenticate as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedAccounts {
    pub bishop: Credentials,
    pub priest: Credentials,
    pub faithful: Credentials,
}

impl Default for SeedAccounts {
    fn default() -> Self {
        Self {
            bishop: Credentials::new("obispo@diocesis.com", "Pass123!"),
            priest: Credentials::new("padre.parroco@sanmiguel.es", "Pass123!"),
            faithful: Credentials::new("fiel1@ejemplo.com", "Pass123!"),
        }
    }
}

/// Harness configuration: the target server plus the seed fixtures the
/// suites depend on. Defaults match the development seed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessConfig {
    /// Base URL of the API under test, including the global prefix
    pub base_url: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Seeded accounts for bishop, priest and faithful roles
    pub accounts: SeedAccounts,

    /// Diocese the invitation and registration flows attach to
    pub diocese_id: String,

    /// Unused seeded invitation token for the invite validation flow
    pub invite_token: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001/api".to_string(),
            timeout_secs: 15,
            accounts: SeedAccounts::default(),
            diocese_id: "a81d2bd3-c2e2-42ac-b4e7-66b44e4ad358".to_string(),
            invite_token: "ebe0d53471a55634e1e8b0652f19ac1f1a69eac876285928b1ba54d3873f83da"
                .to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load a YAML profile if one was given, then apply environment
    /// overrides. Missing keys fall back to the seeded defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {}", p.display()))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("Invalid config file: {}", p.display()))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// CONFES_BASE_URL and CONFES_TIMEOUT_SECS take precedence over
    /// profile values. Command line flags are applied later by the caller.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CONFES_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(raw) = std::env::var("CONFES_TIMEOUT_SECS") {
            if let Ok(secs) = raw.parse() {
                self.timeout_secs = secs;
            }
        }
    }
}
