//! Connection configuration.
//!
//! Endpoints arrive already resolved: the coordinator performs no service
//! discovery. Settings load from a TOML file or from the environment; the
//! environment variant carries the local-development defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

const DEFAULT_LLM_ENDPOINT: &str = "http://localhost:8080";
const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_UMS_ENDPOINT: &str = "http://localhost:8042";
const DEFAULT_GPA_DEPLOYMENT: &str = "gpa";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorConfig {
    pub llm: LlmSettings,
    pub gpa: GpaSettings,
    pub ums: UmsSettings,
}

/// The deployment used for routing and synthesis calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmSettings {
    pub endpoint: Url,
    pub deployment: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GpaSettings {
    /// Defaults to the LLM endpoint when unset; the GPA backend is another
    /// deployment on the same platform.
    #[serde(default)]
    pub endpoint: Option<Url>,
    pub deployment: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UmsSettings {
    pub endpoint: Url,
}

impl CoordinatorConfig {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config file {}", path.as_ref().display()))?;
        toml::from_str(&raw).context("parsing coordinator config")
    }

    /// Resolve from the environment, with local-development defaults.
    pub fn from_env() -> Result<Self> {
        let llm_endpoint = env_or("DIAL_ENDPOINT", DEFAULT_LLM_ENDPOINT);
        let ums_endpoint = env_or("UMS_AGENT_ENDPOINT", DEFAULT_UMS_ENDPOINT);
        Ok(Self {
            llm: LlmSettings {
                endpoint: Url::parse(&llm_endpoint).context("DIAL_ENDPOINT is not a valid URL")?,
                deployment: env_or("DEPLOYMENT_NAME", DEFAULT_DEPLOYMENT),
                api_key: std::env::var("DIAL_API_KEY").ok().filter(|v| !v.is_empty()),
            },
            gpa: GpaSettings {
                endpoint: None,
                deployment: env_or("GPA_DEPLOYMENT_NAME", DEFAULT_GPA_DEPLOYMENT),
            },
            ums: UmsSettings {
                endpoint: Url::parse(&ums_endpoint)
                    .context("UMS_AGENT_ENDPOINT is not a valid URL")?,
            },
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
