//! Refinery configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main Refinery configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Refinement session defaults
    pub refine: RefineConfig,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// 1. Explicit path (errors are fatal)
    /// 2. `./.refinery.yml`
    /// 3. `~/.config/refinery/refinery.yml`
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(p) => Some(p.clone()),
            None => Self::candidate_paths().into_iter().find(|p| p.exists()),
        }?;
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".refinery.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("refinery").join("refinery.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Default provider and model as `provider/model`
    pub default: String,

    /// Upper bound on tokens per response; per-call budgets are capped by this
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Known providers keyed by id
    ///
    /// User entries are merged field by field over the built-in providers.
    #[serde(deserialize_with = "merge_providers")]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default: "anthropic/claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            timeout_ms: 60_000,
            providers: builtin_providers(),
        }
    }
}

fn builtin_providers() -> BTreeMap<String, ProviderConfig> {
    let entry = |key_env: &str, base_url: &str, model: &str| ProviderConfig {
        api_key_env: key_env.to_string(),
        base_url: base_url.to_string(),
        default_model: model.to_string(),
    };
    BTreeMap::from([
        (
            "anthropic".to_string(),
            entry("ANTHROPIC_API_KEY", "https://api.anthropic.com", "claude-sonnet-4-20250514"),
        ),
        ("openai".to_string(), entry("OPENAI_API_KEY", "https://api.openai.com", "gpt-4o")),
        (
            "gemini".to_string(),
            entry(
                "GEMINI_API_KEY",
                "https://generativelanguage.googleapis.com",
                "gemini-2.0-flash",
            ),
        ),
    ])
}

/// Provider entry as written in a config file; absent fields keep the built-in value
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderOverride {
    #[serde(rename = "api-key-env")]
    api_key_env: Option<String>,
    #[serde(rename = "base-url")]
    base_url: Option<String>,
    #[serde(rename = "default-model")]
    default_model: Option<String>,
}

fn merge_providers<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, ProviderConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = Option::<BTreeMap<String, ProviderOverride>>::deserialize(deserializer)?.unwrap_or_default();
    let mut providers = builtin_providers();
    for (id, o) in overrides {
        let entry = providers.entry(id).or_default();
        if let Some(v) = o.api_key_env {
            entry.api_key_env = v;
        }
        if let Some(v) = o.base_url {
            entry.base_url = v;
        }
        if let Some(v) = o.default_model {
            entry.default_model = v;
        }
    }
    Ok(providers)
}

impl LlmConfig {
    /// Resolve with optional overrides
    ///
    /// A provider override without a model override uses that provider's
    /// `default-model`; a model override alone keeps the default provider.
    pub fn resolve_with(&self, provider: Option<&str>, model: Option<&str>) -> Result<ResolvedLlmConfig> {
        debug!(default = %self.default, ?provider, ?model, "LlmConfig::resolve_with: called");
        let (default_provider, default_model) = self
            .default
            .split_once('/')
            .filter(|(p, m)| !p.is_empty() && !m.is_empty())
            .ok_or_else(|| eyre!("Invalid llm.default '{}': expected 'provider/model'", self.default))?;

        let provider_name = provider.unwrap_or(default_provider);
        let provider_config = self.providers.get(provider_name).ok_or_else(|| {
            let known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            eyre!("Unknown provider '{}'. Configured: {}", provider_name, known.join(", "))
        })?;

        let model = match (provider, model) {
            (_, Some(m)) => m.to_string(),
            (Some(p), None) if p != default_provider => provider_config.default_model.clone(),
            _ => default_model.to_string(),
        };

        if provider_config.base_url.trim().is_empty() {
            return Err(eyre!("Provider '{}' has no base-url configured", provider_name));
        }
        if model.trim().is_empty() {
            return Err(eyre!("No model configured for provider '{}'", provider_name));
        }

        Ok(ResolvedLlmConfig {
            provider: provider_name.to_string(),
            model,
            api_key_env: provider_config.api_key_env.clone(),
            base_url: provider_config.base_url.clone(),
            max_tokens: self.max_tokens,
            timeout_ms: self.timeout_ms,
        })
    }
}

/// Per-provider connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Model used when this provider is selected without an explicit model
    #[serde(rename = "default-model")]
    pub default_model: String,
}

/// A fully resolved provider/model selection, ready to build a client from
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl ResolvedLlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        debug!(%self.api_key_env, "ResolvedLlmConfig::get_api_key: called");
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(eyre!(
                "API key for provider '{}' not found. Set the {} environment variable.",
                self.provider,
                self.api_key_env
            )),
        }
    }

    /// Whether the API key environment variable is present
    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_ok()
    }
}

/// Refinement session defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Always use the static question set instead of asking the LLM
    #[serde(rename = "static-questions")]
    pub static_questions: bool,

    /// Ask clarifying questions even for analysis tasks
    #[serde(rename = "force-questions")]
    pub force_questions: bool,
}
