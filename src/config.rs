use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::changes::FileFilter;

const ENV_MODEL: &str = "CODE_REVIEW_MODEL";
const ENV_MAX_TOKENS: &str = "CODE_REVIEW_MAX_TOKENS";
const ENV_TEMPERATURE: &str = "CODE_REVIEW_TEMPERATURE";
const ENV_MAX_SINGLE_FILE_LINES: &str = "CODE_REVIEW_MAX_SINGLE_FILE_LINES";
const ENV_MAX_TOTAL_DIFF_LINES: &str = "CODE_REVIEW_MAX_TOTAL_DIFF_LINES";
const ENV_GLOW_STYLE: &str = "CODE_REVIEW_GLOW_STYLE";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProviderPreset {
    Openai,
    Deepseek,
    Openrouter,
    Xai,
    Nvidia,
}

impl ProviderPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::Openai),
            "deepseek" => Some(Self::Deepseek),
            "openrouter" => Some(Self::Openrouter),
            "xai" => Some(Self::Xai),
            "nvidia" | "nvidia_nim" => Some(Self::Nvidia),
            _ => None,
        }
    }

    pub fn profile(self) -> ProviderProfile {
        let (base_url, api_key_env) = match self {
            Self::Openai => (
                "https://api.openai.com/v1/chat/completions",
                "OPENAI_API_KEY",
            ),
            Self::Deepseek => (
                "https://api.deepseek.com/chat/completions",
                "DEEPSEEK_API_KEY",
            ),
            Self::Openrouter => (
                "https://openrouter.ai/api/v1/chat/completions",
                "OPENROUTER_API_KEY",
            ),
            Self::Xai => ("https://api.x.ai/v1/chat/completions", "XAI_API_KEY"),
            Self::Nvidia => (
                "https://integrate.api.nvidia.com/v1/chat/completions",
                "NVIDIA_API_KEY",
            ),
        };
        ProviderProfile {
            base_url: base_url.to_string(),
            api_key_env: api_key_env.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub base_url: String,
    pub api_key_env: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_single_file_lines: usize,
    pub max_total_diff_lines: usize,
    pub diff_context_lines: u32,
    pub supported_extensions: Vec<String>,
    pub default_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub glow_style: String,
    pub chars_per_token: usize,
    pub max_estimated_tokens: usize,
    pub request_timeout_secs: u64,
    pub providers: BTreeMap<String, ProviderProfile>,
    pub pricing: BTreeMap<String, ModelPrice>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_single_file_lines: 500,
            max_total_diff_lines: 1000,
            diff_context_lines: 3,
            supported_extensions: vec![".php".to_string(), ".py".to_string(), ".js".to_string()],
            default_model: "openai/o4-mini".to_string(),
            max_tokens: 100_000,
            temperature: 0.3,
            glow_style: "dracula".to_string(),
            chars_per_token: 4,
            max_estimated_tokens: 100_000,
            request_timeout_secs: 300,
            providers: BTreeMap::new(),
            pricing: default_pricing(),
        }
    }
}

fn default_pricing() -> BTreeMap<String, ModelPrice> {
    let mut map = BTreeMap::new();
    for (model, input, output) in [
        ("openai/o4-mini", 1.10, 4.40),
        ("openai/gpt-4.1", 2.00, 8.00),
        ("openai/gpt-4.1-mini", 0.40, 1.60),
        ("openai/gpt-4o-mini", 0.15, 0.60),
        ("deepseek/deepseek-chat", 0.27, 1.10),
    ] {
        map.insert(
            model.to_string(),
            ModelPrice {
                input_per_million: input,
                output_per_million: output,
            },
        );
    }
    map
}

impl Config {
    pub fn file_filter(&self) -> FileFilter {
        FileFilter::new(&self.supported_extensions)
    }

    /// Endpoint for the `provider/` prefix of `model`; config entries win over presets.
    pub fn provider_for(&self, model: &str) -> Result<(String, ProviderProfile)> {
        let Some((provider, _)) = model.split_once('/') else {
            bail!("Model should be in format 'provider/model', got '{model}'");
        };
        if let Some(profile) = self.providers.get(provider) {
            return Ok((provider.to_string(), profile.clone()));
        }
        match ProviderPreset::from_name(provider) {
            Some(preset) => Ok((provider.to_string(), preset.profile())),
            None => bail!(
                "Unknown provider '{provider}'. Add [providers.{provider}] to {} or use one of: openai, deepseek, openrouter, xai, nvidia.",
                config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the config file".to_string())
            ),
        }
    }

    pub fn price_for(&self, model: &str) -> Option<ModelPrice> {
        self.pricing.get(model).copied()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_single_file_lines == 0 {
            bail!("max_single_file_lines must be positive");
        }
        if self.max_total_diff_lines == 0 {
            bail!("max_total_diff_lines must be positive");
        }
        if self.max_tokens == 0 {
            bail!("max_tokens must be positive");
        }
        if self.chars_per_token == 0 {
            bail!("chars_per_token must be positive");
        }
        if self.max_estimated_tokens == 0 {
            bail!("max_estimated_tokens must be positive");
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            bail!("temperature must be between 0.0 and 1.0");
        }
        if self.supported_extensions.is_empty() {
            bail!("supported_extensions cannot be empty");
        }
        Ok(())
    }

    /// Overlay `CODE_REVIEW_*` variables; values that fail to parse are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            self.default_model = model.trim().to_string();
        }
        override_parsed(&mut self.max_tokens, lookup(ENV_MAX_TOKENS));
        override_parsed(&mut self.temperature, lookup(ENV_TEMPERATURE));
        override_parsed(
            &mut self.max_single_file_lines,
            lookup(ENV_MAX_SINGLE_FILE_LINES),
        );
        override_parsed(
            &mut self.max_total_diff_lines,
            lookup(ENV_MAX_TOTAL_DIFF_LINES),
        );
        if let Some(style) = lookup(ENV_GLOW_STYLE).filter(|s| !s.trim().is_empty()) {
            self.glow_style = style.trim().to_string();
        }
    }
}

fn override_parsed<T: FromStr>(slot: &mut T, raw: Option<String>) {
    if let Some(value) = raw.and_then(|v| v.trim().parse().ok()) {
        *slot = value;
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Cannot resolve home directory")?;
    Ok(home.join(".code-review"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Defaults, then `~/.code-review/config.toml` if present, then the environment.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    let mut cfg = load_config_file(&path)?;
    cfg.apply_env(|key| env::var(key).ok());
    cfg.validate()
        .with_context(|| format!("Invalid configuration (file: {})", path.display()))?;
    Ok(cfg)
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config: {}", path.display()))
}

pub fn resolve_api_key(provider: &str, profile: &ProviderProfile) -> Result<String> {
    if let Ok(v) = env::var(&profile.api_key_env) {
        if !v.trim().is_empty() {
            return Ok(v);
        }
    }
    if let Some(v) = &profile.api_key {
        if !v.trim().is_empty() {
            return Ok(v.clone());
        }
    }
    bail!(
        "Missing API key for provider {}. Set env var {} or api_key under [providers.{}] in the config file.",
        provider,
        profile.api_key_env,
        provider
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.default_model, "openai/o4-mini");
        assert!(cfg.file_filter().is_supported("index.php"));
    }

    #[test]
    fn env_overrides_ignore_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_MODEL, "openrouter/anthropic/claude-3.5-sonnet"),
            (ENV_MAX_TOKENS, "not-a-number"),
            (ENV_TEMPERATURE, "0.7"),
            (ENV_MAX_SINGLE_FILE_LINES, " 250 "),
            (ENV_GLOW_STYLE, "  "),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.default_model, "openrouter/anthropic/claude-3.5-sonnet");
        assert_eq!(cfg.max_tokens, 100_000);
        assert!((cfg.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.max_single_file_lines, 250);
        assert_eq!(cfg.max_total_diff_lines, 1000);
        assert_eq!(cfg.glow_style, "dracula");
    }

    #[test]
    fn validation_rejects_out_of_range() {
        let cfg = Config {
            temperature: 1.5,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            max_total_diff_lines: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
max_total_diff_lines = 2000
supported_extensions = [".rs"]

[providers.local]
base_url = "http://localhost:8080/v1/chat/completions"
api_key_env = "LOCAL_KEY"

[pricing."local/qwen"]
input_per_million = 0.0
output_per_million = 0.0
"#,
        )
        .expect("write");

        let cfg = load_config_file(&path).expect("parses");
        assert_eq!(cfg.max_total_diff_lines, 2000);
        assert_eq!(cfg.max_single_file_lines, 500);
        assert!(cfg.file_filter().is_supported("main.rs"));
        assert!(cfg.price_for("local/qwen").is_some());

        let (name, profile) = cfg.provider_for("local/qwen").expect("configured provider");
        assert_eq!(name, "local");
        assert_eq!(profile.api_key_env, "LOCAL_KEY");
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = load_config_file(&dir.path().join("absent.toml")).expect("default");
        assert_eq!(cfg.max_tokens, 100_000);
    }

    #[test]
    fn provider_lookup_uses_presets() {
        let cfg = Config::default();
        let (name, profile) = cfg.provider_for("openrouter/openai/gpt-4o-mini").expect("preset");
        assert_eq!(name, "openrouter");
        assert_eq!(profile.api_key_env, "OPENROUTER_API_KEY");
        assert!(cfg.provider_for("mystery/model").is_err());
        assert!(cfg.provider_for("no-slash").is_err());
    }

    #[test]
    fn inline_api_key_is_used_when_env_is_unset() {
        let profile = ProviderProfile {
            base_url: "http://localhost".to_string(),
            api_key_env: "CODE_REVIEW_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            api_key: Some("sk-inline".to_string()),
        };
        assert_eq!(resolve_api_key("local", &profile).expect("key"), "sk-inline");

        let no_key = ProviderProfile {
            api_key: None,
            ..profile
        };
        let err = resolve_api_key("local", &no_key).unwrap_err();
        assert!(err.to_string().contains("CODE_REVIEW_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
