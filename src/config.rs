use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub pending: PendingConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub allowed_user_ids: Vec<u64>,
    /// Broadcast destinations, in delivery order.
    pub channel_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_enabled")]
    pub enabled: bool,
    #[serde(default = "default_translation_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_translation_model")]
    pub model: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_translation_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TemplateConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Literal substring of `suffix` that becomes the hyperlink.
    #[serde(default = "default_cta_text")]
    pub cta_text: String,
    #[serde(default = "default_cta_url")]
    pub cta_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PendingConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Six-field cron (with seconds) for the expiry sweep.
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeepaliveConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_keepalive_port")]
    pub port: u16,
    /// Public URL to ping so the hosting tier does not idle the process.
    #[serde(default)]
    pub ping_url: Option<String>,
    #[serde(default = "default_ping_cron")]
    pub ping_cron: String,
}

fn default_translation_enabled() -> bool {
    true
}

fn default_translation_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_translation_model() -> String {
    "google/gemini-2.0-flash-001".to_string()
}

fn default_target_lang() -> String {
    "en".to_string()
}

fn default_translation_timeout_secs() -> u64 {
    15
}

fn default_translation_max_tokens() -> u32 {
    1024
}

fn default_prefix() -> String {
    "👇👇👇\n\n".to_string()
}

fn default_suffix() -> String {
    "\n\n👉 JOIN GROUP".to_string()
}

fn default_cta_text() -> String {
    "JOIN GROUP".to_string()
}

fn default_cta_url() -> String {
    "https://t.me/+relaypost".to_string()
}

fn default_ttl_secs() -> u64 {
    120
}

fn default_sweep_cron() -> String {
    // every 30 seconds
    "*/30 * * * * *".to_string()
}

fn default_keepalive_port() -> u16 {
    8080
}

fn default_ping_cron() -> String {
    // every 5 minutes
    "0 */5 * * * *".to_string()
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: default_translation_enabled(),
            base_url: default_translation_base_url(),
            api_key: String::new(),
            model: default_translation_model(),
            target_lang: default_target_lang(),
            timeout_secs: default_translation_timeout_secs(),
            max_tokens: default_translation_max_tokens(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            suffix: default_suffix(),
            cta_text: default_cta_text(),
            cta_url: default_cta_url(),
        }
    }
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_cron: default_sweep_cron(),
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_keepalive_port(),
            ping_url: None,
            ping_cron: default_ping_cron(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        if self.telegram.channel_ids.is_empty() {
            anyhow::bail!("telegram.channel_ids must list at least one destination channel");
        }
        if !self.template.suffix.contains(&self.template.cta_text) {
            anyhow::bail!(
                "template.cta_text {:?} does not occur in template.suffix",
                self.template.cta_text
            );
        }
        Url::parse(&self.template.cta_url).with_context(|| {
            format!("template.cta_url is not a valid URL: {}", self.template.cta_url)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse(
            r#"
            [telegram]
            bot_token = "123456:abcdefghij"
            allowed_user_ids = [1]
            channel_ids = [-1001]
            "#,
        )
        .unwrap();

        assert!(config.translation.enabled);
        assert_eq!(config.pending.ttl_secs, 120);
        assert_eq!(config.template.cta_text, "JOIN GROUP");
        assert!(config.template.suffix.contains("JOIN GROUP"));
        assert!(!config.keepalive.enabled);
    }

    #[test]
    fn empty_channel_list_is_rejected() {
        let err = parse(
            r#"
            [telegram]
            bot_token = "123456:abcdefghij"
            allowed_user_ids = [1]
            channel_ids = []
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("channel_ids"));
    }

    #[test]
    fn cta_must_occur_in_suffix() {
        let err = parse(
            r#"
            [telegram]
            bot_token = "123456:abcdefghij"
            allowed_user_ids = [1]
            channel_ids = [-1001]

            [template]
            suffix = "\n\nsee pinned"
            cta_text = "JOIN GROUP"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cta_text"));
    }
}
