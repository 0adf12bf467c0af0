use crate::config::Config;
use crate::providers::OpenAIProvider;
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    let (provider, default_base_url) = match provider_name.to_lowercase().as_str() {
        "openai" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "RELAY_OPENAI_API_KEY"],
                &config.api_key,
            )?;
            (OpenAIProvider::new(api_key), None)
        }
        "openrouter" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENROUTER_API_KEY", "RELAY_OPENROUTER_API_KEY"],
                &config.api_key,
            )?;
            (OpenAIProvider::new(api_key), Some(OPENROUTER_BASE_URL))
        }
        _ => {
            return Err(anyhow!(
                "Unknown provider: {}. Available: openai, openrouter",
                provider_name
            ));
        }
    };

    let mut provider = provider
        .with_model(config.model.clone())
        .with_temperature(config.temperature);
    if let Some(base_url) = config.base_url.as_deref().or(default_base_url) {
        provider = provider.with_base_url(base_url);
    }
    Ok(Arc::new(provider))
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set {} or api_key in the config file",
            env_vars.join(" / ")
        ))
    }
}
