//! Provider selection from configuration.

use std::sync::Arc;
use std::time::Duration;

use parley_config::AppConfig;
use parley_core::error::ProviderError;
use parley_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured completion provider.
///
/// Hosted providers without an API key are rejected here so the failure
/// surfaces at startup instead of on the first reply.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let llm = &config.llm;
    let name = llm.provider.as_str();

    let base_url = match &llm.api_url {
        Some(url) => url.clone(),
        None => default_base_url(name).ok_or_else(|| {
            ProviderError::NotConfigured(format!("unknown provider {name:?} and no api_url set"))
        })?,
    };

    let api_key = match (&llm.api_key, requires_key(name)) {
        (Some(key), _) => key.clone(),
        (None, false) => String::new(),
        (None, true) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider {name:?}; set PARLEY_API_KEY or llm.api_key"
            )));
        }
    };

    let provider = OpenAiCompatProvider::with_timeout(
        name,
        base_url,
        api_key,
        Duration::from_secs(llm.timeout_secs),
    )?;
    Ok(Arc::new(provider))
}

fn requires_key(provider_name: &str) -> bool {
    !matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "custom")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "groq" => "https://api.groq.com/openai/v1",
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "together" => "https://api.together.xyz/v1",
        "ollama" => "http://localhost:11434/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_groq_by_default_when_key_present() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("gsk-test".into());
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "groq");
    }

    #[test]
    fn hosted_provider_without_key_is_rejected() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".into();
        assert!(build_from_config(&config).is_ok());
    }

    #[test]
    fn unknown_provider_needs_url() {
        let mut config = AppConfig::default();
        config.llm.provider = "mystery".into();
        config.llm.api_key = Some("k".into());
        assert!(build_from_config(&config).is_err());
        config.llm.api_url = Some("http://localhost:7000/v1".into());
        assert_eq!(build_from_config(&config).unwrap().name(), "mystery");
    }

    #[test]
    fn default_urls() {
        assert_eq!(
            default_base_url("groq").as_deref(),
            Some("https://api.groq.com/openai/v1")
        );
        assert!(default_base_url("nope").is_none());
    }
}
