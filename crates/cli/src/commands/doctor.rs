//! `parley doctor`: diagnose configuration, API key and tokenizer.

use std::path::Path;

use parley_agent::TokenCounter;
use parley_config::AppConfig;

/// Prints every check and fails when any of them found an issue.
pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("Parley Doctor");
    println!("=============\n");

    let mut issues = 0;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if path.exists() {
        println!("  ok    Config file found at {}", path.display());
    } else {
        println!("  info  No config file at {}, using defaults", path.display());
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ok    Configuration valid");
            config
        }
        Err(e) => {
            println!("  FAIL  Configuration invalid: {e:#}");
            println!("\n  1 issue(s) found.");
            anyhow::bail!("configuration invalid: {e:#}");
        }
    };

    println!(
        "  ok    Provider {} with model {}",
        config.llm.provider, config.llm.model
    );

    if config.has_api_key() {
        println!("  ok    API key configured");
    } else {
        println!("  warn  No API key configured; set PARLEY_API_KEY or llm.api_key");
        issues += 1;
    }

    match parley_providers::build_from_config(&config) {
        Ok(provider) => {
            println!("  ok    Provider client ready ({})", provider.name());
            match provider.health_check().await {
                Ok(true) => println!("  ok    Completion service reachable"),
                Ok(false) => {
                    println!("  FAIL  Completion service rejected the health check");
                    issues += 1;
                }
                Err(e) => {
                    println!("  FAIL  Completion service unreachable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  FAIL  Provider cannot be built: {e}");
            issues += 1;
        }
    }

    match TokenCounter::for_model(config.encoding_model()) {
        Ok(counter) => println!(
            "  ok    Tokenizer {} for {}",
            counter.encoding_name(),
            config.encoding_model()
        ),
        Err(e) => {
            println!("  FAIL  Tokenizer unavailable: {e}");
            issues += 1;
        }
    }

    println!(
        "  ok    Context: {} messages / {} tokens, chunks of {} words with {} overlap, top {}",
        config.context.max_history_messages,
        config.context.max_tokens,
        config.context.chunk_size,
        config.context.chunk_overlap,
        config.context.top_k
    );

    println!();
    if issues > 0 {
        println!("  {issues} issue(s) found. See above for details.");
        anyhow::bail!("doctor found {issues} issue(s)");
    }
    println!("  All checks passed.");
    Ok(())
}
