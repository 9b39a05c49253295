//! `parley serve`: start the HTTP API server.

use parley_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Parley gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.llm.provider, config.llm.model);

    parley_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("gateway failed: {e}"))?;

    Ok(())
}
