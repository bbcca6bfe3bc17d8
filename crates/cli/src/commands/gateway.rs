//! `promptseq gateway`: Start the HTTP API server.

use promptseq_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("promptseq Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:   {}", config.default_provider);
    println!("   CORS:       {}", config.gateway.allowed_origin);
    if config.rate_limit.enabled {
        println!(
            "   Rate limit: {} requests / {}s",
            config.rate_limit.max_requests, config.rate_limit.window_secs
        );
    }

    promptseq_gateway::start(config).await?;

    Ok(())
}
