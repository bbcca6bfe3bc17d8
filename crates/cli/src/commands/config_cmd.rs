//! `promptseq config`: Configuration management commands.

use promptseq_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:    {}", config.default_provider);
            println!("   Model:       {}", config.default_model);
            println!("   Temperature: {}", config.default_temperature);
            println!(
                "   Gateway:     {}:{}",
                config.gateway.host, config.gateway.port
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Problems that do not stop loading but will bite later.
fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if !config.has_api_key() {
        warnings.push("No API key set (set PROMPTSEQ_API_KEY or OPENAI_API_KEY)");
    }

    if config.gateway.host == "0.0.0.0" && !config.rate_limit.enabled {
        warnings.push("Gateway bound to 0.0.0.0 with rate limiting disabled");
    }

    if config.gateway.allowed_origin.trim().is_empty() {
        warnings.push("gateway.allowed_origin is empty; browsers will be refused");
    }

    warnings
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("[REDACTED]".into());
        }
    }

    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
