//! `promptseq models`: List models offered by the default provider.

use promptseq_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let router = promptseq_providers::router::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let mut models = provider.list_models().await?;
    models.sort();

    println!("Models from {}:", provider.name());
    if models.is_empty() {
        println!("  (none reported)");
    }
    for model in &models {
        let marker = if *model == config.default_model { " (default)" } else { "" };
        println!("  {model}{marker}");
    }

    Ok(())
}
