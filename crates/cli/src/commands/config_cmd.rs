//! `dealdesk config`: Configuration management commands.

use dealdesk_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No embedding API key set (set DEALDESK_API_KEY or OPENAI_API_KEY)");
            }
            if config.quota.default_monthly_limit.is_none() {
                warnings.push("New tenants are provisioned without a monthly limit");
            }
            if config.intent.keywords.is_empty() && config.intent.phrases.is_empty() {
                warnings.push("No intent keywords or phrases: the calendar is never consulted");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Embedding: {} @ {}", config.embedding.model, config.embedding.api_url);
            println!(
                "   Hours:     {}-{} ({}-day window)",
                config.availability.day_start,
                config.availability.day_end,
                config.availability.window_days
            );
            println!("   Per reply: {} credits", config.quota.credits_per_reply);
            println!("   Database:  {}", config.database_path().display());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.embedding.api_key.is_some() {
        config.embedding.api_key = Some("***".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

pub async fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    if path.exists() && !force {
        println!("⚠ Config already exists at {}", path.display());
        println!("  Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(AppConfig::config_dir())?;
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("✅ Wrote default config to {}", path.display());
    Ok(())
}
