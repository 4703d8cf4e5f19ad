//! `dealdesk embed`: call the configured embedding provider once.

use dealdesk_config::AppConfig;
use dealdesk_core::retrieval::Embedder;
use dealdesk_providers::OpenAiEmbedder;

pub async fn run(text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No embedding API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DEALDESK_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to the [embedding] section of:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let embedder = OpenAiEmbedder::from_config(&config.embedding)?;
    let embedding = embedder.embed(text).await?;

    let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    println!("🧮 {} ({})", embedder.model(), embedder.name());
    println!("   Dimensions: {}", embedding.len());
    println!("   L2 norm:    {norm:.4}");
    let preview: Vec<String> = embedding.iter().take(5).map(|x| format!("{x:.4}")).collect();
    println!("   Head:       [{}, ...]", preview.join(", "));
    Ok(())
}
