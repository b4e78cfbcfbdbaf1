use clear_report::config::{Config, DEFAULT_CONFIG_PATH};
use clear_report::{SourceDocument, analyze_report, compute_water_main_score};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(report_path) = args.next() else {
        eprintln!("usage: clear-report <report.pdf|image> [config.toml]");
        std::process::exit(2);
    };

    let cfg = match args.next() {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)?,
        None => {
            info!("No config file, using reference limits and defaults");
            Config::default()
        }
    };

    let extractor = cfg.extractor()?;
    let acquirer = cfg.acquirer();
    let doc = SourceDocument::read(&report_path).await?;

    let analysis = analyze_report(&acquirer, &extractor, &doc, &cfg.limits).await?;
    let water_main_score = compute_water_main_score(&cfg.water_main);
    info!(score = water_main_score, "Water main score");

    let output = serde_json::json!({
        "report": analysis,
        "water_main": {
            "input": cfg.water_main,
            "score": water_main_score,
        },
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
