//! Runs one refresh (fetch all sources, save, classify) against the configured
//! data directory and prints the report as JSON.

use treasury_intel::config::AppConfig;
use treasury_intel::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    treasury_intel::init_tracing();

    let cfg = AppConfig::from_env();
    let state = AppState::from_config(&cfg)?;
    let report = state.refresh.run_once().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.fetched == 0 {
        anyhow::bail!("no news items fetched ({} sources failed)", report.sources_failed);
    }
    Ok(())
}
