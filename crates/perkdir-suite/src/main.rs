use anyhow::Result;
use perkdir_config::HarnessConfig;
use perkdir_suite::{run_suite, ScenarioOutcome};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = HarnessConfig::from_env()?;
    tracing::info!(base_url = %config.api_base_url, "starting perk directory verification suite");

    let report = run_suite(&config).await?;
    for (name, outcome) in &report.outcomes {
        match outcome {
            ScenarioOutcome::Passed => tracing::info!(scenario = %name, "passed"),
            ScenarioOutcome::Skipped(reason) => {
                tracing::warn!(scenario = %name, reason = %reason, "skipped as inconclusive");
            }
            ScenarioOutcome::Failed(reason) => {
                tracing::error!(scenario = %name, reason = %reason, "failed");
            }
        }
    }
    if let Some(error) = &report.teardown_error {
        tracing::error!(error = %error, "teardown failed");
    }

    if report.succeeded() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("suite finished with failures"))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
