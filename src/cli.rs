//! Shared bodies of the binaries. Errors surface as `anyhow::Error` so
//! `main` can print them and exit with status 1.

use anyhow::Context;

use crate::{job, job::CrawlJob, settings::Settings, spiders::SpiderKind, telemetry};

fn setup() -> anyhow::Result<Settings> {
    let settings = Settings::load().context("loading settings")?;
    telemetry::init(&settings.log_level)?;
    tracing::debug!(?settings, "settings loaded");
    Ok(settings)
}

/// Runs one spider for today's date.
pub async fn run_spider(kind: SpiderKind) -> anyhow::Result<()> {
    let settings = setup()?;
    let result = CrawlJob::today(kind, &settings.output_root)
        .run(&settings)
        .await
        .into_result()?;
    tracing::info!(
        spider = %result.spider,
        records = result.records,
        path = %result.artifact_path.display(),
        "done"
    );
    Ok(())
}

/// Runs every spider, then fails if any of them did.
pub async fn run_all() -> anyhow::Result<()> {
    let settings = setup()?;
    let results = job::run_all(&settings, &settings.output_root).await;

    let mut failed = Vec::new();
    for result in &results {
        match &result.error {
            None => tracing::info!(
                spider = %result.spider,
                records = result.records,
                path = %result.artifact_path.display(),
                "completed"
            ),
            Some(err) => {
                tracing::error!(spider = %result.spider, "failed: {}", err);
                failed.push(result.spider.as_str());
            }
        }
    }
    tracing::info!(
        ran = results.len(),
        failed = failed.len(),
        "all spiders finished"
    );
    if failed.is_empty() && results.len() == SpiderKind::ALL.len() {
        Ok(())
    } else if failed.is_empty() {
        anyhow::bail!("only {} of {} spiders ran", results.len(), SpiderKind::ALL.len())
    } else {
        anyhow::bail!("failed spiders: {}", failed.join(", "))
    }
}
