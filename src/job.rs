//! One crawl job: resolve the dated output path, build the run
//! configuration, then launch.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::{
    fetch::Fetch,
    launcher::{Launcher, RunResult},
    output,
    run_config::RunConfiguration,
    settings::Settings,
    spiders::SpiderKind,
    Error,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub spider: SpiderKind,
    pub base_directory: PathBuf,
    /// Fixed when the job is created, so a run crossing midnight keeps its name.
    pub run_date: NaiveDate,
}

impl CrawlJob {
    pub fn new(spider: SpiderKind, base_directory: impl Into<PathBuf>, run_date: NaiveDate) -> Self {
        Self {
            spider,
            base_directory: base_directory.into(),
            run_date,
        }
    }

    /// A job dated with the local wall-clock date.
    pub fn today(spider: SpiderKind, base_directory: impl Into<PathBuf>) -> Self {
        Self::new(spider, base_directory, chrono::Local::now().date_naive())
    }

    pub fn output_directory(&self) -> PathBuf {
        self.base_directory.join(output::OUTPUT_DIR_NAME)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.output_directory()
            .join(output::artifact_file_name(self.spider.name(), self.run_date))
    }

    pub fn configure(&self, settings: &Settings) -> Result<RunConfiguration, Error> {
        let output_path = output::resolve(self.spider.name(), &self.base_directory, self.run_date)?;
        let overrides = settings.overrides_for(self.spider);
        settings
            .run_config_builder()
            .build(self.spider.name(), output_path, &overrides)
    }

    pub async fn run(&self, settings: &Settings) -> RunResult {
        let spider = self.spider.spider();
        match self.configure(settings) {
            Ok(config) => Launcher::new(spider.as_ref(), config).launch().await,
            Err(err) => self.not_started(err),
        }
    }

    pub async fn run_with(&self, settings: &Settings, fetcher: &dyn Fetch) -> RunResult {
        let spider = self.spider.spider();
        match self.configure(settings) {
            Ok(config) => {
                Launcher::new(spider.as_ref(), config)
                    .launch_with(fetcher)
                    .await
            }
            Err(err) => self.not_started(err),
        }
    }

    fn not_started(&self, err: Error) -> RunResult {
        tracing::error!(spider = %self.spider, "Failed preparing run: {}", err);
        RunResult::failed(self.spider.name(), self.artifact_path(), err)
    }
}

/// Runs every spider in turn under `base_directory`, each with its own job.
pub async fn run_all(settings: &Settings, base_directory: &Path) -> Vec<RunResult> {
    let mut results = Vec::with_capacity(SpiderKind::ALL.len());
    for kind in SpiderKind::ALL {
        let result = CrawlJob::today(kind, base_directory).run(settings).await;
        let interrupted = matches!(result.error, Some(Error::Interrupted));
        results.push(result);
        if interrupted {
            tracing::warn!("Interrupted, skipping remaining spiders");
            break;
        }
    }
    results
}
