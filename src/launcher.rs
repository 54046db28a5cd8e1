//! Runs one spider with one configuration to a terminal state.

use std::path::PathBuf;

use crate::{
    crawler::Crawler,
    fetch::{Fetch, HttpFetcher},
    output,
    run_config::RunConfiguration,
    spiders::Spider,
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
}

#[derive(Debug)]
pub struct RunResult {
    pub spider: String,
    pub status: RunStatus,
    pub artifact_path: PathBuf,
    pub records: usize,
    pub error: Option<Error>,
}

impl RunResult {
    pub fn failed(spider: impl Into<String>, artifact_path: PathBuf, error: Error) -> Self {
        Self {
            spider: spider.into(),
            status: RunStatus::Failure,
            artifact_path,
            records: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Converts a failed run into an error for the process boundary.
    pub fn into_result(self) -> anyhow::Result<RunResult> {
        match self.error {
            None => Ok(self),
            Some(err) => {
                let context = format!("spider '{}' failed", self.spider);
                Err(anyhow::Error::new(err).context(context))
            }
        }
    }
}

/// Single-use: `launch` consumes the launcher, so a finished run cannot be
/// restarted.
pub struct Launcher<'a> {
    spider: &'a dyn Spider,
    config: RunConfiguration,
    state: RunState,
}

impl<'a> Launcher<'a> {
    pub fn new(spider: &'a dyn Spider, config: RunConfiguration) -> Self {
        Self {
            spider,
            config,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Launches with an HTTP fetcher built from the run configuration.
    pub async fn launch(self) -> RunResult {
        let fetcher = HttpFetcher::new(&self.config);
        match fetcher {
            Ok(fetcher) => self.launch_with(&fetcher).await,
            Err(err) => {
                tracing::error!("Failed building HTTP client: {}", err);
                let mut this = self;
                this.transition(RunState::Running);
                this.finish(Err(err))
            }
        }
    }

    pub async fn launch_with(mut self, fetcher: &dyn Fetch) -> RunResult {
        self.transition(RunState::Running);
        tracing::info!(
            spider = %self.spider.name(),
            group = self.spider.category(),
            output = %self.config.sink.path.display(),
            "starting crawl"
        );

        let crawler = Crawler::new(&self.config);
        let crawled = tokio::select! {
            crawled = crawler.run(self.spider, fetcher) => crawled,
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, no artifact will be written");
                Err(Error::Interrupted)
            }
        };
        let outcome = crawled.and_then(|records| {
            output::write_artifact(&self.config.sink, &records)?;
            Ok(records.len())
        });
        self.finish(outcome)
    }

    fn finish(mut self, outcome: Result<usize, Error>) -> RunResult {
        let artifact_path = self.config.sink.path.clone();
        let spider = self.spider.name();
        match outcome {
            Ok(records) => {
                self.transition(RunState::Completed);
                RunResult {
                    spider,
                    status: RunStatus::Success,
                    artifact_path,
                    records,
                    error: None,
                }
            }
            Err(err) => {
                self.transition(RunState::Failed);
                tracing::error!(error = ?err, "crawl failed: {}", err);
                RunResult::failed(spider, artifact_path, err)
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (RunState::Idle, RunState::Running)
                    | (RunState::Running, RunState::Completed)
                    | (RunState::Running, RunState::Failed)
            ),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
