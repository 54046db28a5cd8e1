pub mod cli;
pub mod crawler;
pub mod error;
pub mod fetch;
pub mod item;
pub mod job;
pub mod launcher;
pub mod output;
pub mod run_config;
pub mod settings;
pub mod spiders;
pub mod telemetry;
pub mod throttle;

pub use error::Error;

// == Client ==
pub static DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
