use tracing_subscriber::EnvFilter;

use crate::Error;

/// Installs a formatted subscriber that writes to stdout.
///
/// `RUST_LOG` wins over `default_directives`.
pub fn init(default_directives: &str) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))
        .map_err(|err| Error::Internal(format!("telemetry: creating EnvFilter: {}", err)))?;
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| Error::Internal(format!("telemetry: {}", err)))
}
