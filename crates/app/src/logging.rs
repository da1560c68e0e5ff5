use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "STUDY_LOG";
const DEFAULT_FILTER: &str = "info";

/// Install the stderr subscriber, filtered by `STUDY_LOG` (default `info`).
///
/// Logs go to stderr so they never interleave with prompts on stdout.
pub fn init_tracing() {
    let directive = std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let env_filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
