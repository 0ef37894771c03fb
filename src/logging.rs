// Logging setup. Diagnostics go to stderr so stdout stays pure JSON for
// scripts; the level comes from `BASECAMP_LOG` (e.g. `debug`,
// `basecamp_cli::api=debug`) and defaults to `warn`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "BASECAMP_LOG";

const DEFAULT_LEVEL: &str = "warn";

/// Install the global subscriber. Calling it twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
