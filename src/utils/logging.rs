use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Pick the log filter: `RUST_LOG` first, then the configured directive,
/// then `warn`. An unparsable configured directive falls back to the default.
pub fn build_filter(configured: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    match configured.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directive) => match directive.parse::<EnvFilter>() {
            Ok(filter) => filter,
            Err(err) => {
                eprintln!(
                    "Warning: log-filter '{directive}' is not a valid tracing filter ({err}); using '{DEFAULT_FILTER}'"
                );
                EnvFilter::new(DEFAULT_FILTER)
            }
        },
        None => EnvFilter::new(DEFAULT_FILTER),
    }
}

/// Install the global subscriber. With a log file, output is appended there
/// so it never lands on top of the terminal UI; otherwise it goes to stderr.
pub fn init_logging(
    log_file: Option<&Path>,
    configured_filter: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = build_filter(configured_filter);
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| -> Box<dyn std::error::Error> { err })?;
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|err| -> Box<dyn std::error::Error> { err })?;
        }
    }
    Ok(())
}
