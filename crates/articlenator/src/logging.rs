//! Tracing subscriber setup.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the default filter directive for a level.
///
/// Our own crate and request tracing follow `level`; dependencies stay at `warn`
/// unless the level is more verbose than that.
#[must_use]
pub fn filter_directive(level: &str) -> String {
    format!("articlenator={level},tower_http={level},warn")
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `level` when set. JSON output is used when requested
/// or when stderr is not a terminal.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    let registry = tracing_subscriber::registry().with(filter);

    if json || !std::io::stderr().is_terminal() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
