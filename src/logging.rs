//! Tracing subscriber setup for the command line

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count
///
/// `quiet` lowers the default to warnings, used while a progress spinner
/// owns the terminal.
pub fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    match verbosity {
        0 if quiet => "warn",
        0 => "info",
        1 => "sealsync=debug,info",
        _ => "trace",
    }
}

/// Initialize the global subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the verbosity-derived filter. Colors are only used
/// when stderr is a terminal.
pub fn init(verbosity: u8, quiet: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(console::Term::stderr().is_term())
        .with_target(false)
        .without_time()
        .compact();

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbosity, quiet)))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info, warn};

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(default_directive(0, false), "info");
        assert_eq!(default_directive(0, true), "warn");
        assert_eq!(default_directive(1, true), "sealsync=debug,info");
        assert_eq!(default_directive(5, false), "trace");
    }

    #[test]
    fn test_logging_init() {
        // Only one global subscriber per process
        let _ = init(1, false);

        info!("This is an info message");
        debug!("This is a debug message");
        warn!("This is a warning message");
    }
}
