//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count.
#[must_use]
pub const fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over the `-v` count when set.
pub fn setup_logging(verbosity: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    // A second call (tests, embedding hosts) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(9), "trace");
    }

    #[test]
    fn test_setup_twice_is_harmless() {
        setup_logging(0);
        setup_logging(3);
    }
}
