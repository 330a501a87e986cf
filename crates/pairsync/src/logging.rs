//! Subscriber setup for binaries. Libraries only emit events.

use tracing_subscriber::EnvFilter;

/// Installs a compact stderr subscriber.
///
/// `RUST_LOG` wins over `verbosity` when set.
///
/// - 0: warnings and errors only
/// - 1 (`-v`): info for PairSync, warn for dependencies
/// - 2+ (`-vv`): debug for everything
pub fn init(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "warn,pairsync=info,pairsync_session=info,pairsync_authority=info,pairsync_registry=info",
        _ => "debug",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .init();
}
