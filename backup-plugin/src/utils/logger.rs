//! Process-wide `tracing` subscriber for the plugin host.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Output goes to stderr, leaving stdout to
/// whatever drives the plugin.
pub fn init(level: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(directives(level))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

/// `RUST_LOG` when set, otherwise the configured level, otherwise `info`.
fn directives(level: &str) -> EnvFilter {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return from_env;
    }
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("Ignoring log level {:?} ({}), using info", level, e);
        EnvFilter::new("info")
    })
}
