use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. Logs go to stderr since stdout carries replies.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .try_init();
}
