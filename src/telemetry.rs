use tracing_subscriber::EnvFilter;

/// Where log lines go. The chat relay keeps stdout for the conversation.
#[derive(Debug, Clone, Copy)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

/// Installs the global subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init(default_filter: &str, json: bool, target: LogTarget) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (json, target) {
        (true, LogTarget::Stdout) => builder.json().init(),
        (true, LogTarget::Stderr) => builder.json().with_writer(std::io::stderr).init(),
        (false, LogTarget::Stdout) => builder.init(),
        (false, LogTarget::Stderr) => builder.with_writer(std::io::stderr).init(),
    }
}
