use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// `MONTHSYNC_LOG_FORMAT` wins; otherwise JSON output on stdout gets JSON
    /// logs on stderr so both streams stay machine-readable.
    fn select(raw: Option<&str>, json_report: bool) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => Self::Json,
            Some("compact") => Self::Compact,
            _ if json_report => Self::Json,
            _ => Self::Compact,
        }
    }
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "monthsync=debug,info"
    } else {
        "monthsync=info,warn"
    }
}

/// Install the stderr subscriber. `MONTHSYNC_LOG` takes an `EnvFilter`
/// directive and replaces the default.
pub fn init(json_report: bool) {
    let filter = EnvFilter::try_from_env("MONTHSYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive(env::var("DEBUG").is_ok())));
    let format = LogFormat::select(
        env::var("MONTHSYNC_LOG_FORMAT").ok().as_deref(),
        json_report,
    );
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}
