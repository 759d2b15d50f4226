use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Filter directives that replace `--log-level` entirely when set.
pub const LOG_ENV: &str = "DOMERELAY_LOG";

/// Relay crates that follow `--log-level`. Everything else stays at `warn`,
/// so tungstenite's per-frame tracing never floods the relay's own output.
const RELAY_TARGETS: [&str; 4] = [
    "domerelay",
    "domerelay_core",
    "domerelay_transport",
    "domerelay_wire",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Directives for `level`: the relay crates at `level`, the rest at `warn`
/// unless `level` is quieter still.
pub fn default_directives(level: LogLevel) -> String {
    let floor = match level {
        LogLevel::Error => "error",
        _ => "warn",
    };
    let mut directives = floor.to_string();
    for target in RELAY_TARGETS {
        directives.push_str(&format!(",{target}={}", level.as_directive()));
    }
    directives
}

fn filter(level: LogLevel, from_env: Option<String>) -> EnvFilter {
    from_env
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(level)))
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
///
/// JSON lines carry the `connection` span, so each event names the
/// connection and remote address it belongs to.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level, std::env::var(LOG_ENV).ok()))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_crates_follow_the_level() {
        assert_eq!(
            default_directives(LogLevel::Debug),
            "warn,domerelay=debug,domerelay_core=debug,domerelay_transport=debug,domerelay_wire=debug"
        );
        assert!(default_directives(LogLevel::Error).starts_with("error,"));
    }

    #[test]
    fn env_directives_win_and_bad_ones_fall_back() {
        let from_env = filter(LogLevel::Info, Some("domerelay_core=trace".to_string()));
        assert!(from_env.to_string().contains("domerelay_core=trace"));
        assert!(!from_env.to_string().contains("domerelay_wire"));

        let fallback = filter(LogLevel::Info, Some("domerelay=loud".to_string()));
        assert!(fallback.to_string().contains("domerelay_core=info"));
    }
}
