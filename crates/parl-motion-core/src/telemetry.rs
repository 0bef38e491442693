//! Tracing initialisation for the `parl-motion` binary.
//!
//! The CLI's `--verbose` and `--json` flags map onto [`LogSettings`];
//! [`init_tracing`] turns those into a global subscriber once. `RUST_LOG`
//! always wins over the flags.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose targets are raised to debug under `--verbose`.
const OWN_TARGETS: [&str; 2] = ["parl_motion_core", "parl_motion"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// Newline-delimited JSON, one object per event.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Level for the linker's own targets.
    pub level: Level,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: Level::INFO,
        }
    }
}

impl LogSettings {
    /// Settings for the CLI's global flags.
    pub fn from_flags(verbose: bool, json: bool) -> Self {
        Self {
            format: if json { LogFormat::Json } else { LogFormat::Text },
            level: if verbose { Level::DEBUG } else { Level::INFO },
        }
    }

    /// Filter used when `RUST_LOG` is unset. Dependencies (reqwest, hyper)
    /// stay at info even when the linker itself logs at debug.
    pub fn default_directive(&self) -> String {
        let mut directive = Level::INFO.as_str().to_lowercase();
        if self.level != Level::INFO {
            for target in OWN_TARGETS {
                directive.push_str(&format!(",{target}={}", self.level.as_str().to_lowercase()));
            }
        }
        directive
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

/// Initialise the global tracing subscriber. Later calls are ignored.
///
/// Logs go to stderr so that commands printing results to stdout stay
/// pipeable.
pub fn init_tracing(settings: &LogSettings) {
    let registry = tracing_subscriber::registry().with(settings.filter());
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match settings.format {
        LogFormat::Json => registry.with(layer.json()).try_init().ok(),
        LogFormat::Text => registry.with(layer).try_init().ok(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_settings() {
        assert_eq!(LogSettings::from_flags(false, false), LogSettings::default());
        let verbose = LogSettings::from_flags(true, true);
        assert_eq!(verbose.format, LogFormat::Json);
        assert_eq!(verbose.level, Level::DEBUG);
    }

    #[test]
    fn verbose_raises_only_own_targets() {
        assert_eq!(LogSettings::default().default_directive(), "info");
        assert_eq!(
            LogSettings::from_flags(true, false).default_directive(),
            "info,parl_motion_core=debug,parl_motion=debug"
        );
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(&LogSettings::default());
        init_tracing(&LogSettings::from_flags(true, true));
        tracing::info!("still alive");
    }
}
