//! Logging setup, powered by tracing-subscriber.

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Third-party targets kept quiet unless `RUST_LOG` says otherwise.
const NOISY_TARGETS: &[(&str, &str)] = &[("hyper", "warn"), ("hyper_util", "warn"), ("h2", "warn")];

/// Build the filter from the configured level plus noisy-crate caps.
/// A non-empty `RUST_LOG` replaces both.
pub fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(from_env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if !from_env.trim().is_empty() {
            return EnvFilter::try_new(&from_env)
                .map_err(|e| anyhow!("Invalid RUST_LOG filter '{}': {}", from_env, e));
        }
    }

    let mut directives = vec![level.to_string()];
    for (target, lvl) in NOISY_TARGETS {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_env_filter(&config.level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_levels() {
        // Only meaningful when RUST_LOG is unset in the test environment.
        if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
            let filter = build_env_filter("debug").unwrap();
            let rendered = filter.to_string();
            assert!(rendered.contains("debug"));
            assert!(rendered.contains("hyper=warn"));
        }
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
            assert!(build_env_filter("hospital_records=loud").is_err());
        }
    }
}
