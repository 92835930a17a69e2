//! `tracing` subscriber setup.

use std::{fs::OpenOptions, sync::Mutex};

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use weatherapp_core::config::{AppSettings, LogLevel, LogOutput};

/// Level used when `RUST_LOG` is not set: `-v` beats the settings file.
fn effective_level(settings: &AppSettings, verbose: u8) -> LogLevel {
    if verbose > 0 {
        LogLevel::from_verbosity(verbose)
    } else {
        settings.log_level
    }
}

pub fn init(settings: &AppSettings, verbose: u8) -> anyhow::Result<()> {
    let level = effective_level(settings, verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match settings.log_output {
        LogOutput::Console => builder.with_writer(std::io::stderr).try_init(),
        LogOutput::File => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_filename)
                .with_context(|| format!("cannot open log file {}", settings.log_filename))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_level_without_flags() {
        let settings = AppSettings {
            log_level: LogLevel::Info,
            ..AppSettings::default()
        };
        assert_eq!(effective_level(&settings, 0), LogLevel::Info);
    }

    #[test]
    fn verbosity_overrides_settings() {
        let settings = AppSettings::default();
        assert_eq!(effective_level(&settings, 1), LogLevel::Info);
        assert_eq!(effective_level(&settings, 4), LogLevel::Debug);
    }
}
