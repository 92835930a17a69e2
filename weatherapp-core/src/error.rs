//! Error taxonomy for the aggregator.
//!
//! Every failure the core can produce is a [`WeatherError`]. Errors carry the
//! context a user needs to act on them (offending URL, provider id, input
//! value) and are rendered by [`report`] in one place.

use std::{error::Error as _, path::PathBuf};

use thiserror::Error;

/// Invalid answers given during interactive location selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolverInputError {
    #[error("expected a number, got '{0}'")]
    NotANumber(String),

    #[error("selection {value} is not in the list (1..={max})")]
    OutOfRange { value: i64, max: usize },

    #[error("'{0}' is not a valid location name")]
    InvalidName(String),

    #[error("selection cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    /// Network or transport failure while retrieving a page.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A persisted configuration file could not be parsed.
    #[error("bad configuration file {} for '{provider}': {reason}", .path.display())]
    ConfigParse {
        provider: String,
        path: PathBuf,
        reason: String,
    },

    #[error("location selection aborted: {0}")]
    ResolverInput(#[from] ResolverInputError),

    /// The drill-down menu led back to a page that was already visited.
    #[error("location list at {url} points back to an already visited page")]
    LocationCycle { url: String },

    #[error("failed to read weather page for '{provider}': {reason}")]
    Parse { provider: String, reason: String },

    #[error("unknown command or provider '{0}'")]
    UnknownName(String),

    #[error("unknown output formatter '{0}'")]
    UnknownFormatter(String),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WeatherError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WeatherError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        WeatherError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short, actionable text for the terminal.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Fetch { url, .. } => {
                format!("Incorrectly set location, the page is unreachable: {url}")
            }
            WeatherError::ConfigParse { provider, .. } => {
                format!("Bad configuration file. Please reconfigurate your provider: {provider}")
            }
            WeatherError::ResolverInput(ResolverInputError::NotANumber(_)) => {
                "You have entered the wrong data format. Run configurate again and input a number."
                    .to_string()
            }
            WeatherError::ResolverInput(ResolverInputError::OutOfRange { .. }) => {
                "You have entered a non-existent number in the list. Run configurate again."
                    .to_string()
            }
            WeatherError::ResolverInput(ResolverInputError::InvalidName(name)) => {
                format!("You have entered an incorrect location: {name}")
            }
            WeatherError::ResolverInput(ResolverInputError::Cancelled) => {
                "Location selection cancelled.".to_string()
            }
            WeatherError::LocationCycle { .. } => {
                "The site's location list loops back on itself. Nothing was saved.".to_string()
            }
            WeatherError::Parse { provider, .. } => {
                format!("Could not read the weather page for {provider}.")
            }
            WeatherError::UnknownName(name) => {
                format!("Unknown command or provider '{name}'. Run `weatherapp providers` to list providers.")
            }
            WeatherError::UnknownFormatter(name) => {
                format!("Unknown output format '{name}'. Available: csv, json, list, table.")
            }
            WeatherError::Io { path, .. } => {
                format!("A file operation failed on {}.", path.display())
            }
        }
    }
}

/// Render an error for the user.
///
/// Without `debug` this is a single line. With `debug` the full `source()`
/// chain and the debug representation are appended.
pub fn report(err: &WeatherError, debug: bool) -> String {
    if !debug {
        return format!("{}: {}", err.user_message(), err);
    }

    let mut out = format!("{}\nerror: {err}", err.user_message());
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    out.push_str(&format!("\n{err:#?}"));
    out
}
