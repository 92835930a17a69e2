//! Core library for the `weatherapp` aggregator.
//!
//! This crate defines:
//! - A TTL-bounded page cache and the cache-aware fetcher on top of it
//! - Per-provider location configuration and the interactive drill-down resolver
//! - Name-keyed registries for commands, providers and output formatters
//! - The built-in weather site providers
//!
//! It is used by `weatherapp-cli`, but can also be reused by other binaries.

pub mod app;
pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod model;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use app::{App, Options, RunReport};
pub use config::{LocationStore, Paths, Settings};
pub use error::{ResolverInputError, WeatherError, report};
pub use fetch::{Fetcher, HttpClient, ReqwestClient};
pub use model::{Day, Location, ProviderOutput, WeatherInfo};
pub use provider::{ProviderId, WeatherSource};
pub use registry::Registry;
pub use resolver::Prompt;
