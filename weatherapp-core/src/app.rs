//! Application context and dispatch.
//!
//! [`App`] owns everything a command or provider needs (options, paths,
//! stores, registries, prompt, output sink) and is passed by reference.

use std::{
    fs,
    io::Write,
    path::Path,
    sync::Mutex,
    time::Duration,
};
use tracing::{debug, error};

use crate::{
    cache::CacheStore,
    command::{CommandFactory, Runnable, builtin_commands},
    config::{CACHE_TTL_SECS, LocationStore, Paths},
    error::{WeatherError, report},
    fetch::{Fetcher, HttpClient},
    format::{DEFAULT_FORMATTER, Formatter, FormatterFactory, builtin_formatters},
    model::{Day, ProviderOutput},
    provider::{Provider, ProviderFactory, builtin_providers},
    registry::Registry,
    resolver::Prompt,
};

/// Parsed command-line options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Command or provider name. `None` runs every provider.
    pub command: Option<String>,
    /// Arguments left over for the command.
    pub args: Vec<String>,
    pub tomorrow: bool,
    pub write_file: bool,
    pub refresh: bool,
    pub reset_defaults: bool,
    pub debug: bool,
    pub verbose: u8,
    pub formatter: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            tomorrow: false,
            write_file: false,
            refresh: false,
            reset_defaults: false,
            debug: false,
            verbose: 0,
            formatter: DEFAULT_FORMATTER.to_string(),
        }
    }
}

impl Options {
    pub fn day(&self) -> Day {
        if self.tomorrow { Day::Tomorrow } else { Day::Today }
    }
}

/// Outcome of [`App::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    pub outputs: Vec<ProviderOutput>,
    /// Providers that failed during a batch run, with their errors.
    pub failures: Vec<(String, WeatherError)>,
}

pub struct App {
    options: Options,
    paths: Paths,
    fetcher: Fetcher,
    locations: LocationStore,
    prompt: Box<dyn Prompt>,
    out: Mutex<Box<dyn Write + Send>>,
    commands: Registry<CommandFactory>,
    providers: Registry<ProviderFactory>,
    formatters: Registry<FormatterFactory>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("options", &self.options)
            .field("paths", &self.paths)
            .field("commands", &self.commands)
            .field("providers", &self.providers)
            .field("formatters", &self.formatters)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Build the context with the built-in commands, providers and formatters.
    pub fn new(
        options: Options,
        paths: Paths,
        http: Box<dyn HttpClient>,
        prompt: Box<dyn Prompt>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let cache = CacheStore::new(&paths.cache_dir, Duration::from_secs(CACHE_TTL_SECS));
        let locations = LocationStore::new(paths.locations_file());

        Self {
            options,
            fetcher: Fetcher::new(cache, http),
            locations,
            paths,
            prompt,
            out: Mutex::new(out),
            commands: builtin_commands(),
            providers: builtin_providers(),
            formatters: builtin_formatters(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn locations(&self) -> &LocationStore {
        &self.locations
    }

    pub fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    pub fn providers(&self) -> &Registry<ProviderFactory> {
        &self.providers
    }

    pub fn providers_mut(&mut self) -> &mut Registry<ProviderFactory> {
        &mut self.providers
    }

    /// Write to the output sink.
    pub fn write_out(&self, text: &str) -> Result<(), WeatherError> {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| WeatherError::io("<stdout>", e))
    }

    fn formatter(&self) -> Result<Box<dyn Formatter>, WeatherError> {
        let name = &self.options.formatter;
        self.formatters
            .get(name)
            .map(|make| make())
            .ok_or_else(|| WeatherError::UnknownFormatter(name.clone()))
    }

    /// Dispatch on the configured command name.
    ///
    /// A command name runs that command, a provider name runs that provider,
    /// no name runs every provider with failures isolated per provider. Any
    /// other name is [`WeatherError::UnknownName`].
    pub async fn run(&self) -> Result<RunReport, WeatherError> {
        debug!(options = ?self.options, "dispatching");

        let Some(name) = self.options.command.as_deref() else {
            let formatter = self.formatter()?;
            return Ok(self.run_providers(formatter.as_ref()).await);
        };

        if let Some(make) = self.commands.get(name) {
            make().run(self, &self.options.args).await?;
            return Ok(RunReport::default());
        }

        if let Some(make) = self.providers.get(name) {
            let formatter = self.formatter()?;
            let output = self.run_provider(make, formatter.as_ref()).await?;
            return Ok(RunReport {
                outputs: vec![output],
                failures: Vec::new(),
            });
        }

        Err(WeatherError::UnknownName(name.to_string()))
    }

    /// Run every registered provider, one after another.
    ///
    /// A failing provider is logged and recorded; the rest still run.
    pub async fn run_providers(&self, formatter: &dyn Formatter) -> RunReport {
        let mut summary = RunReport::default();

        for (name, make) in self.providers.iter() {
            match self.run_provider(make, formatter).await {
                Ok(output) => summary.outputs.push(output),
                Err(err) => {
                    error!("provider '{name}' failed: {}", report(&err, self.options.debug));
                    summary.failures.push((name.to_string(), err));
                }
            }
        }
        summary
    }

    async fn run_provider(
        &self,
        make: &ProviderFactory,
        formatter: &dyn Formatter,
    ) -> Result<ProviderOutput, WeatherError> {
        let provider = Provider::load(make(), self)?;
        let info = provider.run(self, &self.options.args).await?;

        let output = ProviderOutput {
            provider: provider.id().to_string(),
            title: provider.title().to_string(),
            location: provider.location().name.clone(),
            info,
        };
        self.produce_output(&output, formatter)?;
        Ok(output)
    }

    fn produce_output(
        &self,
        output: &ProviderOutput,
        formatter: &dyn Formatter,
    ) -> Result<(), WeatherError> {
        let day = self.options.day();
        self.write_out(&format!("{}\n{}\n", day.label(), formatter.emit(output)))?;

        if self.options.write_file {
            self.write_file(output, day, &self.paths.output_file)?;
        }
        Ok(())
    }

    fn write_file(&self, output: &ProviderOutput, day: Day, path: &Path) -> Result<(), WeatherError> {
        let suffix = match day {
            Day::Today => "",
            Day::Tomorrow => "  tomorrow",
        };
        let mut text = format!("{}\n{}{suffix}\n", output.title, output.location);
        for (key, value) in output.info.iter() {
            text.push_str(&format!("{key}: {value}\n"));
        }
        fs::write(path, text).map_err(|e| WeatherError::io(path, e))
    }
}
