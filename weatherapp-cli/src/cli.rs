use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{debug, warn};
use weatherapp_core::{
    App, Options, Paths, ReqwestClient, RunReport, Settings, WeatherError, format::DEFAULT_FORMATTER,
    report,
};

use crate::{logging, prompt::TerminalPrompt};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherapp", version, about = "Weather site aggregator")]
pub struct Cli {
    /// Command (`configurate`, `providers`, `clear_cache`) or provider name.
    /// Without one, every provider is run.
    pub command: Option<String>,

    /// Arguments for the command, e.g. the provider for `configurate`.
    pub args: Vec<String>,

    /// Show tomorrow's forecast instead of today's weather.
    #[arg(long)]
    pub tomorrow: bool,

    /// Also write the result to `weatherapp.txt`.
    #[arg(long)]
    pub write_file: bool,

    /// Ignore cached pages and fetch again.
    #[arg(long)]
    pub refresh: bool,

    /// With `configurate`: forget every saved location.
    #[arg(long)]
    pub reset_defaults: bool,

    /// Print full error details.
    #[arg(long)]
    pub debug: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format: list, table, csv or json.
    #[arg(short, long, default_value = DEFAULT_FORMATTER)]
    pub formatter: String,
}

impl Cli {
    fn into_options(self) -> Options {
        Options {
            command: self.command,
            args: self.args,
            tomorrow: self.tomorrow,
            write_file: self.write_file,
            refresh: self.refresh,
            reset_defaults: self.reset_defaults,
            debug: self.debug,
            verbose: self.verbose,
            formatter: self.formatter,
        }
    }

    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let options = self.into_options();
        let paths = Paths::discover().context("cannot determine configuration directories")?;

        // A broken settings file is removed by the loader; carry on with defaults.
        let settings = match Settings::load(&paths.settings_file()) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("{}", report(&err, options.debug));
                Settings::default()
            }
        };
        logging::init(&settings.app, options.verbose)?;
        debug!(config_dir = %paths.config_dir.display(), "starting");

        let debug_errors = options.debug;
        let batch = options.command.is_none();
        let app = App::new(
            options,
            paths,
            Box::new(ReqwestClient::new()),
            Box::new(TerminalPrompt),
            Box::new(std::io::stdout()),
        );

        Ok(exit_code(app.run().await, batch, debug_errors))
    }
}

/// A batch run has already logged its failures and always succeeds; a single
/// command or provider fails the process.
fn exit_code(outcome: Result<RunReport, WeatherError>, batch: bool, debug: bool) -> ExitCode {
    match outcome {
        Ok(summary) => {
            if batch && !summary.failures.is_empty() {
                warn!(
                    failed = summary.failures.len(),
                    succeeded = summary.outputs.len(),
                    "some providers failed"
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", report(&err, debug));
            ExitCode::FAILURE
        }
    }
}
