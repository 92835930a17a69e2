//! Capabilities shared by commands and providers, and the built-in commands.

use async_trait::async_trait;

use crate::{
    app::App,
    config::{LogLevel, Settings},
    error::WeatherError,
    model::Location,
    provider::Provider,
    registry::Registry,
    resolver::parse_selection,
};

/// Something the dispatcher can execute with the remaining command-line arguments.
#[async_trait]
pub trait Runnable: Send + Sync {
    type Output: Send;

    async fn run(&self, app: &App, argv: &[String]) -> Result<Self::Output, WeatherError>;
}

/// Something that can interactively choose and persist its location.
#[async_trait]
pub trait Configurable: Send + Sync {
    async fn configurate(&self, app: &App) -> Result<Location, WeatherError>;
}

pub type CommandFactory = Box<dyn Fn() -> Box<dyn Runnable<Output = ()>> + Send + Sync>;

pub const CONFIGURATE: &str = "configurate";
pub const PROVIDERS: &str = "providers";
pub const CLEAR_CACHE: &str = "clear_cache";

pub fn builtin_commands() -> Registry<CommandFactory> {
    let mut registry: Registry<CommandFactory> = Registry::new();
    registry.add(CONFIGURATE, Box::new(|| Box::new(Configurate)));
    registry.add(PROVIDERS, Box::new(|| Box::new(ListProviders)));
    registry.add(CLEAR_CACHE, Box::new(|| Box::new(ClearCache)));
    registry
}

/// `configurate [provider]`
///
/// With a provider name, walks that provider's location picker. Without one,
/// `--reset-defaults` forgets every saved location; otherwise the log level
/// menu is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct Configurate;

impl Configurate {
    fn configure_logging(&self, app: &App) -> Result<(), WeatherError> {
        let levels = LogLevel::all();
        let names: Vec<&str> = levels.iter().map(|l| l.as_filter()).collect();
        app.prompt().show_menu(&names);

        let answer = app.prompt().ask("Please select log level: ")?;
        let level = levels[parse_selection(&answer, levels.len())?];

        let path = app.paths().settings_file();
        let mut settings = Settings::load(&path)?;
        settings.app.log_level = level;
        settings.save(&path)?;

        app.write_out(&format!("Log level set to {}\n", level.as_filter()))
    }
}

#[async_trait]
impl Runnable for Configurate {
    type Output = ();

    async fn run(&self, app: &App, argv: &[String]) -> Result<(), WeatherError> {
        let Some(name) = argv.first() else {
            if app.options().reset_defaults {
                app.locations().clear()?;
                return app.write_out("The configuration file is deleted!\n");
            }
            return self.configure_logging(app);
        };

        let make = app
            .providers()
            .get(name)
            .ok_or_else(|| WeatherError::UnknownName(name.clone()))?;
        let provider = Provider::load(make(), app)?;
        let location = provider.configurate(app).await?;

        app.write_out(&format!(
            "{}: location set to {}\n",
            provider.title(),
            location.name
        ))
    }
}

/// `providers`: list every registered provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListProviders;

#[async_trait]
impl Runnable for ListProviders {
    type Output = ();

    async fn run(&self, app: &App, _argv: &[String]) -> Result<(), WeatherError> {
        let mut out = String::from("All available providers:\n");
        for (name, make) in app.providers().iter() {
            out.push_str(&format!("{name}\t{}\n", make().title()));
        }
        app.write_out(&out)
    }
}

/// `clear_cache`: remove every cached page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearCache;

#[async_trait]
impl Runnable for ClearCache {
    type Output = ();

    async fn run(&self, app: &App, _argv: &[String]) -> Result<(), WeatherError> {
        let removed = app.fetcher().cache().clear()?;
        app.write_out(&format!("Cleared {removed} cache files.\n"))
    }
}
