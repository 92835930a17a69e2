use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};
use tracing::{debug, warn};

use crate::{
    app::App,
    command::{Configurable, Runnable},
    error::{ResolverInputError, WeatherError},
    fetch::Fetcher,
    model::{Day, Location, WeatherInfo},
    provider::{accuweather::AccuWeather, rp5::Rp5, sinoptik::Sinoptik},
    registry::Registry,
    resolver::Resolver,
};

pub mod accuweather;
pub mod rp5;
pub mod sinoptik;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    AccuWeather,
    Rp5,
    Sinoptik,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::AccuWeather => "accu",
            ProviderId::Rp5 => "rp5",
            ProviderId::Sinoptik => "sinoptik",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::AccuWeather, ProviderId::Rp5, ProviderId::Sinoptik]
    }

    pub fn source(&self) -> Box<dyn WeatherSource> {
        match self {
            ProviderId::AccuWeather => Box::new(AccuWeather),
            ProviderId::Rp5 => Box::new(Rp5),
            ProviderId::Sinoptik => Box::new(Sinoptik),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ProviderId::all()
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| WeatherError::UnknownName(value.to_string()))
    }
}

/// How a site lets the user pick a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSource {
    /// A browsable hierarchy starting at this page.
    Browse(Location),
    /// A typed name turned directly into a URL.
    FreeText { question: &'static str },
}

/// What a site parser may use while reading a page.
///
/// Some sites only link to the detailed forecast from the location page, so
/// parsers get the fetcher to follow those links through the cache.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub fetcher: &'a Fetcher,
    pub day: Day,
    pub bypass_cache: bool,
}

impl PageContext<'_> {
    pub async fn follow(&self, url: &str) -> Result<String, WeatherError> {
        self.fetcher.fetch(url, self.bypass_cache).await
    }
}

/// Site-specific knowledge: identity, defaults and page parsing.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    fn id(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn default_location(&self) -> Location;

    fn location_source(&self) -> LocationSource;

    /// Drill-down candidates on a location page. Empty means the page is a leaf.
    fn parse_locations(&self, _content: &str) -> Vec<Location> {
        Vec::new()
    }

    /// Location for a typed name, for [`LocationSource::FreeText`] sites.
    fn location_from_input(&self, input: &str) -> Result<Location, ResolverInputError> {
        Err(ResolverInputError::InvalidName(input.to_string()))
    }

    /// Extract weather fields from the configured location's page.
    async fn parse(&self, content: &str, page: &PageContext<'_>) -> Result<WeatherInfo, WeatherError>;
}

pub type ProviderFactory = Box<dyn Fn() -> Box<dyn WeatherSource> + Send + Sync>;

/// Registry holding every built-in site.
pub fn builtin_providers() -> Registry<ProviderFactory> {
    let mut registry: Registry<ProviderFactory> = Registry::new();
    for id in ProviderId::all() {
        let id = *id;
        registry.add(id.as_str(), Box::new(move || id.source()));
    }
    registry
}

/// Lifecycle stages of one provider run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    SweepingCache,
    Fetching,
    Parsing,
    Done,
    Failed(String),
}

/// A site bound to its configured location for a single invocation.
#[derive(Debug)]
pub struct Provider {
    source: Box<dyn WeatherSource>,
    location: Location,
}

impl Provider {
    /// Bind `source` to its saved location, or to its default.
    pub fn load(source: Box<dyn WeatherSource>, app: &App) -> Result<Self, WeatherError> {
        let location = app
            .locations()
            .load(source.id(), source.default_location())?;
        Ok(Self { source, location })
    }

    pub fn id(&self) -> &'static str {
        self.source.id()
    }

    pub fn title(&self) -> &'static str {
        self.source.title()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    fn transition(&self, state: RunState) {
        debug!(provider = self.id(), ?state, "provider state");
    }

    async fn fetch_and_parse(&self, app: &App) -> Result<WeatherInfo, WeatherError> {
        let options = app.options();

        self.transition(RunState::SweepingCache);
        app.fetcher().cache().sweep()?;

        self.transition(RunState::Fetching);
        let content = app.fetcher().fetch(&self.location.url, options.refresh).await?;

        self.transition(RunState::Parsing);
        let page = PageContext {
            fetcher: app.fetcher(),
            day: options.day(),
            bypass_cache: options.refresh,
        };
        self.source.parse(&content, &page).await
    }
}

#[async_trait]
impl Runnable for Provider {
    type Output = WeatherInfo;

    async fn run(&self, app: &App, _argv: &[String]) -> Result<WeatherInfo, WeatherError> {
        self.transition(RunState::Idle);

        match self.fetch_and_parse(app).await {
            Ok(info) => {
                self.transition(RunState::Done);
                Ok(info)
            }
            Err(err) => {
                self.transition(RunState::Failed(err.to_string()));
                // An unreachable page usually means a stale configured location.
                if let WeatherError::Fetch { url, .. } = &err {
                    warn!(provider = self.id(), url = %url, "resetting configured location");
                    if let Err(reset_err) = app.locations().reset(self.id()) {
                        warn!(provider = self.id(), error = %reset_err, "could not reset location");
                    }
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Configurable for Provider {
    async fn configurate(&self, app: &App) -> Result<Location, WeatherError> {
        let resolver = Resolver::new(
            app.fetcher(),
            app.locations(),
            app.prompt(),
            app.options().refresh,
        );

        match self.source.location_source() {
            LocationSource::Browse(seed) => resolver.resolve(self.source.as_ref(), seed).await,
            LocationSource::FreeText { question } => {
                resolver.resolve_free_text(self.source.as_ref(), question)
            }
        }
    }
}

/// Text content of the first element matching `selector` under `root`, trimmed.
pub(crate) fn select_text(root: scraper::ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = scraper::Selector::parse(selector).ok()?;
    root.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// `href` of the first element matching `selector` under `root`.
pub(crate) fn select_href(root: scraper::ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = scraper::Selector::parse(selector).ok()?;
    root.select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
}
