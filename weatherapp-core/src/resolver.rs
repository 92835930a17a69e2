//! Interactive location selection.
//!
//! Browsable sites are walked as a tree: every page either lists further
//! locations (a menu) or is itself a leaf. The leaf the user ends up on is
//! saved to the [`LocationStore`].

use std::{collections::HashSet, fmt::Debug, num::IntErrorKind};
use tracing::{debug, info};

use crate::{
    config::LocationStore,
    error::{ResolverInputError, WeatherError},
    fetch::Fetcher,
    model::Location,
    provider::WeatherSource,
};

/// Source of user answers.
pub trait Prompt: Send + Sync + Debug {
    /// Present `entries` as a 1-based numbered menu.
    fn show_menu(&self, entries: &[&str]);

    /// Ask a question and return the raw answer.
    fn ask(&self, question: &str) -> Result<String, ResolverInputError>;
}

/// Turn a menu answer into a 0-based index into a list of `len` entries.
pub fn parse_selection(answer: &str, len: usize) -> Result<usize, ResolverInputError> {
    let answer = answer.trim();
    let value: i64 = match answer.parse() {
        Ok(value) => value,
        Err(e) => {
            return Err(match e.kind() {
                IntErrorKind::PosOverflow => ResolverInputError::OutOfRange {
                    value: i64::MAX,
                    max: len,
                },
                IntErrorKind::NegOverflow => ResolverInputError::OutOfRange {
                    value: i64::MIN,
                    max: len,
                },
                _ => ResolverInputError::NotANumber(answer.to_string()),
            });
        }
    };

    if value < 1 || value as u64 > len as u64 {
        return Err(ResolverInputError::OutOfRange { value, max: len });
    }
    Ok(value as usize - 1)
}

pub struct Resolver<'a> {
    fetcher: &'a Fetcher,
    store: &'a LocationStore,
    prompt: &'a dyn Prompt,
    bypass_cache: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        store: &'a LocationStore,
        prompt: &'a dyn Prompt,
        bypass_cache: bool,
    ) -> Self {
        Self {
            fetcher,
            store,
            prompt,
            bypass_cache,
        }
    }

    /// Drill down from `seed` until a page offers no further locations, then save it.
    ///
    /// Any invalid answer aborts the walk without saving. A menu entry that
    /// leads back to an already visited page aborts with
    /// [`WeatherError::LocationCycle`].
    pub async fn resolve(
        &self,
        source: &dyn WeatherSource,
        seed: Location,
    ) -> Result<Location, WeatherError> {
        let mut current = seed;
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(current.url.clone()) {
                return Err(WeatherError::LocationCycle { url: current.url });
            }

            let page = self.fetcher.fetch(&current.url, self.bypass_cache).await?;
            let candidates = source.parse_locations(&page);
            debug!(url = %current.url, candidates = candidates.len(), "location page parsed");

            if candidates.is_empty() {
                self.store.save(source.id(), &current)?;
                info!(provider = source.id(), name = %current.name, "location configured");
                return Ok(current);
            }

            let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
            self.prompt.show_menu(&names);
            let answer = self.prompt.ask("Please select location: ")?;
            let index = parse_selection(&answer, candidates.len())?;

            current = candidates
                .into_iter()
                .nth(index)
                .ok_or(ResolverInputError::Cancelled)?;
        }
    }

    /// One-step variant for sites addressed by a typed location name.
    pub fn resolve_free_text(
        &self,
        source: &dyn WeatherSource,
        question: &str,
    ) -> Result<Location, WeatherError> {
        let answer = self.prompt.ask(question)?;
        let location = source.location_from_input(answer.trim())?;
        self.store.save(source.id(), &location)?;
        info!(provider = source.id(), name = %location.name, "location configured");
        Ok(location)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        cache::CacheStore,
        fetch::tests::FakeHttp,
        model::WeatherInfo,
        provider::{LocationSource, PageContext},
    };
    use async_trait::async_trait;
    use std::{collections::VecDeque, sync::Mutex, time::Duration};

    /// Replays canned answers and records every menu shown.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedPrompt {
        answers: Mutex<VecDeque<String>>,
        pub(crate) menus: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedPrompt {
        pub(crate) fn answering(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                menus: Mutex::default(),
            }
        }

        pub(crate) fn questions_left(&self) -> usize {
            self.answers.lock().unwrap().len()
        }
    }

    impl Prompt for ScriptedPrompt {
        fn show_menu(&self, entries: &[&str]) {
            self.menus
                .lock()
                .unwrap()
                .push(entries.iter().map(|e| e.to_string()).collect());
        }

        fn ask(&self, _question: &str) -> Result<String, ResolverInputError> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(ResolverInputError::Cancelled)
        }
    }

    /// Pages are lines of `name|url`; an empty page is a leaf.
    #[derive(Debug)]
    struct LineSite;

    #[async_trait]
    impl WeatherSource for LineSite {
        fn id(&self) -> &'static str {
            "lines"
        }
        fn title(&self) -> &'static str {
            "Lines"
        }
        fn default_location(&self) -> Location {
            Location::new("Default", "http://lines/default")
        }
        fn location_source(&self) -> LocationSource {
            LocationSource::Browse(Location::new("World", "http://lines/"))
        }
        fn parse_locations(&self, content: &str) -> Vec<Location> {
            content
                .lines()
                .filter_map(|l| l.split_once('|'))
                .map(|(n, u)| Location::new(n, u))
                .collect()
        }
        fn location_from_input(&self, input: &str) -> Result<Location, ResolverInputError> {
            if input.is_empty() {
                return Err(ResolverInputError::InvalidName(input.to_string()));
            }
            Ok(Location::new(input, format!("http://lines/{input}")))
        }
        async fn parse(&self, _: &str, _: &PageContext<'_>) -> Result<WeatherInfo, WeatherError> {
            Ok(WeatherInfo::new())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        fetcher: Fetcher,
        store: LocationStore,
    }

    fn fixture(http: FakeHttp) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(
            CacheStore::new(dir.path().join("cache"), Duration::from_secs(300)),
            Box::new(http),
        );
        let store = LocationStore::new(dir.path().join("locations.toml"));
        Fixture {
            _dir: dir,
            fetcher,
            store,
        }
    }

    fn site() -> FakeHttp {
        FakeHttp::default()
            .with_page("http://lines/", "A|http://lines/u1\nB|http://lines/u2")
            .with_page("http://lines/u1", "")
            .with_page("http://lines/u2", "")
    }

    fn seed() -> Location {
        Location::new("World", "http://lines/")
    }

    #[test]
    fn parse_selection_bounds() {
        assert_eq!(parse_selection("1", 2), Ok(0));
        assert_eq!(parse_selection(" 2\n", 2), Ok(1));
        assert_eq!(
            parse_selection("0", 2),
            Err(ResolverInputError::OutOfRange { value: 0, max: 2 })
        );
        assert_eq!(
            parse_selection("-3", 2),
            Err(ResolverInputError::OutOfRange { value: -3, max: 2 })
        );
        assert_eq!(
            parse_selection("x", 2),
            Err(ResolverInputError::NotANumber("x".into()))
        );
    }

    #[test]
    fn overflowing_selection_is_out_of_range() {
        assert!(matches!(
            parse_selection("99999999999999999999", 2),
            Err(ResolverInputError::OutOfRange { max: 2, .. })
        ));
        assert!(matches!(
            parse_selection("-99999999999999999999", 2),
            Err(ResolverInputError::OutOfRange { max: 2, .. })
        ));
    }

    #[tokio::test]
    async fn leaf_seed_is_saved_without_asking() {
        let fx = fixture(FakeHttp::default().with_page("http://lines/", "no menu here"));
        let prompt = ScriptedPrompt::default();
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let chosen = resolver.resolve(&LineSite, seed()).await.unwrap();

        assert_eq!(chosen, seed());
        assert!(prompt.menus.lock().unwrap().is_empty());
        assert_eq!(fx.store.load("lines", LineSite.default_location()).unwrap(), seed());
    }

    #[tokio::test]
    async fn selection_descends_to_chosen_candidate() {
        let fx = fixture(site());
        let prompt = ScriptedPrompt::answering(&["2"]);
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let chosen = resolver.resolve(&LineSite, seed()).await.unwrap();

        assert_eq!(chosen, Location::new("B", "http://lines/u2"));
        assert_eq!(*prompt.menus.lock().unwrap(), vec![vec!["A".to_string(), "B".to_string()]]);
        assert_eq!(fx.store.load("lines", LineSite.default_location()).unwrap(), chosen);
    }

    #[tokio::test]
    async fn multi_level_walk() {
        let http = FakeHttp::default()
            .with_page("http://lines/", "Europe|http://lines/eu\nAsia|http://lines/as")
            .with_page("http://lines/eu", "Ukraine|http://lines/ua")
            .with_page("http://lines/ua", "Kyiv|http://lines/kyiv\nLviv|http://lines/lviv")
            .with_page("http://lines/lviv", "");
        let fx = fixture(http);
        let prompt = ScriptedPrompt::answering(&["1", "1", "2"]);
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let chosen = resolver.resolve(&LineSite, seed()).await.unwrap();

        assert_eq!(chosen, Location::new("Lviv", "http://lines/lviv"));
        assert_eq!(prompt.menus.lock().unwrap().len(), 3);
        assert_eq!(prompt.questions_left(), 0);
    }

    #[tokio::test]
    async fn out_of_range_aborts_without_saving() {
        let fx = fixture(site());
        let prompt = ScriptedPrompt::answering(&["5"]);
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let err = resolver.resolve(&LineSite, seed()).await.unwrap_err();

        assert!(matches!(
            err,
            WeatherError::ResolverInput(ResolverInputError::OutOfRange { value: 5, max: 2 })
        ));
        assert!(!fx.store.path().exists());
    }

    #[tokio::test]
    async fn non_numeric_aborts_without_saving() {
        let fx = fixture(site());
        let prompt = ScriptedPrompt::answering(&["x"]);
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let err = resolver.resolve(&LineSite, seed()).await.unwrap_err();

        assert!(matches!(
            err,
            WeatherError::ResolverInput(ResolverInputError::NotANumber(_))
        ));
        assert!(!fx.store.path().exists());
    }

    #[tokio::test]
    async fn cycle_back_to_ancestor_is_rejected() {
        let http = FakeHttp::default()
            .with_page("http://lines/", "Loop|http://lines/loop")
            .with_page("http://lines/loop", "Back|http://lines/");
        let fx = fixture(http);
        let prompt = ScriptedPrompt::answering(&["1", "1"]);
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let err = resolver.resolve(&LineSite, seed()).await.unwrap_err();

        match err {
            WeatherError::LocationCycle { url } => assert_eq!(url, "http://lines/"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!fx.store.path().exists());
    }

    #[test]
    fn free_text_saves_constructed_location() {
        let fx = fixture(FakeHttp::default());
        let prompt = ScriptedPrompt::answering(&["odesa"]);
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let chosen = resolver.resolve_free_text(&LineSite, "City: ").unwrap();

        assert_eq!(chosen, Location::new("odesa", "http://lines/odesa"));
        assert_eq!(fx.store.load("lines", LineSite.default_location()).unwrap(), chosen);
    }

    #[test]
    fn free_text_rejection_saves_nothing() {
        let fx = fixture(FakeHttp::default());
        let prompt = ScriptedPrompt::answering(&["   "]);
        let resolver = Resolver::new(&fx.fetcher, &fx.store, &prompt, false);

        let err = resolver.resolve_free_text(&LineSite, "City: ").unwrap_err();

        assert!(matches!(
            err,
            WeatherError::ResolverInput(ResolverInputError::InvalidName(_))
        ));
        assert!(!fx.store.path().exists());
    }
}
