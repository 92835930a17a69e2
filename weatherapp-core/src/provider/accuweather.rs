use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::{
    error::WeatherError,
    model::{Day, Location, WeatherInfo},
    provider::{LocationSource, PageContext, WeatherSource, select_href, select_text},
};

const BASE_URL: &str = "https://www.accuweather.com";
const BROWSE_URL: &str = "https://www.accuweather.com/uk/browse-locations";
const DEFAULT_NAME: &str = "Kyiv";
const DEFAULT_URL: &str = "https://www.accuweather.com/uk/ua/kyiv/324505/weather-forecast/324505";

#[derive(Debug, Clone, Copy, Default)]
pub struct AccuWeather;

fn absolute(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{BASE_URL}/{}", href.trim_start_matches('/'))
    }
}

/// Link to the day's detail page on a location overview page.
fn detail_link(content: &str, day: Day) -> Option<String> {
    let doc = Html::parse_document(content);
    let selector = match day {
        Day::Today => "li.current.first.cl a",
        Day::Tomorrow => "li.day.last.hv.cl a",
    };
    select_href(doc.root_element(), selector).map(|href| absolute(&href))
}

fn read_details(content: &str, day: Day) -> WeatherInfo {
    let doc = Html::parse_document(content);
    let (block, cond, feels_like) = match day {
        Day::Today => ("#detail-now", "span.cond", "span.small-temp"),
        Day::Tomorrow => ("#detail-day-night", "div.cond", "span.realfeel"),
    };

    let mut info = WeatherInfo::new();
    let Ok(block) = Selector::parse(block) else {
        return info;
    };
    let Some(details) = doc.select(&block).next() else {
        return info;
    };

    if let Some(text) = select_text(details, cond) {
        info.insert("cond", text);
    }
    if let Some(text) = select_text(details, "span.large-temp") {
        info.insert("temp", text);
    }
    if let Some(text) = select_text(details, feels_like) {
        info.insert("feels_like", text);
    }
    info
}

#[async_trait]
impl WeatherSource for AccuWeather {
    fn id(&self) -> &'static str {
        "accu"
    }

    fn title(&self) -> &'static str {
        "AccuWeather"
    }

    fn default_location(&self) -> Location {
        Location::new(DEFAULT_NAME, DEFAULT_URL)
    }

    fn location_source(&self) -> LocationSource {
        LocationSource::Browse(Location::new("Browse locations", BROWSE_URL))
    }

    fn parse_locations(&self, content: &str) -> Vec<Location> {
        let doc = Html::parse_document(content);
        let Ok(items) = Selector::parse("li.drilldown.cl") else {
            return Vec::new();
        };

        doc.select(&items)
            .filter_map(|item| {
                let name = select_text(item, "em")?;
                let href = select_href(item, "a")?;
                Some(Location::new(name, absolute(&href)))
            })
            .collect()
    }

    async fn parse(&self, content: &str, page: &PageContext<'_>) -> Result<WeatherInfo, WeatherError> {
        // The overview page only links to the detailed forecast.
        let Some(url) = detail_link(content, page.day) else {
            return Ok(WeatherInfo::new());
        };
        let details = page.follow(&url).await?;
        Ok(read_details(&details, page.day))
    }
}
