use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::{
    error::WeatherError,
    model::{Day, Location, WeatherInfo},
    provider::{LocationSource, PageContext, WeatherSource, select_text},
};

const BASE_URL: &str = "http://rp5.ua";
const BROWSE_URL: &str =
    "http://rp5.ua/%D0%9F%D0%BE%D0%B3%D0%BE%D0%B4%D0%B0_%D0%B2_%D1%81%D0%B2%D1%96%D1%82%D1%96";
const DEFAULT_NAME: &str = "Kyiv";
const DEFAULT_URL: &str =
    "http://rp5.ua/%D0%9F%D0%BE%D0%B3%D0%BE%D0%B4%D0%B0_%D0%B2_%D0%9A%D0%B8%D1%94%D0%B2%D1%96";

#[derive(Debug, Clone, Copy, Default)]
pub struct Rp5;

/// Join a site-relative href onto the base URL, percent-encoding each path segment.
fn site_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let path = href
        .trim_start_matches('/')
        .split('/')
        .map(|segment| {
            let decoded = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            urlencoding::encode(&decoded).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("{BASE_URL}/{path}")
}

/// Text after the last `F,` marker, where rp5 puts the sky description.
fn condition_after_fahrenheit(text: &str) -> Option<String> {
    let (_, tail) = text.rsplit_once("F,")?;
    let tail = tail.split_whitespace().collect::<Vec<_>>().join(" ");
    (!tail.is_empty()).then_some(tail)
}

fn links(doc: &Html, selector: &str) -> Vec<Location> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let name = a.text().collect::<String>().trim().to_string();
            (!name.is_empty()).then(|| Location::new(name, site_url(href)))
        })
        .collect()
}

fn read_today(doc: &Html) -> WeatherInfo {
    let mut info = WeatherInfo::new();
    let Ok(block) = Selector::parse("#archiveString") else {
        return info;
    };
    let Some(archive) = doc.select(&block).next() else {
        return info;
    };

    let text = archive.text().collect::<String>();
    if let Some(cond) = condition_after_fahrenheit(&text) {
        info.insert("cond", cond);
    }
    if let Some(temp) = select_text(archive, ".ArchiveTemp .t_0") {
        info.insert("temp", temp);
    }
    if let Some(feels) = select_text(archive, ".ArchiveTempFeeling .t_0") {
        info.insert("feels_like", feels);
    }
    info
}

fn read_tomorrow(doc: &Html) -> WeatherInfo {
    let mut info = WeatherInfo::new();
    let Ok(block) = Selector::parse("#forecastShort-content") else {
        return info;
    };
    let Some(forecast) = doc.select(&block).next() else {
        return info;
    };

    if let Ok(bold) = Selector::parse("b") {
        let cond = forecast
            .select(&bold)
            .map(|b| b.text().collect::<String>())
            .find(|text| text.contains("Завтра"))
            .and_then(|text| condition_after_fahrenheit(&text));
        if let Some(cond) = cond {
            info.insert("cond", cond);
        }
    }
    if let Some(temp) = select_text(forecast, "span.second-part .t_0") {
        info.insert("temp", temp);
    }
    info
}

#[async_trait]
impl WeatherSource for Rp5 {
    fn id(&self) -> &'static str {
        "rp5"
    }

    fn title(&self) -> &'static str {
        "RP5.ua"
    }

    fn default_location(&self) -> Location {
        Location::new(DEFAULT_NAME, DEFAULT_URL)
    }

    fn location_source(&self) -> LocationSource {
        LocationSource::Browse(Location::new("Погода в світі", BROWSE_URL))
    }

    fn parse_locations(&self, content: &str) -> Vec<Location> {
        let doc = Html::parse_document(content);
        let countries = links(&doc, "div.country_map_links a");
        if !countries.is_empty() {
            return countries;
        }
        links(&doc, "h3 a")
    }

    async fn parse(&self, content: &str, page: &PageContext<'_>) -> Result<WeatherInfo, WeatherError> {
        let doc = Html::parse_document(content);
        Ok(match page.day {
            Day::Today => read_today(&doc),
            Day::Tomorrow => read_tomorrow(&doc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::CacheStore, fetch::Fetcher, fetch::tests::FakeHttp};
    use std::time::Duration;

    const TODAY: &str = r#"
        <div id="archiveString">
          <div class="ArchiveTemp"><span class="t_0">+3 °C</span><span class="t_1">+37 °F</span></div>
          <div class="ArchiveTempFeeling"><span class="t_0">-1 °C</span></div>
          <div class="ArchiveInfo">+3 °C / 37 °F, хмарно, слабкий дощ</div>
        </div>"#;

    const TOMORROW: &str = r#"
        <div id="forecastShort-content">
          <b>Завтра: +7 °C / 45 °F, ясно</b>
          <span class="second-part"><span class="t_0">+7</span></span>
        </div>"#;

    fn page_for(fetcher: &Fetcher, day: Day) -> PageContext<'_> {
        PageContext {
            fetcher,
            day,
            bypass_cache: false,
        }
    }

    fn fetcher(dir: &tempfile::TempDir) -> Fetcher {
        Fetcher::new(
            CacheStore::new(dir.path(), Duration::from_secs(300)),
            Box::new(FakeHttp::default()),
        )
    }

    #[test]
    fn country_links_are_preferred() {
        let html = r#"
            <div class="country_map_links"><a href="/Погода_в_Україні">Україна</a></div>
            <h3><a href="/ignored">Ignored</a></h3>"#;

        let found = Rp5.parse_locations(html);

        assert_eq!(
            found,
            vec![Location::new(
                "Україна",
                "http://rp5.ua/%D0%9F%D0%BE%D0%B3%D0%BE%D0%B4%D0%B0_%D0%B2_%D0%A3%D0%BA%D1%80%D0%B0%D1%97%D0%BD%D1%96"
            )]
        );
    }

    #[test]
    fn falls_back_to_headings() {
        let html = r#"<h3><a href="Kyiv_weather">Київ</a></h3>"#;
        assert_eq!(
            Rp5.parse_locations(html),
            vec![Location::new("Київ", "http://rp5.ua/Kyiv_weather")]
        );
    }

    #[test]
    fn already_encoded_href_is_not_double_encoded() {
        assert_eq!(site_url("/%D0%9A"), "http://rp5.ua/%D0%9A");
    }

    #[tokio::test]
    async fn reads_current_archive_string() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&dir);

        let info = Rp5.parse(TODAY, &page_for(&fetcher, Day::Today)).await.unwrap();

        assert_eq!(info.get("cond"), Some("хмарно, слабкий дощ"));
        assert_eq!(info.get("temp"), Some("+3 °C"));
        assert_eq!(info.get("feels_like"), Some("-1 °C"));
    }

    #[tokio::test]
    async fn reads_tomorrow_forecast() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&dir);

        let info = Rp5.parse(TOMORROW, &page_for(&fetcher, Day::Tomorrow)).await.unwrap();

        assert_eq!(info.get("cond"), Some("ясно"));
        assert_eq!(info.get("temp"), Some("+7"));
        assert_eq!(info.get("feels_like"), None);
    }

    #[tokio::test]
    async fn unrelated_page_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&dir);

        let info = Rp5.parse("<p>maintenance</p>", &page_for(&fetcher, Day::Today)).await.unwrap();
        assert!(info.is_empty());
    }
}
