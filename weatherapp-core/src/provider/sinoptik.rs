use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::{
    error::{ResolverInputError, WeatherError},
    model::{Day, Location, WeatherInfo},
    provider::{LocationSource, PageContext, WeatherSource, select_href, select_text},
};

const BASE_URL: &str = "https://ua.sinoptik.ua";
const DEFAULT_NAME: &str = "Kyiv";
const DEFAULT_URL: &str =
    "https://ua.sinoptik.ua/%D0%BF%D0%BE%D0%B3%D0%BE%D0%B4%D0%B0-%D0%BA%D0%B8%D1%97%D0%B2";

#[derive(Debug, Clone, Copy, Default)]
pub struct Sinoptik;

fn is_cyrillic_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c == '-' || ('\u{0400}'..='\u{04FF}').contains(&c))
}

fn block<'a>(doc: &'a Html, selector: &str) -> Option<scraper::ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector).next()
}

fn read_today(doc: &Html) -> WeatherInfo {
    let mut info = WeatherInfo::new();
    let Some(tabs) = block(doc, ".tabsContent") else {
        return info;
    };

    if let Some(cond) = select_text(tabs, ".wDescription .description") {
        info.insert("cond", cond);
    }
    if let Some(temp) = select_text(tabs, "p.today-temp") {
        info.insert("temp", temp);
    }
    let feels = select_text(tabs, "tr.temperatureSens td.cur")
        .or_else(|| select_text(tabs, "tr.temperatureSens td"));
    if let Some(feels) = feels {
        info.insert("feels_like", feels);
    }
    info
}

/// Tomorrow's min/max plus the link to tomorrow's page, which holds the description.
fn read_tomorrow(content: &str) -> (WeatherInfo, Option<String>) {
    let doc = Html::parse_document(content);
    let mut info = WeatherInfo::new();
    let Some(day) = block(&doc, "#bd2") else {
        return (info, None);
    };

    if let Some(max) = select_text(day, ".max") {
        info.insert("temp", max);
    }
    if let Some(min) = select_text(day, ".min") {
        info.insert("temp_min", min);
    }
    let link = select_href(day, "a").map(|href| {
        if href.starts_with("//") {
            format!("https:{href}")
        } else if href.starts_with('/') {
            format!("{BASE_URL}{href}")
        } else {
            href
        }
    });
    (info, link)
}

#[async_trait]
impl WeatherSource for Sinoptik {
    fn id(&self) -> &'static str {
        "sinoptik"
    }

    fn title(&self) -> &'static str {
        "SINOPTIK.UA"
    }

    fn default_location(&self) -> Location {
        Location::new(DEFAULT_NAME, DEFAULT_URL)
    }

    fn location_source(&self) -> LocationSource {
        LocationSource::FreeText {
            question: "Введіть назву міста кирилицею: ",
        }
    }

    fn location_from_input(&self, input: &str) -> Result<Location, ResolverInputError> {
        let name = input.trim().to_lowercase();
        if !is_cyrillic_name(&name) {
            return Err(ResolverInputError::InvalidName(input.to_string()));
        }
        let path = urlencoding::encode(&format!("погода-{name}")).into_owned();
        Ok(Location::new(name, format!("{BASE_URL}/{path}")))
    }

    async fn parse(&self, content: &str, page: &PageContext<'_>) -> Result<WeatherInfo, WeatherError> {
        if page.day == Day::Today {
            let doc = Html::parse_document(content);
            return Ok(read_today(&doc));
        }

        let (mut info, link) = read_tomorrow(content);
        if let Some(url) = link {
            let tomorrow = page.follow(&url).await?;
            let doc = Html::parse_document(&tomorrow);
            if let Some(cond) = block(&doc, ".wDescription")
                .and_then(|desc| select_text(desc, ".description"))
            {
                // The description goes first, as on the today view.
                let mut ordered = WeatherInfo::new();
                ordered.insert("cond", cond);
                for (k, v) in info.iter() {
                    ordered.insert(k, v);
                }
                info = ordered;
            }
        }
        Ok(info)
    }
}
