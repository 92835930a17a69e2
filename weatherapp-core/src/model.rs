use serde::{Deserialize, Serialize, ser::SerializeMap};

/// A named location on a weather site.
///
/// Produced either from a provider's defaults, from a drill-down menu
/// candidate, or from the configuration store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub url: String,
}

impl Location {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Which forecast day the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Day {
    #[default]
    Today,
    Tomorrow,
}

impl Day {
    pub fn label(&self) -> &'static str {
        match self {
            Day::Today => "Today",
            Day::Tomorrow => "Tomorrow",
        }
    }
}

/// Field key → value pairs scraped from a weather page, in insertion order.
///
/// Keys are only present if the page exposed them; an empty value set is a
/// valid (if unhelpful) result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherInfo {
    fields: Vec<(String, String)>,
}

impl WeatherInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WeatherInfo {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut info = WeatherInfo::new();
        for (k, v) in iter {
            info.insert(k, v);
        }
        info
    }
}

impl Serialize for WeatherInfo {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// What one successful provider run hands to the output stage.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderOutput {
    pub provider: String,
    pub title: String,
    pub location: String,
    pub info: WeatherInfo,
}
