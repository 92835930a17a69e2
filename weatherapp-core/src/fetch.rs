use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Debug;
use tracing::{debug, info};

use crate::{cache::CacheStore, config::REQUEST_HEADERS, error::WeatherError};

/// Blocking-in-spirit GET: the caller awaits each request before issuing the next.
#[async_trait]
pub trait HttpClient: Send + Sync + Debug {
    /// Raw body of `url`. Transport failures and non-2xx statuses are errors.
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, WeatherError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    http: Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, WeatherError> {
        let mut req = self.http.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let res = req.send().await.map_err(|e| WeatherError::fetch(url, e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(WeatherError::fetch(url, format!("HTTP status {status}")));
        }

        let body = res.bytes().await.map_err(|e| WeatherError::fetch(url, e))?;
        Ok(body.to_vec())
    }
}

/// Cache-aware page retrieval.
#[derive(Debug)]
pub struct Fetcher {
    cache: CacheStore,
    http: Box<dyn HttpClient>,
}

impl Fetcher {
    pub fn new(cache: CacheStore, http: Box<dyn HttpClient>) -> Self {
        Self { cache, http }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Page text for `url`.
    ///
    /// Served from the cache when a fresh entry exists and `bypass_cache` is
    /// false; otherwise fetched over the network and written back to the cache.
    pub async fn fetch(&self, url: &str, bypass_cache: bool) -> Result<String, WeatherError> {
        if !bypass_cache {
            if let Some(bytes) = self.cache.get(url)? {
                debug!(url, "cache hit");
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }
            debug!(url, "cache miss");
        }

        info!(url, "fetching page");
        let bytes = self.http.get(url, REQUEST_HEADERS).await?;
        self.cache.put(url, &bytes)?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    /// In-memory site: URL → body. Unknown URLs fail like an unreachable host.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeHttp {
        pages: Arc<Mutex<HashMap<String, String>>>,
        pub(crate) requests: Arc<Mutex<Vec<String>>>,
    }

    impl FakeHttp {
        pub(crate) fn with_page(self, url: &str, body: &str) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), body.to_string());
            self
        }

        pub(crate) fn set_page(&self, url: &str, body: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), body.to_string());
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttp {
        async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<Vec<u8>, WeatherError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .lock()
                .unwrap()
                .get(url)
                .map(|body| body.clone().into_bytes())
                .ok_or_else(|| WeatherError::fetch(url, "HTTP status 404 Not Found"))
        }
    }

    fn fetcher(dir: &tempfile::TempDir, http: &FakeHttp) -> Fetcher {
        Fetcher::new(
            CacheStore::new(dir.path(), Duration::from_secs(300)),
            Box::new(http.clone()),
        )
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let http = FakeHttp::default().with_page("http://site/a", "<p>a</p>");
        let fetcher = fetcher(&dir, &http);

        assert_eq!(fetcher.fetch("http://site/a", false).await.unwrap(), "<p>a</p>");
        assert_eq!(fetcher.fetch("http://site/a", false).await.unwrap(), "<p>a</p>");
        assert_eq!(http.request_count(), 1);
    }

    #[tokio::test]
    async fn bypass_always_hits_network_and_overwrites_entry() {
        let dir = tempfile::tempdir().unwrap();
        let http = FakeHttp::default().with_page("http://site/a", "v1");
        let fetcher = fetcher(&dir, &http);

        fetcher.fetch("http://site/a", false).await.unwrap();
        http.set_page("http://site/a", "v2");

        assert_eq!(fetcher.fetch("http://site/a", true).await.unwrap(), "v2");
        assert_eq!(http.request_count(), 2);
        assert_eq!(
            fetcher.cache().get("http://site/a").unwrap().as_deref(),
            Some(&b"v2"[..])
        );
    }

    #[tokio::test]
    async fn transport_error_carries_url_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let http = FakeHttp::default();
        let fetcher = fetcher(&dir, &http);

        let err = fetcher.fetch("http://site/missing", false).await.unwrap_err();

        match err {
            WeatherError::Fetch { url, .. } => assert_eq!(url, "http://site/missing"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fetcher.cache().entries().unwrap().is_empty());
    }
}
