use std::future::Future;

use anyhow::{Context, Result};
use photo_model::{Photo, SearchPage};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::Configuration;
use crate::error::FetchError;
use crate::events::PageRequest;

const FEED_PATH: &str = "photos";
const SEARCH_PATH: &str = "search/photos";

/// A source of photo pages.
///
/// `UnsplashClient` is the production implementation; tests substitute their
/// own to control timing and failures.
pub trait PhotoApi: Send + Sync + 'static {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<Vec<Photo>, FetchError>> + Send;
}

/// HTTP client for the curated feed and search endpoints.
#[derive(Debug, Clone)]
pub struct UnsplashClient {
    http: Client,
    feed_url: Url,
    search_url: Url,
    access_key: String,
    per_page: Option<u32>,
}

impl UnsplashClient {
    pub fn new(cfg: &Configuration) -> Result<Self> {
        let access_key = cfg.resolve_access_key().unwrap_or_else(|| {
            tracing::warn!(
                env = %cfg.access_key_env,
                "no access key configured; the photo API will reject requests"
            );
            String::new()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Accept-Version", HeaderValue::from_static("v1"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Self::with_client(http, &cfg.api_base_url, access_key, cfg.per_page)
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        access_key: String,
        per_page: Option<u32>,
    ) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("invalid api base url: {base_url}"))?;
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let feed_url = base.join(FEED_PATH).context("building feed url")?;
        let search_url = base.join(SEARCH_PATH).context("building search url")?;
        Ok(Self {
            http,
            feed_url,
            search_url,
            access_key,
            per_page,
        })
    }

    /// Target URL for one page: the feed endpoint for an empty query, search otherwise.
    pub fn page_url(&self, page: u32, query: &str) -> Url {
        let mut url = if query.is_empty() {
            self.feed_url.clone()
        } else {
            self.search_url.clone()
        };
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_id", &self.access_key);
            pairs.append_pair("page", &page.to_string());
            if let Some(per_page) = self.per_page {
                pairs.append_pair("per_page", &per_page.to_string());
            }
            if !query.is_empty() {
                pairs.append_pair("query", query);
            }
        }
        url
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: redacted(&url),
            });
        }
        let body = response.bytes().await.map_err(FetchError::Transport)?;
        Ok(body.to_vec())
    }
}

impl PhotoApi for UnsplashClient {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<Vec<Photo>, FetchError>> + Send {
        async move {
            let url = self.page_url(request.page, &request.query);
            debug!(
                id = request.id,
                page = request.page,
                query = %request.query,
                "GET {}",
                redacted(&url)
            );
            let body = self.get_bytes(url).await?;
            if request.is_search() {
                let page: SearchPage = serde_json::from_slice(&body)?;
                debug!(
                    total = page.total,
                    total_pages = page.total_pages,
                    returned = page.results.len(),
                    "search page decoded"
                );
                Ok(page.results)
            } else {
                Ok(serde_json::from_slice(&body)?)
            }
        }
    }
}

/// URL without its query string, so the access key never reaches logs.
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
