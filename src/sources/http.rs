use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{HarvestError, Result};
use crate::models::RemoteItem;
use crate::sources::Fetcher;

const USER_AGENT: &str = concat!("meteo-harvest/", env!("CARGO_PKG_VERSION"));

/// Seam for anything that turns a URL into bytes; lets jobs run against a
/// stub in tests.
pub trait UrlFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP client shared by every HTTP feed of a run. One fetch at a
/// time, no retries; a failed request is an entity-level failure and the
/// next run picks the item up again.
pub struct HttpClient {
    client: Client,
}

impl UrlFetcher for HttpClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        HttpClient::get(self, url)
    }
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| HarvestError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::Transport(format!("{url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .map_err(|err| HarvestError::Transport(format!("{url}: {err}")))?;
        Ok(body.to_vec())
    }
}

/// Feed over a fixed list of URLs, one per remote item. Covers services that
/// publish a known file per station or per period instead of a listable
/// directory.
pub struct UrlFeed<'a> {
    client: &'a HttpClient,
    items: Vec<(RemoteItem, String)>,
}

impl<'a> UrlFeed<'a> {
    pub fn new(client: &'a HttpClient) -> Self {
        Self {
            client,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, ident: &str, url: &str) {
        self.items
            .push((RemoteItem::new(name, ident), url.to_string()));
    }
}

impl Fetcher for UrlFeed<'_> {
    fn list_available(&self) -> Result<Vec<RemoteItem>> {
        Ok(self.items.iter().map(|(item, _)| item.clone()).collect())
    }

    fn fetch(&self, item: &RemoteItem) -> Result<Vec<u8>> {
        let url = self
            .items
            .iter()
            .find(|(known, _)| known.name == item.name)
            .map(|(_, url)| url.as_str())
            .ok_or_else(|| {
                HarvestError::Transport(format!("unknown item '{}' for this feed", item.name))
            })?;
        self.client.get(url)
    }
}

/// Substitute the `{station}` placeholder of a feed URL template.
pub fn station_url(template: &str, station_id: &str) -> Result<String> {
    if !template.contains("{station}") {
        return Err(HarvestError::Config(format!(
            "url template '{template}' has no {{station}} placeholder"
        )));
    }
    Ok(template.replace("{station}", station_id))
}
