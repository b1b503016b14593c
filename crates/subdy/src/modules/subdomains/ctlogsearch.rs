use super::{belongs_to, decode_response, is_wildcard, SubdomainModule};
use crate::modules::{http_request, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, instrument, trace};

const API_URL: &str = "https://ctlogsearch.com";

// region:        --- Module info

pub struct CtLogSearch {
    endpoint: String,
}

impl CtLogSearch {
    pub fn new() -> Self {
        Self {
            endpoint: API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Module for CtLogSearch {
    fn name(&self) -> String {
        "subdomains/ctlogsearch".to_string()
    }

    fn description(&self) -> String {
        "Use ctlogsearch.com valid certificates to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    data: Vec<CertEntry>,
}

#[derive(Debug, Deserialize)]
struct CertEntry {
    #[serde(default)]
    issuedname: String,
}

#[async_trait]
impl SubdomainModule for CtLogSearch {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, http_client: &Client, domain: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/api/v1/search/domain/valid/{}",
            self.endpoint.trim_end_matches('/'),
            domain
        );
        // cache buster
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let request = http_client.get(url).query(&[("_", timestamp)]);

        let res = http_request(&self.name(), request).await?;
        let search: SearchResult = decode_response(&self.name(), res).await?;

        // the search also matches unrelated names
        let subdomains: Vec<String> = search
            .data
            .into_iter()
            .map(|entry| entry.issuedname)
            .filter(|subdomain| !is_wildcard(subdomain) && belongs_to(subdomain, domain))
            .inspect(|subdomain| trace!("Collecting: {:?}", subdomain))
            .collect();

        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}
