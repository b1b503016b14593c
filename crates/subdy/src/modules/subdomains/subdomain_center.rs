use super::{decode_response, is_wildcard, SubdomainModule};
use crate::modules::{http_request, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, trace};

const API_URL: &str = "https://api.subdomain.center";

// region:        --- Module info

pub struct SubdomainCenter {
    endpoint: String,
    token: Option<String>,
}

impl SubdomainCenter {
    pub fn new(token: Option<String>) -> Self {
        Self {
            endpoint: API_URL.to_string(),
            token,
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Module for SubdomainCenter {
    fn name(&self) -> String {
        "subdomains/subdomain_center".to_string()
    }

    fn description(&self) -> String {
        "Use api.subdomain.center to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[async_trait]
impl SubdomainModule for SubdomainCenter {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, http_client: &Client, domain: &str) -> Result<Vec<String>> {
        let endpoint = self.endpoint.trim_end_matches('/');

        // the auth token unlocks the beta endpoint
        let request = match &self.token {
            Some(token) => http_client
                .get(format!("{}/beta/", endpoint))
                .query(&[("domain", domain), ("auth", token.as_str())]),
            None => http_client
                .get(format!("{}/", endpoint))
                .query(&[("domain", domain)]),
        };

        let res = http_request(&self.name(), request).await?;
        let entries: Vec<String> = decode_response(&self.name(), res).await?;

        let subdomains: Vec<String> = entries
            .into_iter()
            .filter(|subdomain| !is_wildcard(subdomain))
            .inspect(|subdomain| trace!("Collecting: {:?}", subdomain))
            .collect();

        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}
