use super::{decode_response, is_wildcard, SubdomainModule};
use crate::modules::{http_request, Module};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

const API_URL: &str = "https://api.certspotter.com";

// region:        --- Module info

pub struct CertSpotter {
    endpoint: String,
    token: Option<String>,
}

impl CertSpotter {
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

impl Module for CertSpotter {
    fn name(&self) -> String {
        "subdomains/certspotter".to_string()
    }

    fn description(&self) -> String {
        "Use CertSpotter certificate issuances to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct Issuance {
    #[serde(default)]
    dns_names: Vec<String>,
}

#[async_trait]
impl SubdomainModule for CertSpotter {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, http_client: &Client, domain: &str) -> Result<Vec<String>> {
        let url = format!("{}/v1/issuances", self.endpoint.trim_end_matches('/'));
        let mut request = http_client.get(url).query(&[
            ("domain", domain),
            ("include_subdomains", "true"),
            ("expand", "dns_names"),
        ]);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = http_request(&self.name(), request).await?;
        let issuances: Vec<Issuance> = decode_response(&self.name(), res).await?;

        let subdomains: Vec<String> = issuances
            .into_iter()
            .flat_map(|issuance| issuance.dns_names)
            .filter(|subdomain| !is_wildcard(subdomain))
            .inspect(|subdomain| trace!("Collecting: {:?}", subdomain))
            .collect();

        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}
