pub mod certspotter;
pub mod ctlogsearch;
pub mod subdomain_center;

use super::Module;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

#[async_trait]
pub trait SubdomainModule: Module + Send + Sync {
    async fn enumerate(&self, http_client: &Client, domain: &str) -> Result<Vec<String>>;
}

/// Wildcard names are not concrete hosts.
pub fn is_wildcard(name: &str) -> bool {
    name.starts_with('*')
}

/// True when `name` is `domain` itself or one of its subdomains.
pub fn belongs_to(name: &str, domain: &str) -> bool {
    let name = name.trim_end_matches('.').to_lowercase();
    let domain = domain.trim_end_matches('.').to_lowercase();

    name == domain || name.ends_with(&format!(".{}", domain))
}

/// Checks the status and decodes the JSON body of a provider response.
pub async fn decode_response<T: DeserializeOwned>(provider: &str, res: Response) -> Result<T> {
    let status = res.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }

    let body = res.bytes().await.map_err(|reason| Error::Transport {
        provider: provider.to_string(),
        reason,
    })?;

    serde_json::from_slice(&body).map_err(|err| Error::Decode {
        provider: provider.to_string(),
        reason: err.to_string(),
    })
}
