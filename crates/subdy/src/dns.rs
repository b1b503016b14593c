use crate::modules::http_request;
use crate::{Error, Result};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const PROVIDER: &str = "DoH resolver";

const RECORD_TYPE_A: u16 = 1;
const RECORD_TYPE_CNAME: u16 = 5;

// region:        --- Models

/// DNS-JSON answer returned by a DoH provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "Status")]
    pub status: u32,
    #[serde(rename = "Answer", default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub data: String,
    #[serde(rename = "type")]
    pub record_type: u16,
}

#[derive(Debug, Deserialize)]
struct ResolveError {
    error: String,
}

// endregion:     --- Models

// region:        --- Answer views

impl Answer {
    /// Formats the answer, `simple` keeps only the addresses while the chained
    /// variant also shows CNAME targets.
    pub fn to_display(&self, simple: bool) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut result = String::new();

        for record in &self.records {
            if record.record_type == RECORD_TYPE_CNAME {
                if !simple {
                    result.push_str(&record.data);
                    result.push_str(" → ");
                }
            } else if simple {
                result.push_str(&record.data);
                result.push(' ');
            } else {
                result.push_str(&record.data);
                result.push_str(" / ");
            }
        }

        result.trim_end_matches(['/', '→', ' ']).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.status != 0 || self.records.is_empty()
    }

    /// Data of the A records only.
    pub fn ips(&self) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }

        self.records
            .iter()
            .filter(|record| record.record_type == RECORD_TYPE_A)
            .map(|record| record.data.clone())
            .collect()
    }
}

// endregion:     --- Answer views

// region:        --- Resolver

#[derive(Debug, Clone)]
pub struct Resolver {
    http_client: Client,
    endpoint: String,
}

impl Resolver {
    pub fn new(http_client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(name = "resolve", level = "debug", skip(self))]
    pub async fn resolve(&self, name: &str) -> Result<Answer> {
        let request = self
            .http_client
            .get(&self.endpoint)
            .header(ACCEPT, "application/dns-json")
            .query(&[("name", name)]);
        let res = http_request(PROVIDER, request).await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return match serde_json::from_str::<ResolveError>(&body) {
                Ok(err) => Err(Error::Resolver(err.error)),
                Err(_) => Err(Error::HttpStatus {
                    provider: PROVIDER.to_string(),
                    status: status.as_u16(),
                }),
            };
        }

        let body = res.text().await.map_err(|reason| Error::Transport {
            provider: PROVIDER.to_string(),
            reason,
        })?;
        let answer: Answer = serde_json::from_str(&body).map_err(|err| Error::Decode {
            provider: PROVIDER.to_string(),
            reason: err.to_string(),
        })?;

        debug!("{} records", answer.records.len());
        Ok(answer)
    }
}

// endregion:     --- Resolver
