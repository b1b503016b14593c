pub mod subdomains;

use self::subdomains::certspotter::CertSpotter;
use self::subdomains::ctlogsearch::CtLogSearch;
use self::subdomains::subdomain_center::SubdomainCenter;
use self::subdomains::SubdomainModule;
use crate::config::Config;
use crate::{Error, Result};
use reqwest::{RequestBuilder, Response};
use tracing::{debug, instrument, trace};

pub trait Module {
    fn name(&self) -> String;
    fn description(&self) -> String;
}

/// Sources in the order they are queried.
pub fn subdomains_modules(config: &Config) -> Vec<Box<dyn SubdomainModule>> {
    vec![
        Box::new(SubdomainCenter::new(config.subdomain_center_token.clone())),
        Box::new(CertSpotter::new(config.certspotter_token.clone())),
        Box::new(CtLogSearch::new()),
    ]
}

pub fn display_all() {
    let subdomains_modules = subdomains_modules(&Config::default());
    println!("\nSubdomains modules");
    for module in subdomains_modules {
        println!("- {:30}{}", module.name(), module.description());
    }
}

// region:        --- HTTP requests

#[instrument(name = "HTTP_request", level = "debug", skip_all, fields(provider = provider))]
pub async fn http_request(provider: &str, request: RequestBuilder) -> Result<Response> {
    match request.send().await {
        Ok(res) => {
            debug!("{} receive with status: {}", res.url(), res.status());
            trace!("Response: {:?}", res);
            Ok(res)
        }
        Err(err) => {
            debug!("Reason: {}", err);
            Err(Error::Transport {
                provider: provider.to_string(),
                reason: err,
            })
        }
    }
}

// endregion:     --- HTTP requests
