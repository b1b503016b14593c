use crate::{Error, Result};
use lazy_regex::regex_is_match;
use std::collections::HashMap;
use std::path::PathBuf;

// region:        --- Constants

// timeouts
pub const HTTP_REQUEST_TIMEOUT_MS: u64 = 10000;
pub const SOCKET_CON_TIMEOUT_MS: u64 = 100;

// probe cache
pub const PROBE_CACHE_TTL_SECS: u64 = 3600;

// concurrency numbers
pub const SOURCES_CONCURRENCY: usize = 3;
pub const RESOLVE_DNS_CONCURRENCY: usize = 10;
pub const PROBE_CONCURRENCY: usize = 50;

// environment variables
pub const SUBDOMAIN_CENTER_AUTH_ENV: &str = "SUBDOMAIN_CENTER_AUTH";
pub const CERTSPOTTER_TOKEN_ENV: &str = "CERTSPOTTER_TOKEN";

pub const DEFAULT_DNS_PROVIDER: &str = "cloudflare";

// endregion:     --- Constants

// region:        --- DNS providers

/// DoH provider aliases, built once at startup and handed to the resolver.
#[derive(Debug, Clone)]
pub struct DnsProviders {
    aliases: HashMap<&'static str, &'static str>,
}

impl Default for DnsProviders {
    fn default() -> Self {
        let aliases = HashMap::from([
            ("cloudflare", "1.1.1.1/dns-query"),
            ("cf", "1.1.1.1/dns-query"),
            ("google", "dns.google/resolve"),
            ("quad9", "9.9.9.9:5053/dns-query"),
        ]);
        Self { aliases }
    }
}

impl DnsProviders {
    /// Maps an alias, a bare host or a full URL to the resolver endpoint URL.
    pub fn endpoint(&self, value: &str) -> Result<String> {
        let value = value.trim();

        if let Some(host) = self.aliases.get(value.to_lowercase().as_str()) {
            return Ok(format!("https://{}", host));
        }

        if value.starts_with("https://") || value.starts_with("http://") {
            return Ok(value.to_string());
        }

        if value.contains(['.', ':', '/']) {
            return Ok(format!("https://{}", value));
        }

        Err(Error::UnknownDnsProvider(value.to_string()))
    }
}

// endregion:     --- DNS providers

// region:        --- Config

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub domain: String,
    pub resolve_ip: bool,
    pub probe_ports: bool,
    pub dns_endpoint: String,
    pub raw: bool,
    pub json: bool,
    pub no_color: bool,
    pub logs: Option<PathBuf>,
    pub subdomain_center_token: Option<String>,
    pub certspotter_token: Option<String>,
}

impl Config {
    /// Resolution is needed both for `--ip` and for port probing.
    pub fn needs_resolution(&self) -> bool {
        self.resolve_ip || self.probe_ports
    }
}

/// Normalizes and validates the domain given on the command line.
pub fn parse_domain(value: &str) -> Result<String> {
    let domain = value.trim().trim_end_matches('.').to_lowercase();

    if regex_is_match!(
        r"^([\p{L}\p{N}_]([\p{L}\p{N}_-]*[\p{L}\p{N}_])?\.)+[\p{L}\p{N}-]{2,}$",
        &domain
    ) {
        Ok(domain)
    } else {
        Err(Error::InvalidDomain(value.to_string()))
    }
}

/// Empty tokens are treated as absent.
pub fn non_empty(token: Option<&String>) -> Option<String> {
    token
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

// endregion:     --- Config
