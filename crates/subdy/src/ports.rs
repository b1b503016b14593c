use crate::cache::TtlCache;
use crate::config::{PROBE_CACHE_TTL_SECS, PROBE_CONCURRENCY, SOCKET_CON_TIMEOUT_MS};
use futures::{stream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, instrument, trace};

pub const MOST_POPULAR_PORTS: &[u16] = &[
    21,    // ftp
    22,    // ssh
    23,    // telnet
    25,    // smtp
    53,    // dns
    80,    // http
    110,   // pop3
    115,   // sftp
    143,   // imap
    220,   // imap3
    389,   // ldap
    443,   // https
    445,   // smb
    636,   // ldaps
    990,   // ftps
    993,   // imaps
    995,   // pop3s
    1434,  // mssql
    3000,  // unicorn
    3306,  // mysql or mariadb
    3389,  // rdp
    3690,  // subversion
    5432,  // postgres
    5800,  // vnc
    6379,  // redis or valkey
    6432,  // pgbouncer
    8080,  // http
    8443,  // https
    9000,  // gunicorn
    9042,  // cassandra
    9464,  // prometheus
    13000, // grafana
    27017, // mongo
];

pub type ProbeCache = Arc<TtlCache<bool>>;

pub fn new_probe_cache() -> ProbeCache {
    Arc::new(TtlCache::new(Duration::from_secs(PROBE_CACHE_TTL_SECS)))
}

#[derive(Debug, Clone)]
pub struct Prober {
    ports: Vec<u16>,
    timeout: Duration,
    cache: ProbeCache,
}

impl Prober {
    pub fn new(cache: ProbeCache) -> Self {
        Self {
            ports: MOST_POPULAR_PORTS.to_vec(),
            timeout: Duration::from_millis(SOCKET_CON_TIMEOUT_MS),
            cache,
        }
    }

    #[cfg(test)]
    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the ports reachable on at least one of the IPs, in catalog order.
    #[instrument(name = "probe", level = "debug", skip_all)]
    pub async fn probe(&self, ips: &[String]) -> Vec<String> {
        if ips.is_empty() {
            return Vec::new();
        }

        let targets: Vec<(&str, u16)> = ips
            .iter()
            .flat_map(|ip| self.ports.iter().map(move |port| (ip.as_str(), *port)))
            .collect();

        let found_ports: HashSet<u16> = stream::iter(targets)
            .map(|(ip, port)| async move {
                let is_open = self.is_open(ip, port).await;
                (port, is_open)
            })
            .buffer_unordered(PROBE_CONCURRENCY)
            .filter_map(|(port, is_open)| async move { is_open.then_some(port) })
            .collect()
            .await;

        debug!(
            "{} open ports on {:?} ({} cached probes)",
            found_ports.len(),
            ips,
            self.cache.len()
        );

        self.ports
            .iter()
            .filter(|port| found_ports.contains(*port))
            .map(|port| port.to_string())
            .collect()
    }

    async fn is_open(&self, ip: &str, port: u16) -> bool {
        let key = format!("{}:{}", ip, port);

        if let Some(is_open) = self.cache.get(&key) {
            trace!("Cache hit: {} = {}", key, is_open);
            return is_open;
        }

        let is_open = matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(socket_address(ip, port))).await,
            Ok(Ok(_))
        );

        trace!("Probed: {} = {}", key, is_open);
        self.cache.insert(key, is_open);
        is_open
    }
}

fn socket_address(ip: &str, port: u16) -> String {
    if ip.contains(':') && !ip.starts_with('[') {
        format!("[{}]:{}", ip, port)
    } else {
        format!("{}:{}", ip, port)
    }
}
