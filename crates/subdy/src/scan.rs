use crate::config::{Config, HTTP_REQUEST_TIMEOUT_MS, RESOLVE_DNS_CONCURRENCY, SOURCES_CONCURRENCY};
use crate::dns::Resolver;
use crate::model::{Report, SourceWarning, SubdomainResult};
use crate::modules::{self, subdomains::SubdomainModule};
use crate::ports::{new_probe_cache, Prober};
use crate::utils::natural_cmp;
use crate::Result;
use futures::{stream, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct Scanner {
    http_client: Client,
    sources: Vec<Box<dyn SubdomainModule>>,
    resolver: Option<Resolver>,
    prober: Option<Prober>,
}

// region:        --- Constructors

impl Scanner {
    pub fn new(http_client: Client, sources: Vec<Box<dyn SubdomainModule>>) -> Self {
        Self {
            http_client,
            sources,
            resolver: None,
            prober: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Probing only happens for resolved subdomains, a resolver is required too.
    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http_timeout = Duration::from_millis(HTTP_REQUEST_TIMEOUT_MS);
        let http_client = Client::builder()
            .timeout(http_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        debug!("HTTP Client created: {:?}", http_client);

        let mut scanner = Scanner::new(http_client.clone(), modules::subdomains_modules(config));

        if config.needs_resolution() {
            let resolver = Resolver::new(http_client, &config.dns_endpoint);
            debug!("DoH endpoint: {}", resolver.endpoint());
            scanner = scanner.with_resolver(resolver);
        }

        if config.probe_ports {
            scanner = scanner.with_prober(Prober::new(new_probe_cache()));
        }

        Ok(scanner)
    }
}

// endregion:     --- Constructors

// region:        --- Scan main function

impl Scanner {
    /// Never fails: broken sources end up as warnings and unresolvable
    /// names are left out of the report.
    #[instrument(name = "scan", level = "info", skip_all, fields(domain = domain))]
    pub async fn scan(&self, domain: &str) -> Report {
        trace!("Start scan on {}", domain);

        let (names, warnings) = self.scan_subdomains(domain).await;
        let mut subdomains = self.resolve_subdomains(names).await;
        self.probe_subdomains(&mut subdomains).await;

        Report {
            domain: domain.to_string(),
            subdomains,
            warnings,
        }
    }
}

// endregion:     --- Scan main function

// region:        --- Scan subfunctions

impl Scanner {
    #[instrument(name = "subdomains", level = "info", skip_all)]
    async fn scan_subdomains(&self, domain: &str) -> (Vec<String>, Vec<SourceWarning>) {
        let outcomes: Vec<(String, Result<Vec<String>>)> = stream::iter(self.sources.iter())
            .map(|module| async move {
                let outcome = module.enumerate(&self.http_client, domain).await;
                (module.name(), outcome)
            })
            .buffered(SOURCES_CONCURRENCY)
            .collect()
            .await;

        let mut found = Vec::new();
        let mut warnings = Vec::new();

        for (source, outcome) in outcomes {
            match outcome {
                Ok(names) => {
                    debug!("{}: {} names", source, names.len());
                    found.push(names);
                }
                Err(err) => {
                    warn!("{}: {}", source, err);
                    warnings.push(SourceWarning {
                        source,
                        message: err.to_string(),
                    });
                }
            }
        }

        let names = merge_subdomains(found);
        info!("{} unique subdomains", names.len());

        (names, warnings)
    }

    #[instrument(name = "resolves", level = "info", skip_all)]
    async fn resolve_subdomains(&self, names: Vec<String>) -> Vec<SubdomainResult> {
        let Some(resolver) = &self.resolver else {
            return names.into_iter().map(SubdomainResult::new).collect();
        };

        let subdomains: Vec<SubdomainResult> = stream::iter(names)
            .map(|name| async move {
                match resolver.resolve(&name).await {
                    Ok(answer) => Some(SubdomainResult {
                        name,
                        answer: Some(answer),
                        open_ports: None,
                    }),
                    // dropped on purpose, per-name failures are not reported
                    Err(err) => {
                        debug!("Dropping {}: {}", name, err);
                        None
                    }
                }
            })
            .buffered(RESOLVE_DNS_CONCURRENCY)
            .filter_map(|subdomain| async move { subdomain })
            .collect()
            .await;

        info!("{} domains resolved", subdomains.len());
        subdomains
    }

    #[instrument(name = "ports", level = "info", skip_all)]
    async fn probe_subdomains(&self, subdomains: &mut [SubdomainResult]) {
        let (Some(prober), Some(_)) = (&self.prober, &self.resolver) else {
            return;
        };

        for subdomain in subdomains.iter_mut() {
            let ips = subdomain.ips();
            subdomain.open_ports = Some(prober.probe(&ips).await);
        }
    }
}

/// Lower-cases, sorts in natural order and removes duplicates.
pub fn merge_subdomains(lists: Vec<Vec<String>>) -> Vec<String> {
    let mut names: Vec<String> = lists
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    names.sort_by(|a, b| natural_cmp(a, b));
    names.dedup();
    names
}

// endregion:     --- Scan subfunctions

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::subdomains::certspotter::CertSpotter;
    use crate::modules::subdomains::ctlogsearch::CtLogSearch;
    use crate::modules::subdomains::subdomain_center::SubdomainCenter;
    use crate::modules::Module;
    use crate::Error;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // region:        --- Fixtures

    struct StaticSource {
        name: &'static str,
        names: Option<Vec<&'static str>>,
    }

    impl StaticSource {
        fn ok(name: &'static str, names: Vec<&'static str>) -> Box<dyn SubdomainModule> {
            Box::new(Self {
                name,
                names: Some(names),
            })
        }

        fn failing(name: &'static str) -> Box<dyn SubdomainModule> {
            Box::new(Self { name, names: None })
        }
    }

    impl Module for StaticSource {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn description(&self) -> String {
            "Static list of subdomains".to_string()
        }
    }

    #[async_trait]
    impl SubdomainModule for StaticSource {
        async fn enumerate(&self, _http_client: &Client, _domain: &str) -> Result<Vec<String>> {
            match &self.names {
                Some(names) => Ok(names.iter().map(|name| name.to_string()).collect()),
                None => Err(Error::HttpStatus {
                    provider: self.name(),
                    status: 502,
                }),
            }
        }
    }

    fn names(report: &Report) -> Vec<&str> {
        report
            .subdomains
            .iter()
            .map(|subdomain| subdomain.name.as_str())
            .collect()
    }

    async fn mock_resolver(server: &MockServer, name: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/dns-query"))
            .and(query_param("name", name))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    // endregion:     --- Fixtures

    #[test]
    fn merge_collapses_mixed_case_duplicates() {
        let merged = merge_subdomains(vec![
            vec!["A.example.com".to_string(), "b.example.com".to_string()],
            vec!["a.example.com".to_string(), "B.EXAMPLE.COM".to_string()],
        ]);

        assert_eq!(merged, vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn merge_sorts_naturally() {
        let merged = merge_subdomains(vec![vec![
            "b2.x.com".to_string(),
            "b10.x.com".to_string(),
            "b1.x.com".to_string(),
        ]]);

        assert_eq!(merged, vec!["b1.x.com", "b2.x.com", "b10.x.com"]);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        assert!(merge_subdomains(Vec::new()).is_empty());
        assert!(merge_subdomains(vec![Vec::new(), vec![" ".to_string()]]).is_empty());
    }

    #[tokio::test]
    async fn failing_source_does_not_abort_scan() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/issuances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"dns_names": ["www.example.com", "api.example.com"]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search/domain/valid/example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"issuedname": "mail.example.com"}, {"issuedname": "WWW.example.com"}]
            })))
            .mount(&server)
            .await;

        // transport error, nothing listens on the discard port
        let sources: Vec<Box<dyn SubdomainModule>> = vec![
            Box::new(SubdomainCenter::new(None).with_endpoint("http://127.0.0.1:9")),
            Box::new(CertSpotter::new(None).with_endpoint(server.uri())),
            Box::new(CtLogSearch::new().with_endpoint(server.uri())),
        ];

        let report = Scanner::new(Client::new(), sources).scan("example.com").await;

        assert_eq!(
            names(&report),
            vec!["api.example.com", "mail.example.com", "www.example.com"]
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].source, "subdomains/subdomain_center");
        assert!(report.subdomains.iter().all(|s| s.answer.is_none()));
    }

    #[tokio::test]
    async fn all_sources_failing_yields_empty_report() {
        let sources = vec![
            StaticSource::failing("one"),
            StaticSource::failing("two"),
            StaticSource::failing("three"),
        ];

        let report = Scanner::new(Client::new(), sources).scan("example.com").await;

        assert!(report.is_empty());
        let failed: Vec<&str> = report.warnings.iter().map(|w| w.source.as_str()).collect();
        assert_eq!(failed, vec!["one", "two", "three"]);
        assert_eq!(report.warnings[1].message, "two returned non-ok status code 502");
    }

    #[tokio::test]
    async fn results_follow_natural_order_not_source_order() {
        let sources = vec![
            StaticSource::ok("one", vec!["node10.example.com"]),
            StaticSource::ok("two", vec!["Node2.example.com", "node1.example.com"]),
            StaticSource::ok("three", vec!["node10.example.com"]),
        ];

        let report = Scanner::new(Client::new(), sources).scan("example.com").await;

        assert_eq!(
            names(&report),
            vec!["node1.example.com", "node2.example.com", "node10.example.com"]
        );
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_names_are_dropped_when_resolving() {
        let server = MockServer::start().await;
        mock_resolver(
            &server,
            "a.example.com",
            json!({"Status": 0, "Answer": [{"data": "10.0.0.1", "type": 1}]}),
        )
        .await;
        mock_resolver(&server, "c.example.com", json!({"Status": 3})).await;
        Mock::given(method("GET"))
            .and(path("/dns-query"))
            .and(query_param("name", "b.example.com"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sources = vec![StaticSource::ok(
            "static",
            vec!["c.example.com", "b.example.com", "a.example.com"],
        )];
        let resolver = Resolver::new(Client::new(), format!("{}/dns-query", server.uri()));

        let report = Scanner::new(Client::new(), sources)
            .with_resolver(resolver)
            .scan("example.com")
            .await;

        // b failed to resolve, c resolved to an empty answer
        assert_eq!(names(&report), vec!["a.example.com", "c.example.com"]);
        assert_eq!(report.subdomains[0].ips(), vec!["10.0.0.1"]);
        assert!(report.subdomains[1].answer.as_ref().unwrap().is_empty());
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn probing_attaches_open_ports() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = MockServer::start().await;
        mock_resolver(
            &server,
            "db.example.com",
            json!({"Status": 0, "Answer": [{"data": "127.0.0.1", "type": 1}]}),
        )
        .await;
        mock_resolver(
            &server,
            "old.example.com",
            json!({"Status": 0, "Answer": [{"data": "gone.example.net", "type": 5}]}),
        )
        .await;

        let sources = vec![StaticSource::ok(
            "static",
            vec!["old.example.com", "db.example.com"],
        )];
        let resolver = Resolver::new(Client::new(), format!("{}/dns-query", server.uri()));
        let prober = Prober::new(new_probe_cache())
            .with_ports(vec![port])
            .with_timeout(Duration::from_millis(500));

        let report = Scanner::new(Client::new(), sources)
            .with_resolver(resolver)
            .with_prober(prober)
            .scan("example.com")
            .await;

        assert_eq!(names(&report), vec!["db.example.com", "old.example.com"]);
        assert_eq!(report.subdomains[0].open_ports, Some(vec![port.to_string()]));
        assert_eq!(report.subdomains[1].open_ports, Some(Vec::new()));
    }

    #[tokio::test]
    async fn prober_without_resolver_is_ignored() {
        let sources = vec![StaticSource::ok("static", vec!["www.example.com"])];

        let report = Scanner::new(Client::new(), sources)
            .with_prober(Prober::new(new_probe_cache()))
            .scan("example.com")
            .await;

        assert_eq!(report.subdomains, vec![SubdomainResult::new("www.example.com")]);
    }

    #[test]
    fn config_builds_enrichment_stages() {
        let config = Config {
            probe_ports: true,
            dns_endpoint: "https://1.1.1.1/dns-query".to_string(),
            ..Default::default()
        };

        let scanner = Scanner::from_config(&config).unwrap();

        assert_eq!(scanner.sources.len(), 3);
        assert_eq!(
            scanner.resolver.as_ref().map(Resolver::endpoint),
            Some("https://1.1.1.1/dns-query")
        );
        assert!(scanner.prober.is_some());

        let scanner = Scanner::from_config(&Config::default()).unwrap();
        assert!(scanner.resolver.is_none());
        assert!(scanner.prober.is_none());
    }
}
