mod cache;
mod config;
mod dns;
mod error;
mod model;
mod modules;
mod ports;
mod scan;
mod utils;

pub use error::{Error, Result};

use crate::config::{
    non_empty, parse_domain, Config, DnsProviders, CERTSPOTTER_TOKEN_ENV, DEFAULT_DNS_PROVIDER,
    SUBDOMAIN_CENTER_AUTH_ENV,
};
use crate::model::{render_json, render_raw, render_text, Report};
use crate::scan::Scanner;
use crate::utils::{ensure_dir, log::init_tracing_subscriber};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use time::OffsetDateTime;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match command().try_get_matches() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // help and version are not failures
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if args.get_flag("list-sources") {
        modules::display_all();
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            ExitCode::FAILURE
        }
    }
}

fn command() -> Command {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .arg(
            Arg::new("domain")
                .help("The domain to find subdomains for")
                .value_name("DOMAIN")
                .required_unless_present("list-sources")
                .index(1),
        )
        .arg(
            Arg::new("ip")
                .short('I')
                .long("ip")
                .action(ArgAction::SetTrue)
                .help("Resolve subdomains IP"),
        )
        .arg(
            Arg::new("ports")
                .short('P')
                .long("ports")
                .action(ArgAction::SetTrue)
                .help("Resolve subdomains IP and probe popular ports"),
        )
        .arg(
            Arg::new("dns")
                .short('D')
                .long("dns")
                .value_name("NAME-OR-URL")
                .default_value(DEFAULT_DNS_PROVIDER)
                .help("DoH provider (cloudflare, cf, google, quad9, host or URL)"),
        )
        .arg(
            Arg::new("raw")
                .short('r')
                .long("raw")
                .action(ArgAction::SetTrue)
                .help("Raw output, one subdomain per line"),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .action(ArgAction::SetTrue)
                .conflicts_with("raw")
                .help("Print the result as JSON"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .help("Disable colors in output"),
        )
        .arg(
            Arg::new("logs")
                .short('l')
                .long("logs")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Save logs into a .log file in DIR"),
        )
        .arg(
            Arg::new("subdomain-center-auth")
                .long("subdomain-center-auth")
                .value_name("TOKEN")
                .env(SUBDOMAIN_CENTER_AUTH_ENV)
                .hide_env_values(true)
                .help("subdomain.center auth token (beta API)"),
        )
        .arg(
            Arg::new("certspotter-token")
                .long("certspotter-token")
                .value_name("TOKEN")
                .env(CERTSPOTTER_TOKEN_ENV)
                .hide_env_values(true)
                .help("CertSpotter API token"),
        )
        .arg(
            Arg::new("list-sources")
                .long("list-sources")
                .action(ArgAction::SetTrue)
                .help("List all subdomain sources"),
        )
}

/// Validates arguments, no network activity happens here.
fn config_from_matches(args: &ArgMatches, providers: &DnsProviders) -> Result<Config> {
    let domain = args
        .get_one::<String>("domain")
        .ok_or_else(|| Error::CliUsage("A domain is required".into()))?;
    let dns = args
        .get_one::<String>("dns")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DNS_PROVIDER);
    let probe_ports = args.get_flag("ports");

    Ok(Config {
        domain: parse_domain(domain)?,
        resolve_ip: args.get_flag("ip") || probe_ports,
        probe_ports,
        dns_endpoint: providers.endpoint(dns)?,
        raw: args.get_flag("raw") || !io::stdout().is_terminal(),
        json: args.get_flag("json"),
        no_color: args.get_flag("no-color") || std::env::var_os("NO_COLOR").is_some(),
        logs: args.get_one::<PathBuf>("logs").cloned(),
        subdomain_center_token: non_empty(args.get_one::<String>("subdomain-center-auth")),
        certspotter_token: non_empty(args.get_one::<String>("certspotter-token")),
    })
}

async fn run(args: &ArgMatches) -> Result<()> {
    let config = config_from_matches(args, &DnsProviders::default())?;

    if config.no_color {
        colored::control::set_override(false);
    }

    let timestamp = OffsetDateTime::now_utc().unix_timestamp();
    if let Some(logs_dir) = &config.logs {
        ensure_dir(logs_dir)?;
    }
    init_tracing_subscriber(config.logs.as_deref(), &format!("{}", timestamp));

    info!("Searching subdomains of {} (run_{})", config.domain, timestamp);
    let scanner = Scanner::from_config(&config)?;

    let interactive = !config.raw && !config.json;
    if interactive {
        eprint!("{}", "Searching subdomains…".dimmed());
        io::stderr().flush()?;
    }

    let report = scanner.scan(&config.domain).await;

    if interactive {
        // clear the status line
        eprint!("\r\x1b[2K");
    }

    print_report(&config, &report)
}

fn print_report(config: &Config, report: &Report) -> Result<()> {
    for warning in &report.warnings {
        eprintln!("{}", format!("{}: {}", warning.source, warning.message).yellow());
    }

    if config.json {
        println!("{}", render_json(report)?);
        return Ok(());
    }

    if report.is_empty() {
        eprintln!("{}", "There are no subdomains for this domain".yellow());
        return Ok(());
    }

    let content = if config.raw {
        render_raw(report)?
    } else {
        render_text(report)?
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;

    Ok(())
}
