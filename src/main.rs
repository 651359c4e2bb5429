mod client;
mod config;
mod node;
mod report;

use crate::client::{FetchError, NodesClient};
use crate::config::{Config, ConfigError};
use crate::report::ReportSet;
use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use regex::Regex;
use std::io::IsTerminal;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ELASTIC_HEALTH_LOG";

#[derive(Parser)]
#[command(
    name = "elastic-health",
    version,
    about = "Node inventory and health snapshot for an Elasticsearch cluster"
)]
struct Cli {
    #[arg(short, long, help = "Enable debugging information")]
    debug: bool,

    #[arg(
        short = 'k',
        long,
        help = "Allow insecure connections (query over plain http)"
    )]
    insecure: bool,

    #[arg(
        short,
        long,
        value_name = "PATTERN",
        value_parser = parse_pattern,
        help = "Only report nodes whose name matches PATTERN (regex search)"
    )]
    node: Option<Regex>,

    #[arg(short, long, help = "Set port for server [default: 9200]")]
    port: Option<u16>,

    #[arg(
        short,
        long = "server",
        value_name = "SERVER",
        help = "Specify the server name or ip address"
    )]
    server: Option<String>,

    #[arg(short, long, help = "Show additional columns")]
    verbose: bool,

    #[arg(
        long,
        short = 'o',
        value_enum,
        default_value_t = OutputFormat::Pretty,
        help = "Output format"
    )]
    output: OutputFormat,

    #[arg(value_name = "SERVER", help = "Server name or ip address (when -s is not given)")]
    server_arg: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            server: self.server.clone().or_else(|| self.server_arg.clone()),
            port: self.port,
            insecure: self.insecure.then_some(true),
            verify_tls: None,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
}

fn parse_pattern(raw: &str) -> Result<Regex, regex::Error> {
    Regex::new(raw)
}

fn init_logging(debug: bool) {
    let default = if debug {
        "elastic_health=debug"
    } else {
        "elastic_health=error"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(false)
        .without_time()
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    let cwd = std::env::current_dir().context("reading current directory")?;

    let target = match config::resolve(&cwd, cli.overrides()) {
        Ok(target) => target,
        Err(err) if matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::MissingServer)) => {
            Cli::command()
                .error(ErrorKind::MissingRequiredArgument, err.to_string())
                .exit();
        }
        Err(err) => return Err(err),
    };
    debug!(server = %target.server, port = target.port, scheme = %target.scheme, "resolved target");

    let client = NodesClient::new(target.verify_tls)?;
    let url = target.nodes_url()?;

    let report = match client.fetch(&url) {
        Ok(body) => report::collect_response(&body, cli.node.as_ref(), target.domain_suffix())?,
        Err(err) => {
            report_fetch_failure(&err);
            ReportSet::default()
        }
    };

    match cli.output {
        OutputFormat::Pretty => println!("{}", report::render_table(report, cli.verbose)),
        OutputFormat::Json => println!("{}", report::render_json(report)?),
    }

    Ok(())
}

fn report_fetch_failure(err: &FetchError) {
    warn!(error = ?err, "nodes query failed");
    if err.is_insecure() {
        println!("SSL Error: {err} (use -k/--insecure to connect without TLS)");
    } else {
        println!("Connection Error: {err}");
    }
}
