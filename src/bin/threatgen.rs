//! threatgen - synthetic security telemetry CLI
//!
//! Usage:
//!   threatgen list
//!   threatgen templates windows-security
//!   threatgen generate suricata et-scan-nmap --set src_ip=10.0.0.5 --count 3
//!   threatgen send aws-guardduty ssh-brute-force --dest hec.json --count 500
//!   threatgen test --dest syslog.json
//!
//! Logs go to stderr (`RUST_LOG` overrides `--verbose`); events go to stdout.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use threatgen::{DestinationConfig, Fields, GeneratedEvent, Registry, sender};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "threatgen")]
#[command(about = "Synthetic security telemetry generator and forwarder")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List event types
    List,

    /// List builtin templates of one event type
    Templates {
        event_type: String,
    },

    /// Generate events and print them to stdout
    Generate {
        event_type: String,
        /// Template id or event id
        template: String,

        #[command(flatten)]
        overrides: OverrideArgs,

        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Print only the raw wire payload
        #[arg(long)]
        raw: bool,
    },

    /// Generate events and deliver them to a destination
    Send {
        event_type: String,
        template: String,

        /// Destination config (JSON)
        #[arg(short, long)]
        dest: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,

        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Check connectivity to a destination without sending events
    Test {
        #[arg(short, long)]
        dest: PathBuf,
    },
}

#[derive(clap::Args)]
struct OverrideArgs {
    /// Field override `key=value`; value parsed as JSON, else taken as a string
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// JSON object file of field overrides, applied before `--set`
    #[arg(long = "overrides", value_name = "FILE")]
    file: Option<PathBuf>,
}

impl OverrideArgs {
    fn collect(&self) -> Result<Fields, Box<dyn std::error::Error>> {
        let mut fields = match &self.file {
            Some(path) => read_overrides(path)?,
            None => Fields::new(),
        };
        for pair in &self.set {
            let (key, value) = parse_assignment(pair)?;
            fields.insert(key, value);
        }
        Ok(fields)
    }
}

fn read_overrides(path: &Path) -> Result<Fields, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("{}: overrides must be a JSON object", path.display()).into()),
    }
}

fn parse_assignment(pair: &str) -> Result<(String, Value), String> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{pair}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{pair}`"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "threatgen=debug" } else { "threatgen=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = Registry::builtin();
    info!(event_types = registry.len(), "Generators registered");

    let result = match cli.command {
        Commands::List => run_list(&registry),
        Commands::Templates { event_type } => run_templates(&registry, &event_type),
        Commands::Generate {
            event_type,
            template,
            overrides,
            count,
            raw,
        } => run_generate(&registry, &event_type, &template, &overrides, count, raw),
        Commands::Send {
            event_type,
            template,
            dest,
            overrides,
            count,
        } => run_send(&registry, &event_type, &template, &dest, &overrides, count),
        Commands::Test { dest } => run_test(&dest),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_list(registry: &Registry) -> CliResult {
    for ty in registry.types() {
        println!("{:<18} {:<26} {}", ty.id, ty.category, ty.description);
    }
    Ok(())
}

fn run_templates(registry: &Registry, event_type: &str) -> CliResult {
    let generator = registry.get(event_type)?;
    for template in generator.list_templates() {
        println!(
            "{:<28} {:<40} {:<5} {}",
            template.id, template.event_id, template.format, template.name
        );
    }
    Ok(())
}

fn generate_batch(
    registry: &Registry,
    event_type: &str,
    template: &str,
    overrides: &OverrideArgs,
    count: usize,
) -> Result<Vec<GeneratedEvent>, Box<dyn std::error::Error>> {
    let fields = overrides.collect()?;
    (0..count)
        .map(|_| registry.generate(event_type, template, &fields).map_err(Into::into))
        .collect()
}

fn run_generate(
    registry: &Registry,
    event_type: &str,
    template: &str,
    overrides: &OverrideArgs,
    count: usize,
    raw: bool,
) -> CliResult {
    for event in generate_batch(registry, event_type, template, overrides, count)? {
        if raw {
            println!("{}", event.raw_event());
        } else {
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }
    Ok(())
}

fn run_send(
    registry: &Registry,
    event_type: &str,
    template: &str,
    dest: &Path,
    overrides: &OverrideArgs,
    count: usize,
) -> CliResult {
    let config = DestinationConfig::from_path(dest)?;
    let events = generate_batch(registry, event_type, template, overrides, count)?;
    let out = sender::connect(&config)?;

    let mut sent = 0usize;
    let outcome = events.iter().try_for_each(|event| {
        out.send(event)?;
        sent += 1;
        Ok::<_, threatgen::DeliveryError>(())
    });
    // Close even after a failed send so buffered events are not lost.
    let closed = out.close();
    outcome?;
    closed?;

    info!(destination = %out.name(), event_type, template, sent, "Delivery complete");
    Ok(())
}

fn run_test(dest: &Path) -> CliResult {
    let config = DestinationConfig::from_path(dest)?;
    let out = sender::connect(&config)?;
    let checked = out.test();
    out.close()?;
    checked?;
    println!("{}: ok", out.name());
    Ok(())
}
