//! stackguard - cross-account trust and deployment-order checks.
//!
//! Loads a deployment from a JSON manifest (or builds the reference
//! topology) and reports trust violations, permission-set problems and the
//! order stacks must deploy in.
//!
//! # Usage
//!
//! ```text
//! stackguard --manifest deployment.json check
//! JOB_ROLE=DevOps SSO_REGION=us-east-1 stackguard --reference --format json order
//! ```
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | `0` | No violations and an acyclic graph |
//! | `1` | Violations found, a dependency cycle or a failed ordering |
//! | `2` | The manifest or settings could not be loaded |
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STACKGUARD_LOG_LEVEL` | `warn` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides the log level) |
//! | `JOB_ROLE` | `Engineer` | `DevOps` adds the SSO and pipeline stacks |
//! | `SSO_REGION` | *(default region)* | Region of the SSO permission-set stack |
//! | `SSO_INSTANCE_ARN` | *(unset)* | SSO instance, required for DevOps with `--require-settings` |
//! | `SE_SERVICES_DOMAIN` | *(unset)* | Services domain, required with `--require-settings` |
//! | `STACKGUARD_DEFAULT_REGION` | `us-east-2` | Region stacks deploy to by default |

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use stackguard_accounts::DeploymentSettings;
use stackguard_cli::{reference_topology, Command, Deployment, Manifest, Report};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stackguard",
    version,
    about = "Cross-account trust and deployment-order validator"
)]
struct Cli {
    /// Deployment manifest (JSON).
    #[arg(long, global = true, conflicts_with = "reference")]
    manifest: Option<PathBuf>,

    /// Use the built-in reference topology instead of a manifest.
    #[arg(long, global = true)]
    reference: bool,

    /// Extra secrets known to exist (JSON object of environment name to keys).
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,

    /// Fail unless the deployment settings are complete.
    #[arg(long, global = true)]
    require_settings: bool,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log level filter (ignored when RUST_LOG is set).
    #[arg(long, global = true, env = "STACKGUARD_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Validate trust grants and permission sets.
    Validate,
    /// Compute the deployment order and waves.
    Order,
    /// Validate and order.
    Check,
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Validate => Command::Validate,
            CliCommand::Order => Command::Order,
            CliCommand::Check => Command::Check,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

fn load_deployment(cli: &Cli) -> Result<Deployment> {
    let settings = DeploymentSettings::from_env();
    if cli.require_settings {
        settings
            .validate_for_devops()
            .context("deployment settings are incomplete")?;
    }

    let mut deployment = match (&cli.manifest, cli.reference) {
        (Some(path), false) => Manifest::load(path)
            .with_context(|| format!("failed to load manifest {}", path.display()))?,
        (None, true) => reference_topology(&settings).context("failed to build reference topology")?,
        _ => anyhow::bail!("one of --manifest or --reference is required"),
    };

    if let Some(path) = &cli.secrets {
        let secrets = read_secrets(path)?;
        deployment.add_secrets(
            secrets
                .iter()
                .flat_map(|(account, keys)| keys.iter().map(move |key| (account.as_str(), key.as_str()))),
        );
    }

    Ok(deployment)
}

fn read_secrets(path: &Path) -> Result<std::collections::BTreeMap<String, Vec<String>>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read secrets {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid secrets file {}", path.display()))
}

fn run(cli: Cli) -> Result<u8> {
    init_tracing(&cli.log_level, cli.log_json)?;

    let deployment = load_deployment(&cli)?;
    let report = Report::generate(cli.command.into(), &deployment);

    match cli.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json().context("failed to serialize report")?),
    }

    Ok(report.exit_code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
