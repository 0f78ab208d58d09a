use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudprobe::config::{ClientConfig, Config};
use cloudprobe::{AwsClient, ProbeContext, ProbeResult, ProberRegistry};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Probe AWS resources for existence, ARN, tags and properties
#[derive(Parser, Debug)]
#[command(name = "cloudprobe", version, about, long_about = None)]
struct Args {
    /// AWS region to use
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Custom endpoint URL (LocalStack, a mock server)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Named profile from ~/.aws/config or ~/.aws/credentials
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Use LocalStack at localhost:4566 with test credentials
    #[arg(long, global = true)]
    localstack: bool,

    /// Give up on a probe after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Remember --region, --endpoint and --profile for later runs
    #[arg(long, global = true)]
    save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether resources exist
    Probe {
        /// Resource type (aws_s3_bucket, AWS::S3::Bucket, s3_bucket, ...).
        /// Types without a dedicated prober go through Cloud Control
        #[arg(short = 't', long = "type")]
        resource_type: String,

        /// Resource identifiers (bucket names, table names)
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List the resource types with a dedicated prober
    Types,
    /// Print the canonical key for a resource type name
    Normalize { type_name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG directives refine the chosen level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(tracing_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudprobe started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudprobe").join("cloudprobe.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudprobe").join("cloudprobe.log");
    }
    PathBuf::from("cloudprobe.log")
}

/// One line of probe output
#[derive(Serialize)]
struct ProbeOutput<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    resource_type: &'a str,
    #[serde(flatten)]
    result: Option<&'a ProbeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

async fn client_config(args: &Args, config: &mut Config) -> Result<ClientConfig> {
    if args.save {
        if args.region.is_some() {
            config.region = args.region.clone();
        }
        if args.endpoint.is_some() {
            config.endpoint = args.endpoint.clone();
        }
        if args.profile.is_some() {
            config.profile = args.profile.clone();
        }
        config.save().context("Failed to save configuration")?;
    }

    if args.localstack {
        let mut client_config = ClientConfig::localstack();
        if let Some(region) = &args.region {
            client_config.region = region.clone();
        }
        return Ok(client_config);
    }

    Ok(config
        .resolve(
            args.region.as_deref(),
            args.endpoint.as_deref(),
            args.profile.as_deref(),
        )
        .await)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = setup_logging(args.log_level)?;

    if let Command::Normalize { type_name } = &args.command {
        println!("{}", cloudprobe::normalize_type_name(type_name));
        return Ok(());
    }

    let mut config = Config::load();
    let client_config = client_config(&args, &mut config).await?;
    tracing::info!(
        "Region: {}, endpoint: {}",
        client_config.region,
        client_config.endpoint.as_deref().unwrap_or("default")
    );

    let client = AwsClient::new(client_config).context("Failed to create AWS client")?;
    let registry = ProberRegistry::new(client);

    match &args.command {
        Command::Types => emit(args.output, &registry.supported_types()),
        Command::Probe { resource_type, ids } => {
            let token = CancellationToken::new();
            let ctrl_c = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling probes");
                    ctrl_c.cancel();
                }
            });

            let mut ctx = ProbeContext::new().with_cancellation(token);
            if let Some(secs) = args.timeout {
                ctx = ctx.with_timeout(Duration::from_secs(secs));
            }

            let results = registry
                .probe_many(&ctx, resource_type, ids)
                .await
                .with_context(|| format!("Cannot probe type {:?}", resource_type))?;

            let mut failures = 0;
            let outputs: Vec<ProbeOutput<'_>> = ids
                .iter()
                .zip(results.iter())
                .map(|(id, result)| match result {
                    Ok(result) => ProbeOutput {
                        id,
                        resource_type,
                        result: Some(result),
                        error: None,
                    },
                    Err(e) => {
                        failures += 1;
                        ProbeOutput {
                            id,
                            resource_type,
                            result: None,
                            error: Some(e.to_string()),
                        }
                    },
                })
                .collect();

            match outputs.as_slice() {
                [single] => emit(args.output, single)?,
                many => emit(args.output, many)?,
            }

            if failures > 0 {
                anyhow::bail!("{} of {} probes failed", failures, ids.len());
            }
            Ok(())
        },
        Command::Normalize { .. } => Ok(()),
    }
}
