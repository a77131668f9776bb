//! DAIV daemon: entry point for running a DAIV node.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use daiv_node::{NodeConfig, ProtocolContext, ShutdownController};
use daiv_rpc::RpcServer;
use daiv_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use daiv_types::SystemClock;
use daiv_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "daiv-daemon", about = "DAIV protocol node daemon")]
struct Cli {
    /// Data directory for LMDB storage.
    #[arg(long, env = "DAIV_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address the RPC server binds to.
    #[arg(long, env = "DAIV_RPC_HOST")]
    rpc_host: Option<String>,

    /// RPC server port.
    #[arg(long, env = "DAIV_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Disable the RPC server.
    #[arg(long, env = "DAIV_DISABLE_RPC")]
    disable_rpc: bool,

    /// Disable the Prometheus metrics endpoint.
    #[arg(long, env = "DAIV_DISABLE_METRICS")]
    disable_metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DAIV_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DAIV_LOG_FORMAT")]
    log_format: Option<String>,

    /// Use short governance timelines and a funded `admin` account.
    /// Ignored when a config file is given.
    #[arg(long, env = "DAIV_DEV")]
    dev: bool,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DAIV_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Configuration helpers.
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run,
    /// Check the data directory's integrity and exit.
    Check,
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Default,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = path.to_string_lossy();
                NodeConfig::from_toml_file(&path)
                    .with_context(|| format!("failed to load config file {path}"))?
            }
            None if self.dev => NodeConfig::dev(),
            None => NodeConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(host) = &self.rpc_host {
            config.rpc_host = host.clone();
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if self.disable_rpc {
            config.enable_rpc = false;
        }
        if self.disable_metrics {
            config.enable_metrics = false;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn open_store(config: &NodeConfig) -> anyhow::Result<LmdbEnvironment> {
    if let Err(e) = check_data_dir(&config.data_dir) {
        bail!(e);
    }
    let store = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())?;
    let report = check_integrity(&store)?;
    if !report.is_healthy() {
        bail!("store integrity check failed: {}", report.errors.join("; "));
    }
    tracing::info!(
        path = %config.data_dir.display(),
        tables = report.databases_checked,
        entries = report.total_entries,
        "store opened"
    );
    Ok(store)
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let store = Arc::new(open_store(&config)?);
    let context = Arc::new(ProtocolContext::open(
        &config,
        store,
        Arc::new(SystemClock),
    )?);

    let shutdown = Arc::new(ShutdownController::new());
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await });
    }

    if config.enable_rpc {
        let addr: SocketAddr = format!("{}:{}", config.rpc_host, config.rpc_port)
            .parse()
            .with_context(|| format!("invalid RPC address {}:{}", config.rpc_host, config.rpc_port))?;
        let server = RpcServer::new(Arc::clone(&context), config.enable_metrics);
        server.serve(addr, shutdown.triggered()).await?;
    } else {
        tracing::info!("RPC disabled; waiting for shutdown signal");
        shutdown.triggered().await;
    }

    tracing::info!("DAIV daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    if let Command::Config {
        action: ConfigAction::Default,
    } = cli.command
    {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let format: LogFormat = config
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_logging(format, &config.log_level);

    match cli.command {
        Command::Node {
            action: NodeAction::Run,
        } => {
            let rpc = if config.enable_rpc {
                format!("{}:{}", config.rpc_host, config.rpc_port)
            } else {
                "off".to_string()
            };
            tracing::info!(
                data_dir = %config.data_dir.display(),
                %rpc,
                voting_period = %format_duration(config.params.voting_period_secs),
                timelock_delay = %format_duration(config.params.timelock_delay_secs),
                "starting DAIV node"
            );
            run(config).await
        }
        Command::Node {
            action: NodeAction::Check,
        } => {
            let store = open_store(&config)?;
            let report = check_integrity(&store)?;
            println!(
                "{} tables, {} entries: healthy",
                report.databases_checked, report.total_entries
            );
            Ok(())
        }
        Command::Config { .. } => Ok(()),
    }
}
