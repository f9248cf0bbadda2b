use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dogan::{
    actors::supervisor::Supervisor,
    config::read_config_file,
    util::{get_config_file, get_log_level},
};
use tracing::{error, info, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "dogan")]
#[command(about = "Run a command whenever a graphite metric crosses its threshold", long_about = None)]
struct Args {
    /// Config file (defaults to $DOGAN_CONFIG or /etc/dogan/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t)]
    log_format: LogFormat,

    /// Validate the config file and exit
    #[arg(long)]
    check: bool,
}

fn init(format: LogFormat) {
    let level = get_log_level();
    let filter = filter::Targets::new().with_targets(vec![("dogan", level)]);

    let (compact, json) = match format {
        LogFormat::Compact => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .compact()
                    .with_ansi(false),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_current_span(true),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(compact)
        .with(json)
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.log_format);
    trace!("started with args: {args:?}");

    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(get_config_file()));

    let config = match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %path.display(), "error loading config file: {e:#}");
            return Err(e);
        }
    };

    if args.check {
        info!(
            path = %path.display(),
            actions = config.actions.len(),
            "configuration is valid"
        );
        return Ok(());
    }

    info!(
        graphite = %config.graphite_base,
        actions = config.actions.len(),
        "starting"
    );

    let supervisor = Supervisor::start(&config)?;

    shutdown_signal().await;

    supervisor.shutdown().await;
    info!("exiting");

    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
