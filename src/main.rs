//! TrainFlow Telemetry CLI
//!
//! Trackside vibration telemetry core with an HTTP/SSE front.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use trainflow_telemetry::{
    config::Config, server, simulator::SensorSimulator, transport::ChannelCommandSink,
    TelemetryContext, VERSION,
};

#[derive(Parser)]
#[command(name = "trainflow-telemetry")]
#[command(version = VERSION)]
#[command(about = "Trackside train vibration telemetry service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the telemetry service
    Run {
        /// HTTP port (overrides the configured port)
        #[arg(long)]
        port: Option<u16>,

        /// Generate synthetic sensor traffic instead of waiting for a transport
        #[arg(long)]
        simulate: bool,

        /// Seconds between automatic simulated train passes
        #[arg(long, default_value = "30")]
        pass_interval: u64,
    },

    /// Show configuration
    Config {
        /// Write the default configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            port,
            simulate,
            pass_interval,
        } => cmd_run(port, simulate, pass_interval).await,
        Commands::Config { init } => {
            cmd_config(init);
            Ok(())
        }
    }
}

async fn cmd_run(port: Option<u16>, simulate: bool, pass_interval: u64) -> anyhow::Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("could not load config ({e}), using defaults");
            Config::default()
        }
    };
    config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;

    let port = port.unwrap_or(config.server_port);
    let topics = config.topics.clone();
    let sample_rate = config.sample_rate_hz;

    let (sink, command_rx) = ChannelCommandSink::new();
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(1024);

    let context = TelemetryContext::new(config, Arc::new(sink.clone()));
    let ingest_task = context.spawn_ingest(inbound_rx);
    let ticker_task = context.spawn_status_ticker();

    let simulator_task = if simulate {
        // The in-process loop stands in for a live broker connection.
        sink.set_connected(true);
        let sim = SensorSimulator::new(
            inbound_tx,
            topics,
            sample_rate,
            Duration::from_secs(pass_interval),
        );
        tracing::info!("running with simulated sensors");
        Some(tokio::spawn(sim.run(command_rx)))
    } else {
        tracing::info!("running without a transport; feed messages via the inbound channel");
        None
    };

    let (addr, shutdown_tx) = server::run(context, port).await?;
    tracing::info!("TrainFlow Telemetry v{VERSION} ready on http://{addr}");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    let _ = shutdown_tx.send(());
    ingest_task.abort();
    ticker_task.abort();
    if let Some(task) = simulator_task {
        task.abort();
    }

    Ok(())
}

fn cmd_config(init: bool) {
    if init {
        let config = Config::default();
        if let Err(e) = config.save() {
            eprintln!("Error saving config: {e}");
            std::process::exit(1);
        }
        println!("Wrote defaults to {:?}", Config::config_path());
        return;
    }

    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
