mod analyze_commands;
mod doctor_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "saju", about = "saju: AI fashion-fortune gateway", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config and PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Explicit config file (skips discovery in ./ and ~/.config/saju/).
    #[arg(long, global = true, env = "SAJU_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Run one reading from the command line and print the HTML.
    Analyze(analyze_commands::AnalyzeArgs),
    /// List model candidates in fallback order.
    Models,
    /// Config validation and credential audit.
    Doctor {
        /// Also call the backend with every key to check model access.
        #[arg(long, default_value_t = false)]
        probe: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "saju starting");

    let mut config = saju_config::discover_and_load(cli.config.as_deref());
    // CLI args override config and env values
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => saju_gateway::start_gateway(&config).await,
        Some(Commands::Analyze(args)) => analyze_commands::handle_analyze(&config, args).await,
        Some(Commands::Models) => {
            for (rank, model) in saju_agents::ModelCandidates::default().iter().enumerate() {
                println!("{:>2}. {model}", rank + 1);
            }
            Ok(())
        },
        Some(Commands::Doctor { probe }) => {
            doctor_commands::handle_doctor(cli.config.as_deref(), &config, probe).await
        },
    }
}
