use anyhow::{Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig, RestfulModule};
use clap::{Parser, Subcommand};
use grouper::{config::GrouperConfig, Grouper};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::path::{Path, PathBuf};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Grouper Server - users, groups and their memberships over HTTP
#[derive(Parser)]
#[command(name = "grouper-server")]
#[command(about = "Grouper Server - users, groups and their memberships over HTTP")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

/// Everything the process hosts, initialized from the module config bag.
struct Modules {
    ingress: ApiIngress,
    grouper: Grouper,
}

impl Modules {
    async fn init(config: &AppConfig) -> Result<Self> {
        tracing::info!("Initializing modules...");

        let ingress_cfg: ApiIngressConfig = config.module_config("api_ingress")?;
        let grouper_cfg: GrouperConfig = config.module_config("grouper")?;

        let grouper = Grouper::new();
        grouper
            .init(grouper_cfg)
            .await
            .context("grouper module failed to initialize")?;

        let ingress = ApiIngress::new(ingress_cfg, &config.server);
        Ok(Self { ingress, grouper })
    }

    fn restful(&self) -> [&dyn RestfulModule; 1] {
        [&self.grouper]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    // Print config and exit if requested
    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        home_dir = %config.server.home_dir,
        "Grouper Server starting"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config).await,
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let modules = Modules::init(&config).await?;
    let router = modules.ingress.build_router(&modules.restful())?;

    let listener = modules.ingress.bind().await?;
    modules
        .ingress
        .serve(listener, router, runtime::shutdown::signal())
        .await?;

    tracing::info!("Grouper Server stopped");
    Ok(())
}

/// Build every module and the router without binding, so configuration
/// errors surface the same way they would at startup.
async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let modules = Modules::init(&config).await?;
    modules.ingress.build_router(&modules.restful())?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed: configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}
