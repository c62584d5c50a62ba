use std::{net::SocketAddr, path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use crawlgate::{
    BuildLifecycle, FileSystemAdapter, GracefulShutdown, RobotsService,
    adapters::router,
    config::{
        RobotsConfig, ServerConfigValidator,
        loader::{DEFAULT_CONFIG_FILE, DEFAULT_CONFIG_TEMPLATE, load_config_or_default, load_config_sync},
        models::ServerConfig,
    },
    tracing_setup,
};
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file to use
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Serve the robots document over HTTP (default)
    Serve,
    /// Write the build-time robots document to the output directory
    Generate,
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file at the `--config` path
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve_command(&args.config).await,
        Commands::Generate => generate_command(&args.config).await,
        Commands::Validate => validate_config_command(&args.config).await,
        Commands::Init => init_config_command(&args.config).await,
    }
}

/// The default file is optional; an explicitly named one must exist.
fn load_server_config(config_path: &str) -> Result<ServerConfig> {
    if config_path == DEFAULT_CONFIG_FILE && !Path::new(config_path).exists() {
        load_config_or_default(config_path)
    } else {
        load_config_sync(config_path)
    }
}

/// Load, validate and start logging; shared by `serve` and `generate`.
async fn prepare(config_path: &str) -> Result<(ServerConfig, Arc<RobotsService>)> {
    let server_config = load_server_config(config_path)?;

    tracing_setup::init_tracing_with_config(&server_config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    ServerConfigValidator::validate(&server_config)
        .with_context(|| format!("Invalid configuration in {config_path}"))?;
    for unrecognized in ServerConfigValidator::unrecognized_keys(&server_config) {
        tracing::warn!(
            item = unrecognized.item,
            key = %unrecognized.key,
            "unrecognized robots key will be ignored"
        );
    }

    let fs = Arc::new(FileSystemAdapter::new());
    let service = RobotsService::initialize(RobotsConfig::from(&server_config), fs.clone(), fs)
        .await
        .context("Failed to initialize robots service")?;
    let service = Arc::new(service);

    service.on_before_build().await?;
    Ok((server_config, service))
}

async fn serve_command(config_path: &str) -> Result<()> {
    let (server_config, service) = prepare(config_path).await?;

    let listener = TcpListener::bind(&server_config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_config.listen_addr))?;
    tracing::info!(
        addr = %listener.local_addr().context("Failed to get local addr")?,
        path = %service.config().serve_path(),
        "crawlgate listening"
    );

    let graceful_shutdown = GracefulShutdown::new();
    let signal_handler = graceful_shutdown.clone();
    tokio::spawn(async move { signal_handler.run_signal_handler().await });
    reload_on_hangup(service.clone());

    let app = router(service);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let reason = graceful_shutdown.wait_for_shutdown_signal().await;
        tracing::info!(?reason, "shutting down");
    })
    .await
    .context("Server error")?;

    tracing::info!("graceful shutdown completed");
    Ok(())
}

/// SIGHUP drops the cached specification so the next request reloads it.
#[cfg(unix)]
fn reload_on_hangup(service: Arc<RobotsService>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::error!(error = %e, "failed to register SIGHUP handler");
            return;
        }
    };
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            let dropped = service.invalidate().await;
            tracing::info!(dropped, "received SIGHUP, robots specification will reload");
        }
    });
}

#[cfg(not(unix))]
fn reload_on_hangup(_service: Arc<RobotsService>) {}

async fn generate_command(config_path: &str) -> Result<()> {
    let (_, service) = prepare(config_path).await?;
    service.on_generate_done().await?;

    println!(
        "✅ Generated {}",
        service.config().output_file.display()
    );
    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    tracing_setup::init_console_tracing()?;

    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config_sync(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!(
                "   • Rule Items: {}",
                config.robots.as_ref().map_or(0, |spec| spec.items().len())
            );
            println!("   • Cache Time: {} ms", config.cache_time);
            println!("   • Static File: {}", config.static_file_path().display());
            println!("   • Output File: {}", config.output_file_path().display());

            let unrecognized = ServerConfigValidator::unrecognized_keys(&config);
            if !unrecognized.is_empty() {
                println!();
                println!("⚠️  Unrecognized keys (ignored):");
                for key in unrecognized {
                    println!("   • item {}: {}", key.item, key.key);
                }
            }
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Verify listen address format (e.g., '127.0.0.1:3000')");
            println!("   • Use a plain file name such as 'robots.txt'");
            println!("   • Give cache_time in milliseconds");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    tracing_setup::init_console_tracing()?;

    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    tokio::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'crawlgate serve --config {config_path}' to start the server");
    Ok(())
}
