use clap::Parser;
use radius_gateway::{
    AuditLogger, Config, ObserverSet, RadiusGateway, ServerConfig, SmtpVerifier, TracingObserver,
};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RADIUS gateway authenticating mail-domain users against an SMTP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-gateway")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config_path: String,

    /// Validate configuration and exit (doesn't start the gateway)
    #[arg(short, long)]
    validate: bool,

    /// Override the comma-separated domain allow-list
    #[arg(long, value_name = "DOMAINS")]
    allowed_domains: Option<String>,

    /// Override the listen port
    #[arg(long, value_name = "PORT")]
    listen_port: Option<u16>,
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match Config::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            if cli.validate {
                eprintln!("Configuration validation failed: {}", e);
                process::exit(1);
            }

            init_tracing("info");
            warn!("Could not load config file {}: {}", cli.config_path, e);
            info!("Creating example configuration at: {}", cli.config_path);

            if let Err(e) = Config::example().to_file(&cli.config_path) {
                error!("Error creating example config: {}", e);
                process::exit(1);
            }

            info!("Please edit {} and restart the gateway", cli.config_path);
            process::exit(0);
        }
    };

    if let Some(domains) = cli.allowed_domains {
        config.allowed_domains = domains;
    }
    if let Some(port) = cli.listen_port {
        config.listen_port = port;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        process::exit(1);
    }

    if cli.validate {
        println!("Configuration validated successfully");
        println!("  Listen: {}:{}", config.listen_address, config.listen_port);
        println!("  Allowed domains: {}", config.allow_list());
        println!(
            "  SMTP: {}:{} ({:?}, {}s timeout)",
            config.smtp.host, config.smtp.port, config.smtp.security, config.smtp.timeout_secs
        );
        if let Some(ref path) = config.audit_log_path {
            println!("  Audit log: {}", path);
        }
        process::exit(0);
    }

    init_tracing(config.log_level.as_deref().unwrap_or("info"));

    info!("RADIUS gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config_path);

    let allow_list = config.allow_list();
    if allow_list.is_empty() {
        warn!("No allowed domains configured: every request will be rejected");
    }
    info!(
        host = %config.smtp.host,
        port = config.smtp.port,
        security = ?config.smtp.security,
        "Verifying credentials against SMTP server"
    );

    let audit_logger = match AuditLogger::new(config.audit_log_path.clone()) {
        Ok(logger) => logger,
        Err(e) => {
            error!("Failed to open audit log: {}", e);
            process::exit(1);
        }
    };
    if let Some(path) = audit_logger.file_path() {
        info!("Audit logging enabled: {}", path);
    }

    let observer = ObserverSet::new()
        .with(Arc::new(TracingObserver))
        .with(Arc::new(audit_logger));

    let verifier = SmtpVerifier::new(config.smtp.clone());
    let server_config = match ServerConfig::from_config(&config, Arc::new(verifier)) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let gateway = match RadiusGateway::new(server_config, Arc::new(observer)).await {
        Ok(gw) => gw,
        Err(e) => {
            error!("Failed to start gateway: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {}", e);
        process::exit(1);
    }
}
