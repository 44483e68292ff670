use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    aws::SsmClient,
    bootstrap::{Services, StartupError, wire_services},
    config::{AppSettings, RequiredSettings},
    routes::build_router,
    shutdown::shutdown_signal,
    state::AppState,
    tracing::{init_sentry, init_tracing},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub enum Commands {
    /// Start the web server
    Server {
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Resolve configuration and secrets, then exit without serving
    Check {
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Show version information
    Version,
}

/// Fail-fast startup: any missing setting or unresolvable secret aborts here.
/// Settings are checked before the AWS client is built, so a missing key is
/// reported even when region or credentials are absent too.
async fn resolve_services(config: &AppSettings) -> Result<Services, StartupError> {
    let outcome = async {
        let required = RequiredSettings::from_settings(config)?;
        let store = SsmClient::from_settings(&config.aws).await?;
        info!(
            region = store.region(),
            endpoint = store.endpoint(),
            "using parameter store"
        );
        wire_services(config, &required, &store).await
    }
    .await;

    outcome.inspect_err(|e| error!(error = %e, "startup aborted"))
}

async fn start(config: &AppSettings) -> Result<()> {
    let services = resolve_services(config).await?;
    let state = AppState::new(services, config.environment);
    let router = build_router(state);

    let listener = TcpListener::bind(config.server.full_url()).await?;
    info!("Server is running on {}", config.server.full_url());
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server has gracefully shutdown");
    Ok(())
}

pub async fn run() -> Result<()> {
    let cli = Commands::parse();
    match cli {
        Commands::Server { config } => {
            let path = Path::new(&config);
            let config = AppSettings::new(path)?;

            init_tracing(&config.logger)?;
            info!(selected_path =? path, "loaded environment from");
            let _sentry_guard = config.sentry.as_ref().map(init_sentry).transpose()?;
            start(&config).await?;
            Ok(())
        }
        Commands::Check { config } => {
            let path = Path::new(&config);
            let config = AppSettings::new(path)?;

            init_tracing(&config.logger)?;
            info!(selected_path =? path, "loaded environment from");
            let services = resolve_services(&config).await?;
            println!(
                "configuration ok: issuer={} audience={} database={}",
                services.authenticator.issuer(),
                services.authenticator.audience(),
                services.database.settings().database_name()
            );
            Ok(())
        }
        Commands::Version => {
            println!(
                "{} ({})",
                env!("CARGO_PKG_VERSION"),
                option_env!("BUILD_SHA")
                    .or(option_env!("GITHUB_SHA"))
                    .unwrap_or("dev")
            );
            Ok(())
        }
    }
}
