//! hive - local development server and deploy tool.
//!
//! This binary wires the asset watcher, dispatcher and HTTP server together
//! for `serve`, and runs the signed upload for `upload`.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hive_sdk::{
    api::{package_project, upload, ApiClient, UploadOutcome},
    assets::{AssetCache, AssetWatcher, ExternalCompiler},
    config::{Cli, Command, ServeConfig, UploadConfig},
    error::{ApiError, UploadError},
    project::ProjectFile,
    server::{create_router, Dispatcher, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Upload(config) => run_upload(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let layout = config.layout();

    info!("hive v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Project: {}", layout.root().display());
    info!("  API endpoint: {}", config.api_endpoint);
    info!("  Asset poll interval: {}ms", config.poll_interval_ms);

    match ProjectFile::load(&layout) {
        Ok(Some(project)) if project.credentials().is_none() => {
            warn!("  app.yaml has no API credentials; CMS helpers will return nothing");
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("  No app.yaml found; serving the welcome page");
        }
        Err(e) => {
            // Reported again on every request until fixed
            warn!("  {}", e);
        }
    }

    let cache = AssetCache::new();
    let compiler = ExternalCompiler::new(config.compiler_commands());
    let watcher = AssetWatcher::for_project(&layout, cache.clone(), compiler)
        .with_interval(config.poll_interval());

    if let Err(e) = watcher.spawn() {
        error!("Failed to start asset watcher: {}", e);
        return ExitCode::FAILURE;
    }

    let dispatcher = Dispatcher::new(layout, cache, config.api_endpoint.clone());
    let router_config = RouterConfig::default().with_tracing(!config.no_tracing);
    let router = create_router(dispatcher, router_config);

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("  Press Ctrl+C to stop");
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "hive_sdk=debug,tower_http=debug"
    } else {
        "hive_sdk=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Upload Command
// =============================================================================

async fn run_upload(config: UploadConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    // reqwest's blocking client must not run on a runtime worker
    let result = tokio::task::spawn_blocking(move || publish(&config)).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: upload task failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(UploadOutcome::Published { url }) => {
            println!("✓ Upload complete");
            println!("  Your site is live at {}", url);
            ExitCode::SUCCESS
        }
        Ok(UploadOutcome::Rejected { errors }) => {
            println!("✗ Upload rejected");
            for message in &errors {
                println!("  - {}", message);
            }
            ExitCode::FAILURE
        }
        Ok(UploadOutcome::Unconfirmed { body }) => {
            warn!(body = %body, "Upload response could not be read");
            println!("✓ Upload sent, but the API did not confirm the result");
            ExitCode::SUCCESS
        }
        Err(UploadError::Api(ApiError::BadCredentials { .. })) => {
            println!("✗ The API did not recognise this application");
            println!();
            println!("Please check:");
            println!("  - application_name in app.yaml");
            println!("  - api_access_key and api_secret_key in app.yaml");
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("✗ Upload failed");
            println!();
            println!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load, package and upload the project described by `config`.
fn publish(config: &UploadConfig) -> Result<UploadOutcome, UploadError> {
    let layout = config.layout();
    let project = ProjectFile::require(&layout)?;
    let credentials = project.require_credentials()?;
    let client = ApiClient::new(&credentials, config.api_endpoint.clone())?;

    println!("Uploading {} to {}", client.application_name(), client.endpoint());

    let payload = package_project(&layout, &project)?;
    upload(&client, &payload)
}
