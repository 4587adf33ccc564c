//! CLI command implementations
//!
//! Both commands load the config, seed the storages and build the standard
//! dispatcher. `serve` mounts it on a socket, `query` answers one request.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use tracing_subscriber::EnvFilter;

use crate::http_server::{Dispatcher, HttpServer, ServerConfig};
use crate::observability::TracingSink;
use crate::storage::{MemoryStorage, SeedData};

use super::args::{Command, DEFAULT_CONFIG};
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Query { config, target } => query(&config, &target),
    }
}

/// Start the HTTP server
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.port = port;
        config.validate().map_err(CliError::config_error)?;
    }
    init_tracing(&config.log_level);

    let dispatcher = build_dispatcher(&config)?;
    let server = HttpServer::new(config, dispatcher);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Dispatch one GET request and print the response body to stdout
pub fn query(config_path: &Path, target: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    init_tracing(&config.log_level);
    let dispatcher = build_dispatcher(&config)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;
    let (status, body) = rt.block_on(execute_query(&dispatcher, target))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", body)?;
    stdout.flush()?;

    if !status.is_success() {
        return Err(CliError::query_failed(format!("request answered with {}", status)));
    }
    Ok(())
}

/// Run `target` through the dispatcher as a GET request
pub async fn execute_query(
    dispatcher: &Dispatcher,
    target: &str,
) -> CliResult<(StatusCode, String)> {
    let target = if target.starts_with('/') {
        target.to_string()
    } else {
        format!("/{}", target)
    };
    let uri: Uri = target
        .parse()
        .map_err(|e| CliError::io_error(format!("Invalid request target '{}': {}", target, e)))?;

    let response = dispatcher
        .dispatch(Method::GET, uri, HeaderMap::new(), Bytes::new())
        .await;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| CliError::io_error(format!("Failed to read response: {}", e)))?;

    Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
}

/// Load configuration from file.
///
/// A missing file at the default location yields the defaults.
pub fn load_config(path: &Path) -> CliResult<ServerConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        return Ok(ServerConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

    let config: ServerConfig = serde_json::from_str(&content)
        .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

    config.validate().map_err(CliError::config_error)?;

    Ok(config)
}

/// Seeded storages behind the standard plugins and services
pub fn build_dispatcher(config: &ServerConfig) -> CliResult<Dispatcher> {
    let storage = load_storage(config.seed_data.as_deref())?;
    let protected = load_storage(config.protected_data.as_deref())?;
    Ok(Dispatcher::standard(
        Arc::new(storage),
        Arc::new(protected),
        Arc::new(TracingSink),
    ))
}

fn load_storage(seed: Option<&Path>) -> CliResult<MemoryStorage> {
    let seed = match seed {
        Some(path) => SeedData::from_file(path)?,
        None => SeedData::empty(),
    };
    Ok(MemoryStorage::from_seed(seed))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second init in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
