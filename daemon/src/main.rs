//! loanflow daemon: serves the DigiLocker completion endpoint.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use loanflow_client::HttpBackend;
use loanflow_handoff::{FileStorage, HandoffCompletion, MemoryViewCache};
use loanflow_rpc::{AppState, RpcServer};
use loanflow_types::SystemClock;
use loanflow_utils::{init_logging, LogFormat};

use crate::config::FlowConfig;

#[derive(Parser)]
#[command(name = "loanflow-daemon", about = "Applicant verification flow daemon")]
struct Cli {
    /// Base URL of the hosted backend.
    #[arg(long, env = "LOANFLOW_BACKEND_URL")]
    backend_url: Option<String>,

    /// Directory for same-origin handoff storage.
    #[arg(long, env = "LOANFLOW_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port of the completion endpoint.
    #[arg(long, env = "LOANFLOW_PORT")]
    port: Option<u16>,

    /// Seconds before the internal completion page returns to the application.
    #[arg(long, env = "LOANFLOW_AUTO_ADVANCE_SECS")]
    auto_advance_secs: Option<u64>,

    /// Bearer token staff must present on internal completions.
    #[arg(long, env = "LOANFLOW_INTERNAL_TOKEN", hide_env_values = true)]
    internal_token: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LOANFLOW_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LOANFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "LOANFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the completion endpoint until interrupted.
    Serve,
    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    fn merge_into(self, base: FlowConfig) -> (FlowConfig, Command) {
        let mut config = base;
        if let Some(url) = self.backend_url {
            config.backend_url = url;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.auto_advance_secs {
            config.flow.auto_advance_secs = secs;
        }
        if let Some(token) = self.internal_token {
            config.internal_token = Some(token);
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        (config, self.command)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("received SIGINT, shutting down");
}

async fn serve(config: FlowConfig) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&config.backend_url)?;
    let storage = FileStorage::open(&config.data_dir)?;
    let completion = HandoffCompletion::new(
        Arc::new(backend),
        Arc::new(storage),
        Arc::new(MemoryViewCache::new()),
        Arc::new(SystemClock),
        &config.flow,
    );

    tracing::info!(
        "Starting loanflow daemon (port:{}, backend:{}, data:{}, internal:{})",
        config.port,
        config.backend_url,
        config.data_dir.display(),
        if config.internal_token.is_some() { "on" } else { "off" },
    );
    let state = AppState {
        completion,
        internal_token: config.internal_token,
    };
    let server = RpcServer::new(config.port, Arc::new(state));
    server.start(shutdown_signal()).await?;

    tracing::info!("loanflow daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match cli.config.as_deref() {
        Some(path) => FlowConfig::from_toml_file(path)?,
        None => FlowConfig::default(),
    };
    let (config, command) = cli.merge_into(base);

    init_logging(LogFormat::from_config(&config.log_format), &config.log_level);

    match command {
        Command::Serve => serve(config).await,
        Command::Config => {
            println!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_file() {
        let base = FlowConfig::from_toml_str(
            r#"
                port = 8000
                log_level = "debug"
                [flow]
                auto_advance_secs = 9
            "#,
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "loanflow-daemon",
            "--port",
            "9000",
            "--internal-token",
            "staff-1",
            "serve",
        ])
        .unwrap();

        let (config, command) = cli.merge_into(base);
        assert!(matches!(command, Command::Serve));
        assert_eq!(config.port, 9000);
        assert_eq!(config.internal_token.as_deref(), Some("staff-1"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.flow.auto_advance_secs, 9);
    }

    #[test]
    fn printed_config_omits_the_staff_token() {
        let config = FlowConfig {
            internal_token: Some("staff-1".into()),
            ..FlowConfig::default()
        };
        assert!(!config.to_toml_string().unwrap().contains("staff-1"));
    }
}
