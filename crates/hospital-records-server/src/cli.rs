//! Command-line entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hospital_records_core::PatientRecords;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::logging::init_logging;
use crate::scheduler::{ExportSchedule, ExtractionJob};

#[derive(Debug, Parser)]
#[command(
    name = "hospital-records",
    version,
    about = "Patient record service and scheduled CSV extraction"
)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, short, global = true, env = "HOSPITAL_RECORDS_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true, env = "HOSPITAL_RECORDS_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the patient record HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long, env = "HOSPITAL_RECORDS_PORT")]
        port: Option<u16>,

        /// Also run the extraction job on its schedule in this process
        #[arg(long)]
        with_export_schedule: bool,
    },

    /// Run the extraction job once (with retry) and exit
    Export {
        /// CSV output file (overrides config)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Run the extraction job on its schedule until interrupted
    Schedule {
        /// CSV output file (overrides config)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Load the config file and fold command-line overrides into it.
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;

        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        match &self.command {
            Command::Serve { host, port, .. } => {
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
            }
            Command::Export { output } | Command::Schedule { output } => {
                if let Some(output) = output {
                    config.export.output_path = output.clone();
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Resolve configuration, install logging and dispatch the subcommand.
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    init_logging(&config.logging)?;

    match cli.command {
        Command::Serve {
            with_export_schedule,
            ..
        } => serve(config, with_export_schedule).await,
        Command::Export { .. } => {
            let report = ExtractionJob::from_config(&config).run_with_retry().await?;
            info!(rows = report.rows, output = %report.output.display(), "export complete");
            Ok(())
        }
        Command::Schedule { .. } => {
            let (tx, rx) = watch::channel(false);
            let stop = tokio::spawn(forward_ctrl_c(tx));
            ExportSchedule::from_config(&config)
                .run_until(wait_for_shutdown(rx))
                .await;
            stop.abort();
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, with_export_schedule: bool) -> Result<()> {
    let records = PatientRecords::open(&config.database.path).with_context(|| {
        format!("Failed to open database {}", config.database.path.display())
    })?;
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;

    let (tx, rx) = watch::channel(false);
    let stop = tokio::spawn(forward_ctrl_c(tx));

    let schedule = with_export_schedule.then(|| {
        let schedule = ExportSchedule::from_config(&config);
        tokio::spawn(schedule.run_until(wait_for_shutdown(rx.clone())))
    });

    let served = api::serve(listener, AppState::new(records), wait_for_shutdown(rx)).await;

    if let Some(handle) = schedule {
        let _ = handle.await;
    }
    stop.abort();
    served
}

/// Flip the shutdown flag on Ctrl-C.
async fn forward_ctrl_c(tx: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
        let _ = tx.send(true);
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // A dropped sender also ends the wait.
    let _ = rx.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "hospital-records",
            "--database",
            "/tmp/records.db",
            "serve",
            "--port",
            "8088",
            "--with-export-schedule",
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[server]\nhost = \"0.0.0.0\"\n").unwrap();
        let cli = Cli {
            config: Some(config_path),
            ..cli
        };

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8088");
        assert_eq!(config.database.path, PathBuf::from("/tmp/records.db"));
        assert!(matches!(
            cli.command,
            Command::Serve {
                with_export_schedule: true,
                ..
            }
        ));
    }

    #[test]
    fn test_export_output_override() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "").unwrap();

        let cli = Cli::try_parse_from([
            "hospital-records",
            "--config",
            config_path.to_str().unwrap(),
            "export",
            "--output",
            "snapshot.csv",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.export.output_path, PathBuf::from("snapshot.csv"));
    }
}
