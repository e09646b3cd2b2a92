use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcloud_bridge::config::Config;
use gcloud_bridge::doubler::double_string;
use gcloud_bridge::gcp::auth::AmbientCredentials;
use gcloud_bridge::probe::probe_at;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;

/// Command-line host for the gcloud-bridge library
#[derive(Parser, Debug)]
#[command(name = "gcloud-probe", version = gcloud_bridge::VERSION, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print TEXT concatenated with itself
    Double { text: String },
    /// Build an authenticated Compute Engine client from ambient credentials
    Probe {
        /// GCP project to use
        #[arg(short, long)]
        project: Option<String>,

        /// GCP zone to use
        #[arg(short, long)]
        zone: Option<String>,

        /// Remember the resolved project and zone
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Send library and CLI events to the log file next to the config; nothing is
/// installed when logging is off
fn setup_logging(level: LogLevel) -> Result<Option<WorkerGuard>> {
    let filter = LevelFilter::from(level);
    if filter == LevelFilter::OFF {
        return Ok(None);
    }

    let log_path = Config::log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        "gcloud-probe {} logging at {:?} to {:?}",
        gcloud_bridge::VERSION,
        level,
        log_path
    );
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    match args.command {
        Command::Double { text } => {
            println!("{}", double_string(&text));
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe {
            project,
            zone,
            save,
        } => run_probe(project, zone, save).await,
    }
}

async fn run_probe(project: Option<String>, zone: Option<String>, save: bool) -> Result<ExitCode> {
    let mut config = Config::load();
    let project = project.unwrap_or_else(|| config.effective_project());
    let zone = zone.unwrap_or_else(|| config.effective_zone());

    if project.is_empty() {
        tracing::warn!("No GCP project configured, probing with an empty project id");
    }
    let endpoint = config.effective_endpoint().to_string();
    tracing::info!("Using project: {}, zone: {}, endpoint: {}", project, zone, endpoint);

    match probe_at(&AmbientCredentials, &project, &zone, &endpoint).await {
        Ok(client) => {
            println!("ok: compute client ready for {}", client.compute_zonal_url(""));
            if save {
                config.project_id = Some(project);
                config.zone = Some(zone);
                config.save()?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
