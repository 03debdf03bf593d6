use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_cli::{commands, CliDockerAction, CliEntryFilter, CliServiceAction};
use tally_config::{DATASET_BACKEND, DATASET_PARALLEL_WORKERS, DEFAULT_GATEWAY_URL};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Shell base queried for endpoint discovery
    #[arg(long, global = true, env = "TALLY_SHELL_URL", default_value = DEFAULT_GATEWAY_URL)]
    shell_url: String,
    #[arg(long, global = true, env = "TALLY_GATEWAY_URL")]
    gateway_url: Option<String>,
    #[arg(long, global = true, env = "TALLY_MONITORING_URL")]
    monitoring_url: Option<String>,
    #[arg(long, global = true, env = "TALLY_DATASET_URL")]
    dataset_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the managed services once
    Status,
    /// Run the startup sequence
    Up,
    /// Send one chat message and print the reply
    Chat {
        text: String,
        #[arg(long, help = "Voice mode for the reply audio")]
        tts_mode: Option<String>,
    },
    /// Upload an audio file for transcription
    Transcribe { file: PathBuf },
    /// Follow the assistant console live
    Watch,
    /// Service monitoring console
    Monitor {
        #[command(subcommand)]
        command: MonitorCommands,
    },
    /// Dataset generation console
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
}

#[derive(Subcommand)]
enum MonitorCommands {
    /// One-shot dashboard readout
    Status,
    /// Follow the monitoring stream live
    Watch {
        #[arg(long, help = "Keep reconnecting instead of giving up")]
        retry_forever: bool,
    },
    /// Start, stop or restart a managed service
    Control {
        service: String,
        #[arg(value_enum)]
        action: CliServiceAction,
    },
    /// Control the synthesis container
    Docker {
        #[arg(value_enum)]
        action: CliDockerAction,
        #[arg(long, help = "Required for remove")]
        confirm: bool,
    },
    /// Recent control actions recorded for a service
    Logs {
        service: String,
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Run status and backend health
    Status,
    /// Initialize the dataset
    Init,
    /// Start a generation run
    Start {
        #[arg(long, default_value_t = DATASET_PARALLEL_WORKERS)]
        workers: u32,
        #[arg(long, default_value = DATASET_BACKEND)]
        backend: String,
    },
    /// Pause the running generation
    Pause,
    /// Resume a paused generation
    Resume,
    /// Stop the running generation
    Stop,
    /// List entries, one page at a time
    Entries {
        #[arg(short, long, default_value_t = 1)]
        page: u64,
        #[arg(long, value_enum)]
        filter: Option<CliEntryFilter>,
    },
    /// Queue one entry for regeneration
    Regenerate {
        id: u64,
        #[arg(long)]
        emotion: Option<String>,
    },
    /// Mark every entry from an id on as pending again
    Reset { from_id: u64 },
    /// Ask the run loop to re-check regeneration priorities now
    #[command(name = "priority-check", alias = "priority")]
    PriorityCheck,
    /// Reconcile tracked state against the files on disk
    Sync,
    /// Follow the dataset console live
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("default subscriber");

    let overrides = commands::EndpointOverrides {
        shell_url: cli.shell_url,
        gateway_url: cli.gateway_url,
        monitoring_url: cli.monitoring_url,
        dataset_url: cli.dataset_url,
    };
    let endpoints = commands::resolve_endpoints(&overrides).await?;

    match cli.command {
        Commands::Status => {
            commands::cmd_status(&endpoints).await?;
        }
        Commands::Up => commands::cmd_up(&endpoints).await?,
        Commands::Chat { text, tts_mode } => {
            commands::cmd_chat(&endpoints, &text, tts_mode.as_deref()).await?;
        }
        Commands::Transcribe { file } => {
            commands::cmd_transcribe(&endpoints, &file).await?;
        }
        Commands::Watch => commands::cmd_watch(&endpoints).await?,
        Commands::Monitor { command } => match command {
            MonitorCommands::Status => commands::cmd_monitor_status(&endpoints).await?,
            MonitorCommands::Watch { retry_forever } => {
                commands::cmd_monitor_watch(&endpoints, retry_forever).await?
            }
            MonitorCommands::Control { service, action } => {
                commands::cmd_monitor_control(&endpoints, &service, action).await?
            }
            MonitorCommands::Docker { action, confirm } => {
                commands::cmd_monitor_docker(&endpoints, action, confirm).await?
            }
            MonitorCommands::Logs { service, limit } => {
                commands::cmd_monitor_logs(&endpoints, &service, limit).await?;
            }
        },
        Commands::Dataset { command } => match command {
            DatasetCommands::Status => {
                commands::cmd_dataset_status(&endpoints).await?;
            }
            DatasetCommands::Init => {
                commands::cmd_dataset_init(&endpoints).await?;
            }
            DatasetCommands::Start { workers, backend } => {
                commands::cmd_dataset_start(&endpoints, workers, &backend).await?
            }
            DatasetCommands::Pause => commands::cmd_dataset_pause(&endpoints).await?,
            DatasetCommands::Resume => commands::cmd_dataset_resume(&endpoints).await?,
            DatasetCommands::Stop => commands::cmd_dataset_stop(&endpoints).await?,
            DatasetCommands::Entries { page, filter } => {
                commands::cmd_dataset_entries(&endpoints, page, filter).await?;
            }
            DatasetCommands::Regenerate { id, emotion } => {
                commands::cmd_dataset_regenerate(&endpoints, id, emotion.as_deref()).await?
            }
            DatasetCommands::Reset { from_id } => {
                commands::cmd_dataset_reset(&endpoints, from_id).await?;
            }
            DatasetCommands::PriorityCheck => {
                commands::cmd_dataset_priority_check(&endpoints).await?
            }
            DatasetCommands::Sync => {
                commands::cmd_dataset_sync(&endpoints).await?;
            }
            DatasetCommands::Watch => commands::cmd_dataset_watch(&endpoints).await?,
        },
    }

    Ok(())
}
