use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use tally_app_core::assistant::{AssistantKernel, BootPhase, Speaker};
use tally_app_core::dataset::DatasetKernel;
use tally_app_core::monitor::MonitorKernel;
use tally_app_core::viewmodel::{
    backend_line, chat_lines, docker_line, gpu_line, monitor_rows, page_line, run_line,
    service_rows, EntryRowVm, ServiceRowVm,
};
use tally_app_core::{DatasetState, MonitorState};
use tally_config::{ENTRY_PAGE_SIZE, MONITOR_RECONNECT_DELAY, STOP_REFRESH_DELAY};
use tally_core::entry::{EntryStatus, RunSnapshot};
use tally_core::health::ServiceLogRecord;
use tally_core::service::ServiceTable;
use tally_net::{
    default_http_client, discover, ConnState, DatasetClient, DockerAction, Endpoints, EntryPage,
    GatewayClient, MonitoringClient, ReconnectPolicy, ServiceAction, SyncOutcome,
};

use crate::{watch, CliDockerAction, CliEntryFilter, CliServiceAction};

/// Endpoint flags collected from the command line. Anything not overridden
/// explicitly comes from discovery against the shell.
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
    pub shell_url: String,
    pub gateway_url: Option<String>,
    pub monitoring_url: Option<String>,
    pub dataset_url: Option<String>,
}

pub async fn resolve_endpoints(overrides: &EndpointOverrides) -> Result<Endpoints> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let mut endpoints = discover(&client, &overrides.shell_url).await;
    if let Some(url) = &overrides.gateway_url {
        endpoints.gateway_url = url.clone();
        endpoints.gateway_ws = url.clone();
    }
    if let Some(url) = &overrides.monitoring_url {
        endpoints.monitoring_url = url.clone();
    }
    if let Some(url) = &overrides.dataset_url {
        endpoints.dataset_url = url.clone();
    }
    Ok(endpoints)
}

pub async fn cmd_status(endpoints: &Endpoints) -> Result<Vec<ServiceRowVm>> {
    println!(":: Probing services...");
    println!("   Gateway: {}", endpoints.gateway_url);

    let client = default_http_client().context("Failed to build HTTP client")?;
    let gateway = GatewayClient::new(client, &endpoints.gateway_url);
    let statuses = gateway
        .service_statuses()
        .await
        .context("Gateway unreachable")?;

    let mut table = ServiceTable::new();
    table.apply_snapshot(&statuses);
    let rows: Vec<ServiceRowVm> = table.iter().map(ServiceRowVm::from).collect();

    println!("\n:: Service Status");
    for row in &rows {
        println!("   {:<14} {}", row.label, row.status_label);
    }
    println!(
        "   {} of {} services online",
        table.online_count(),
        table.len()
    );

    Ok(rows)
}

pub async fn cmd_up(endpoints: &Endpoints) -> Result<()> {
    println!(":: Starting services...");
    println!("   Gateway: {}", endpoints.gateway_url);
    println!("   Monitor: {}", endpoints.monitoring_url);

    let client = default_http_client().context("Failed to build HTTP client")?;
    let mut kernel =
        AssistantKernel::new(client, &endpoints.gateway_url, &endpoints.monitoring_url);

    kernel.probe();
    kernel
        .run_until(|state| state.phase != BootPhase::Probing)
        .await;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    kernel.start_services();
    let ticker = pb.clone();
    kernel
        .run_until(move |state| {
            ticker.set_message(state.status_line.clone());
            matches!(state.phase, BootPhase::Ready | BootPhase::Failed)
        })
        .await;

    let state = kernel.store.state();
    if state.phase == BootPhase::Failed {
        pb.finish_and_clear();
        let reason = state
            .notices
            .visible(Instant::now())
            .map(|n| n.text.clone())
            .unwrap_or_else(|| state.status_line.clone());
        anyhow::bail!("{reason}");
    }
    pb.finish_with_message(state.status_line.clone());

    println!("\n:: Service Status");
    for row in service_rows(&state) {
        println!("   {:<14} {}", row.label, row.status_label);
    }
    Ok(())
}

/// Sends one message through the orchestration pipeline and returns the
/// reply text.
pub async fn cmd_chat(endpoints: &Endpoints, text: &str, tts_mode: Option<&str>) -> Result<String> {
    anyhow::ensure!(!text.trim().is_empty(), "Nothing to send");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let mut kernel =
        AssistantKernel::new(client, &endpoints.gateway_url, &endpoints.monitoring_url);
    if let Some(mode) = tts_mode {
        kernel.set_tts_mode(mode);
    }
    println!(":: Chatting as {}...", kernel.user_id());

    kernel.send_chat(text);
    kernel.run_until(|state| !state.sending).await;

    let state = kernel.store.state();
    for line in chat_lines(&state) {
        let audio = if line.has_audio { "  [audio]" } else { "" };
        println!("   {}: {}{audio}", line.prefix, line.text);
    }
    if let Some(notice) = state.notices.visible(Instant::now()) {
        anyhow::bail!("{}", notice.text);
    }
    Ok(state
        .chat
        .last()
        .filter(|line| line.speaker == Speaker::Assistant)
        .map(|line| line.text.clone())
        .unwrap_or_default())
}

pub async fn cmd_transcribe(endpoints: &Endpoints, file: &Path) -> Result<String> {
    println!(":: Transcribing {}...", file.display());
    let audio =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio.webm".to_owned());

    let client = default_http_client().context("Failed to build HTTP client")?;
    let mut kernel =
        AssistantKernel::new(client, &endpoints.gateway_url, &endpoints.monitoring_url);
    kernel.transcribe(audio, filename);
    kernel
        .run_until(|state| state.draft.is_some() || state.notices.visible(Instant::now()).is_some())
        .await;

    let state = kernel.store.state();
    match state.draft {
        Some(text) => {
            println!("   Text: {text}");
            Ok(text)
        }
        None => {
            let reason = state
                .notices
                .visible(Instant::now())
                .map(|n| n.text.clone())
                .unwrap_or_else(|| "Transcription failed".to_owned());
            anyhow::bail!("{reason}")
        }
    }
}

pub async fn cmd_watch(endpoints: &Endpoints) -> Result<()> {
    println!(":: Watching the assistant console (ctrl-c to stop)...");
    println!("   Stream: {}", endpoints.gateway_stream_url());

    let client = default_http_client().context("Failed to build HTTP client")?;
    let mut kernel =
        AssistantKernel::new(client, &endpoints.gateway_url, &endpoints.monitoring_url);
    kernel.connect(endpoints.gateway_stream_url());
    kernel.probe();
    kernel.start_vram_poll();

    let cancel = kernel.cancel_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    });

    let mut view = watch::AssistantView::default();
    kernel
        .run_until(move |state| {
            view.observe(state);
            false
        })
        .await;

    println!(":: Stopped.");
    Ok(())
}

pub async fn cmd_monitor_status(endpoints: &Endpoints) -> Result<()> {
    println!(":: Fetching the dashboard...");
    println!("   Monitor: {}", endpoints.monitoring_url);

    let client = default_http_client().context("Failed to build HTTP client")?;
    let monitoring = MonitoringClient::new(client, &endpoints.monitoring_url);

    let services = monitoring
        .service_statuses()
        .await
        .context("Monitoring service unreachable")?;
    let metrics = monitoring.metrics().await.unwrap_or_default();
    // Probes that fail or answer with an error payload read as absent, the
    // same way the console dilutes them.
    let state = MonitorState {
        services,
        metrics,
        gpu: monitoring
            .gpu_stats()
            .await
            .ok()
            .filter(|gpu| gpu.error.is_none()),
        docker: monitoring.docker_status().await.ok(),
        docker_stats: monitoring
            .docker_stats()
            .await
            .ok()
            .filter(|stats| stats.error.is_none()),
        ..MonitorState::default()
    };

    println!("\n:: Services");
    for row in monitor_rows(&state) {
        println!(
            "   {:<16} {:<9} port {:<5} {:>8}  uptime {}",
            row.name, row.status_label, row.port, row.response, row.uptime
        );
    }
    println!("\n:: Runtime");
    println!("   {}", docker_line(&state));
    println!("   {}", gpu_line(&state));
    Ok(())
}

pub async fn cmd_monitor_watch(endpoints: &Endpoints, retry_forever: bool) -> Result<()> {
    println!(":: Watching the monitoring console (ctrl-c to stop)...");
    println!("   Stream: {}", endpoints.monitoring_stream_url());

    let client = default_http_client().context("Failed to build HTTP client")?;
    let mut kernel = MonitorKernel::new(client, &endpoints.monitoring_url);
    if retry_forever {
        kernel.set_reconnect_policy(ReconnectPolicy::unbounded(MONITOR_RECONNECT_DELAY));
    }
    kernel.connect(endpoints.monitoring_stream_url());
    kernel.start_telemetry_poll();

    let cancel = kernel.cancel_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    });

    let mut view = watch::MonitorView::default();
    kernel
        .run_until(move |state| {
            view.observe(state);
            state.conn == ConnState::GaveUp
        })
        .await;

    if kernel.store.state().conn == ConnState::GaveUp {
        anyhow::bail!("Stream gave up after repeated drops; rerun with --retry-forever");
    }
    println!(":: Stopped.");
    Ok(())
}

pub async fn cmd_monitor_control(
    endpoints: &Endpoints,
    service: &str,
    action: CliServiceAction,
) -> Result<()> {
    let action: ServiceAction = action.into();
    println!(":: Requesting {service} {action}...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let monitoring = MonitoringClient::new(client, &endpoints.monitoring_url);
    monitoring
        .control_service(service, action)
        .await
        .with_context(|| format!("{service} {action} failed"))?;

    println!(":: {service} {action} accepted.");
    Ok(())
}

pub async fn cmd_monitor_docker(
    endpoints: &Endpoints,
    action: CliDockerAction,
    confirm: bool,
) -> Result<()> {
    let action: DockerAction = action.into();
    if action == DockerAction::Remove && !confirm {
        anyhow::bail!("Removing the synthesis container needs --confirm");
    }
    println!(":: Requesting docker {action}...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let monitoring = MonitoringClient::new(client, &endpoints.monitoring_url);
    monitoring
        .docker_control(action)
        .await
        .with_context(|| format!("docker {action} failed"))?;

    println!(":: docker {action} accepted.");
    Ok(())
}

pub async fn cmd_monitor_logs(
    endpoints: &Endpoints,
    service: &str,
    limit: u32,
) -> Result<Vec<ServiceLogRecord>> {
    println!(":: Action log for {service}...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let monitoring = MonitoringClient::new(client, &endpoints.monitoring_url);
    let records = monitoring
        .service_log(service, limit)
        .await
        .with_context(|| format!("Failed to fetch the {service} log"))?;

    if records.is_empty() {
        println!("   No recorded actions.");
    }
    for rec in &records {
        println!(
            "   {:<24} {:<10} {}",
            rec.timestamp.as_deref().unwrap_or("-"),
            rec.action_label(),
            rec.status_label()
        );
        if let Some(error) = &rec.error {
            println!("      ! {error}");
        }
    }
    Ok(records)
}

pub async fn cmd_dataset_status(endpoints: &Endpoints) -> Result<RunSnapshot> {
    println!(":: Dataset run status...");
    println!("   Backend: {}", endpoints.dataset_url);

    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    let run = dataset
        .status()
        .await
        .context("Dataset backend unreachable")?;
    let backends = dataset.services().await.unwrap_or_default();

    let state = DatasetState {
        run: run.clone(),
        backends,
        ..DatasetState::default()
    };
    println!("   {}", run_line(&state));
    println!("   {}", backend_line(&state));
    Ok(run)
}

/// Initializes the dataset and returns how many clips it holds.
pub async fn cmd_dataset_init(endpoints: &Endpoints) -> Result<u64> {
    println!(":: Initializing the dataset...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    let total = dataset.initialize().await.context("Initialize rejected")?;

    println!("   Clips: {total}");
    Ok(total)
}

pub async fn cmd_dataset_start(endpoints: &Endpoints, workers: u32, backend: &str) -> Result<()> {
    println!(":: Starting generation ({workers} workers, {backend} backend)...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    dataset
        .start(workers, backend)
        .await
        .context("Start rejected")?;

    println!(":: Generation started.");
    Ok(())
}

pub async fn cmd_dataset_pause(endpoints: &Endpoints) -> Result<()> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    dataset.pause().await.context("Pause rejected")?;
    println!(":: Generation paused.");
    Ok(())
}

pub async fn cmd_dataset_resume(endpoints: &Endpoints) -> Result<()> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    dataset.resume().await.context("Resume rejected")?;
    println!(":: Generation resumed.");
    Ok(())
}

pub async fn cmd_dataset_stop(endpoints: &Endpoints) -> Result<()> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    dataset.stop().await.context("Stop rejected")?;
    println!(":: Stop requested.");

    // The run loop settles asynchronously; report the state it lands in.
    tokio::time::sleep(STOP_REFRESH_DELAY).await;
    if let Ok(run) = dataset.status().await {
        println!("   Status: {}", run.status);
    }
    Ok(())
}

pub async fn cmd_dataset_entries(
    endpoints: &Endpoints,
    page: u64,
    filter: Option<CliEntryFilter>,
) -> Result<EntryPage> {
    // Pages are 1-based on the command line.
    let page = page.max(1) - 1;
    let filter: Option<EntryStatus> = filter.map(Into::into);
    println!(":: Listing entries...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    let listing = dataset
        .entries(ENTRY_PAGE_SIZE, page * ENTRY_PAGE_SIZE, filter)
        .await
        .context("Failed to list entries")?;

    for entry in &listing.entries {
        let row = EntryRowVm::from(entry);
        println!(
            "   {:>5}  {:<10} {:>7} {:>9}  {}",
            row.id, row.status_label, row.duration, row.size, row.filename
        );
        if let Some(error) = &row.error {
            println!("          ! {error}");
        }
    }
    let paging = DatasetState {
        page,
        total: listing.total,
        ..DatasetState::default()
    };
    println!("   {}", page_line(&paging));
    Ok(listing)
}

pub async fn cmd_dataset_regenerate(
    endpoints: &Endpoints,
    id: u64,
    emotion: Option<&str>,
) -> Result<()> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    dataset
        .regenerate(id, emotion)
        .await
        .context("Regenerate rejected")?;
    println!(":: Entry {id} queued for regeneration.");
    Ok(())
}

/// Marks every entry from `from_id` on as pending again and returns how many
/// were reset.
pub async fn cmd_dataset_reset(endpoints: &Endpoints, from_id: u64) -> Result<u64> {
    println!(":: Resetting entries from {from_id}...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    let count = dataset
        .reset_from(from_id)
        .await
        .context("Reset rejected")?;

    println!("   Reset: {count} entries");
    Ok(count)
}

pub async fn cmd_dataset_priority_check(endpoints: &Endpoints) -> Result<()> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    dataset
        .force_priority_check()
        .await
        .context("Priority check rejected")?;
    println!(":: Priority check requested.");
    Ok(())
}

pub async fn cmd_dataset_sync(endpoints: &Endpoints) -> Result<SyncOutcome> {
    println!(":: Reconciling tracked state against the files on disk...");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let dataset = DatasetClient::new(client, &endpoints.dataset_url);
    let outcome = dataset.sync_state().await.context("Sync rejected")?;

    println!("   Found:   {}", outcome.files_found);
    println!("   Missing: {}", outcome.files_missing);
    println!("   Synced:  {}", outcome.synced_entries);
    Ok(outcome)
}

pub async fn cmd_dataset_watch(endpoints: &Endpoints) -> Result<()> {
    println!(":: Watching the dataset console (ctrl-c to stop)...");
    println!("   Stream: {}", endpoints.dataset_stream_url());

    let client = default_http_client().context("Failed to build HTTP client")?;
    let mut kernel = DatasetKernel::new(client, &endpoints.dataset_url);
    kernel.connect(endpoints.dataset_stream_url());
    kernel.start_polls();

    let cancel = kernel.cancel_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel.cancel();
    });

    let mut view = watch::DatasetView::default();
    kernel
        .run_until(move |state| {
            view.observe(state);
            false
        })
        .await;

    println!(":: Stopped.");
    Ok(())
}
