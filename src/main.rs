mod app;
mod cli;
mod config;
mod delta;
mod history;
mod identity;
mod input;
mod k8s;
mod model;
mod ui;
mod view;

use anyhow::{Context, Result};
use app::{App, AppCommand, PortForwardSession, RefreshOutcome, RefreshRequest};
use clap::Parser;
use cli::CliArgs;
use config::{RuntimeConfigWatcher, refresh_interval};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::{StreamExt, TryStreamExt};
use k8s::KubeGateway;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    ConfigMap, Event as KubeEvent, Namespace, Node, Pod, Service,
};
use kube::runtime::watcher::{Config as WatchConfig, watcher};
use kube::{Api, Client};
use model::{NamespaceScope, ResourceKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Instant;
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const TABLE_REFRESH_TIMEOUT: Duration = Duration::from_secs(4);
const WATCH_NUDGE_INTERVAL: Duration = Duration::from_millis(350);
const WATCH_RETRY_DELAY: Duration = Duration::from_millis(900);
// Header, footer and table borders.
const CHROME_ROWS: u16 = 6;

#[derive(Debug, Clone)]
struct PortForwardExitEvent {
    pid: u32,
    kind: ResourceKind,
    namespace: String,
    name: String,
    local_port: u16,
    remote_port: u16,
    result: std::result::Result<std::process::ExitStatus, String>,
}

/// Background work owned by the UI loop. Only the most recent refresh task is
/// kept; starting a new one aborts the previous.
struct Background {
    refresh_task: Option<JoinHandle<()>>,
    refresh_tx: mpsc::UnboundedSender<RefreshOutcome>,
    watch_task: Option<JoinHandle<()>>,
    watched_kind: ResourceKind,
    watch_tx: mpsc::UnboundedSender<ResourceKind>,
    last_nudge: Option<Instant>,
    pf_tx: mpsc::UnboundedSender<PortForwardExitEvent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let gateway = KubeGateway::new().await?;
    let namespace_scope = resolve_namespace_scope(&args, &gateway);

    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
        namespace_scope,
    );

    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }

    let mut config = RuntimeConfigWatcher::discover();
    let mut refresh_ms = refresh_interval(args.refresh_ms, None);
    let config_error = match config.load_current() {
        Ok(snapshot) => {
            refresh_ms = refresh_interval(args.refresh_ms, snapshot.refresh_ms);
            app.apply_config(snapshot);
            None
        }
        Err(error) => {
            warn!("runtime config load failed: {error:#}");
            Some(compact_error(&error))
        }
    };

    app.execute_command_line(&args.command);
    if app.history_depth() == 0 {
        warn!(command = %args.command, "initial command not recognised, opening pods");
        app.execute_command_line(ResourceKind::Pods.command());
    }
    if let Some(error) = config_error {
        app.set_status(format!("Config load failed: {error}"));
    }

    run(&mut app, &gateway, &mut config, args.refresh_ms, refresh_ms).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

fn resolve_namespace_scope(args: &CliArgs, gateway: &KubeGateway) -> NamespaceScope {
    if args.all_namespaces {
        NamespaceScope::All
    } else if let Some(namespace) = &args.namespace {
        NamespaceScope::parse(namespace)
    } else {
        NamespaceScope::Named(gateway.default_namespace().to_string())
    }
}

async fn run(
    app: &mut App,
    gateway: &KubeGateway,
    config: &mut RuntimeConfigWatcher,
    cli_refresh_ms: u64,
    refresh_ms: u64,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(
        &mut terminal,
        app,
        gateway,
        config,
        cli_refresh_ms,
        refresh_ms,
    )
    .await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn refresh_ticker(refresh_ms: u64) -> Interval {
    let mut ticker = interval(Duration::from_millis(refresh_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &KubeGateway,
    config: &mut RuntimeConfigWatcher,
    cli_refresh_ms: u64,
    mut refresh_ms: u64,
) -> Result<()> {
    let mut reader = EventStream::new();
    let mut ticker = refresh_ticker(refresh_ms);
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel::<RefreshOutcome>();
    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel::<ResourceKind>();
    let (pf_tx, mut pf_rx) = mpsc::unbounded_channel::<PortForwardExitEvent>();
    let mut background = Background {
        refresh_task: None,
        refresh_tx,
        watch_task: start_watcher(gateway.client(), app.kind(), watch_tx.clone()),
        watched_kind: app.kind(),
        watch_tx,
        last_nudge: None,
        pf_tx,
    };
    spawn_refresh(&mut background, gateway, app.refresh_request());

    loop {
        if let Ok(size) = terminal.size() {
            app.set_page_size(usize::from(size.height.saturating_sub(CHROME_ROWS)));
        }
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        let mut reschedule = None;
        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = app.action_for_key(key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            execute_app_command(app, gateway, command, &mut background).await;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                match config.reload_if_changed() {
                    Ok(Some(snapshot)) => {
                        let configured = refresh_interval(cli_refresh_ms, snapshot.refresh_ms);
                        if configured != refresh_ms {
                            reschedule = Some(configured);
                        }
                        app.apply_config(snapshot);
                        match config.source() {
                            Some(path) => app.set_status(format!(
                                "Reloaded runtime config from {}",
                                path.display()
                            )),
                            None => app.set_status("Runtime config removed, using defaults"),
                        }
                    }
                    Ok(None) => {}
                    Err(error) => {
                        warn!("runtime config reload failed: {error:#}");
                        app.set_status(format!("Config reload failed: {}", compact_error(&error)));
                    }
                }
                if !refresh_in_flight(&background) {
                    spawn_refresh(&mut background, gateway, app.refresh_request());
                }
            }
            maybe_outcome = refresh_rx.recv() => {
                if let Some(outcome) = maybe_outcome {
                    app.apply_refresh(outcome);
                }
            }
            maybe_kind = watch_rx.recv() => {
                if let Some(kind) = maybe_kind
                    && kind == app.kind()
                    && should_process_watch_event(&mut background.last_nudge)
                    && !refresh_in_flight(&background)
                {
                    spawn_refresh(&mut background, gateway, app.refresh_request());
                }
            }
            maybe_event = pf_rx.recv() => {
                if let Some(event) = maybe_event {
                    handle_port_forward_exit(app, event);
                }
            }
        }

        if let Some(configured) = reschedule {
            info!(refresh_ms = configured, "refresh interval changed");
            refresh_ms = configured;
            ticker = refresh_ticker(refresh_ms);
        }
        if background.watched_kind != app.kind() {
            restart_watcher(&mut background, gateway.client(), app.kind());
        }
    }

    if let Some(task) = background.refresh_task.take() {
        task.abort();
    }
    if let Some(task) = background.watch_task.take() {
        task.abort();
    }
    Ok(())
}

async fn execute_app_command(
    app: &mut App,
    gateway: &KubeGateway,
    command: AppCommand,
    background: &mut Background,
) {
    match command {
        AppCommand::None | AppCommand::Quit => {}
        AppCommand::Refresh => spawn_refresh(background, gateway, app.refresh_request()),
        AppCommand::StartPortForward {
            kind,
            namespace,
            name,
            key,
            local_port,
            remote_port,
        } => match run_kubectl_port_forward(kind, &namespace, &name, local_port, remote_port).await
        {
            Ok((pid, mut child)) => {
                app.register_port_forward(PortForwardSession {
                    key,
                    kind,
                    namespace: namespace.clone(),
                    name: name.clone(),
                    local_port,
                    remote_port,
                    pid,
                });
                app.set_status(format!(
                    "Port-forward started ({}) {local_port}:{remote_port} pid={pid}",
                    port_forward_target(kind, &name)
                ));

                let tx = background.pf_tx.clone();
                tokio::spawn(async move {
                    let result = child
                        .wait()
                        .await
                        .map_err(|error| format!("wait failed: {error}"));
                    let _ = tx.send(PortForwardExitEvent {
                        pid,
                        kind,
                        namespace,
                        name,
                        local_port,
                        remote_port,
                        result,
                    });
                });
            }
            Err(error) => app.set_status(format!(
                "Port-forward failed for {} {}/{}: {}",
                kind.title(),
                namespace,
                name,
                compact_error(&error)
            )),
        },
    }
}

fn handle_port_forward_exit(app: &mut App, event: PortForwardExitEvent) {
    let removed = app.remove_port_forward_by_pid(event.pid);
    let target = format!(
        "{} {}/{} {}:{}",
        event.kind.title(),
        event.namespace,
        event.name,
        event.local_port,
        event.remote_port
    );
    match event.result {
        Ok(status) if status.success() => {
            if removed.is_some() {
                app.set_status(format!("Port-forward closed: {target}"));
            }
        }
        Ok(status) => {
            warn!(pid = event.pid, %status, "port-forward exited");
            app.set_status(format!("Port-forward exited ({status}) for {target}"));
        }
        Err(error) => {
            warn!(pid = event.pid, %error, "port-forward failed");
            app.set_status(format!("Port-forward failed for {target}: {error}"));
        }
    }
}

fn refresh_in_flight(background: &Background) -> bool {
    background
        .refresh_task
        .as_ref()
        .is_some_and(|task| !task.is_finished())
}

fn spawn_refresh(
    background: &mut Background,
    gateway: &KubeGateway,
    request: Option<RefreshRequest>,
) {
    if let Some(task) = background.refresh_task.take() {
        task.abort();
    }
    let Some(request) = request else {
        return;
    };

    let gateway = gateway.clone();
    let tx = background.refresh_tx.clone();
    background.refresh_task = Some(tokio::spawn(async move {
        let result = match timeout(
            TABLE_REFRESH_TIMEOUT,
            gateway.fetch_table(request.kind, &request.scope),
        )
        .await
        {
            Ok(Ok(table)) => Ok(table),
            Ok(Err(error)) => Err(compact_error(&error)),
            Err(_) => Err(format!(
                "refresh timed out after {}s (showing cached data)",
                TABLE_REFRESH_TIMEOUT.as_secs()
            )),
        };
        let _ = tx.send(RefreshOutcome {
            generation: request.generation,
            kind: request.kind,
            scope: request.scope,
            result,
        });
    }));
}

fn port_forward_target(kind: ResourceKind, name: &str) -> String {
    match kind {
        ResourceKind::Services => format!("service/{name}"),
        _ => format!("pod/{name}"),
    }
}

async fn run_kubectl_port_forward(
    kind: ResourceKind,
    namespace: &str,
    name: &str,
    local_port: u16,
    remote_port: u16,
) -> Result<(u32, tokio::process::Child)> {
    if !matches!(kind, ResourceKind::Pods | ResourceKind::Services) {
        anyhow::bail!("port-forward only supports pods and services");
    }
    let target = port_forward_target(kind, name);

    let child = TokioCommand::new("kubectl")
        .arg("port-forward")
        .arg("-n")
        .arg(namespace)
        .arg(&target)
        .arg(format!("{local_port}:{remote_port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn port-forward for {namespace}/{target}"))?;

    let pid = child
        .id()
        .context("failed to determine process id for kubectl port-forward")?;

    Ok((pid, child))
}

fn should_process_watch_event(last_nudge: &mut Option<Instant>) -> bool {
    let now = Instant::now();
    match last_nudge {
        Some(last) if now.duration_since(*last) < WATCH_NUDGE_INTERVAL => false,
        _ => {
            *last_nudge = Some(now);
            true
        }
    }
}

fn restart_watcher(background: &mut Background, client: Client, kind: ResourceKind) {
    if let Some(task) = background.watch_task.take() {
        task.abort();
    }
    background.watch_task = start_watcher(client, kind, background.watch_tx.clone());
    background.watched_kind = kind;
    background.last_nudge = None;
    debug!(kind = kind.title(), "restarted watcher");
}

/// Watches the kind on screen so that changes refresh the table ahead of the
/// next tick. Locally built kinds have nothing to watch.
fn start_watcher(
    client: Client,
    kind: ResourceKind,
    tx: mpsc::UnboundedSender<ResourceKind>,
) -> Option<JoinHandle<()>> {
    let task = match kind {
        ResourceKind::Pods => spawn_watch_task::<Pod>(client, kind, tx),
        ResourceKind::Deployments => spawn_watch_task::<Deployment>(client, kind, tx),
        ResourceKind::StatefulSets => spawn_watch_task::<StatefulSet>(client, kind, tx),
        ResourceKind::Services => spawn_watch_task::<Service>(client, kind, tx),
        ResourceKind::ConfigMaps => spawn_watch_task::<ConfigMap>(client, kind, tx),
        ResourceKind::Events => spawn_watch_task::<KubeEvent>(client, kind, tx),
        ResourceKind::Nodes => spawn_watch_task::<Node>(client, kind, tx),
        ResourceKind::Namespaces => spawn_watch_task::<Namespace>(client, kind, tx),
        ResourceKind::Aliases => return None,
    };
    Some(task)
}

fn spawn_watch_task<K>(
    client: Client,
    kind: ResourceKind,
    tx: mpsc::UnboundedSender<ResourceKind>,
) -> JoinHandle<()>
where
    K: Clone + std::fmt::Debug + serde::de::DeserializeOwned + kube::Resource + Send + 'static,
    <K as kube::Resource>::DynamicType: Default + Eq + std::hash::Hash + Clone + Send,
{
    tokio::spawn(async move {
        loop {
            let api: Api<K> = Api::all(client.clone());
            let mut events = watcher(api, WatchConfig::default()).boxed();
            loop {
                match events.try_next().await {
                    Ok(Some(_)) => {
                        if tx.send(kind).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!("watch stream error for {}: {error}", kind.title());
                        break;
                    }
                }
            }
            tokio::time::sleep(WATCH_RETRY_DELAY).await;
        }
    })
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{compact_error, should_process_watch_event};
    use anyhow::anyhow;
    use std::time::Instant;

    #[test]
    fn compact_error_keeps_two_causes() {
        let error = anyhow!("root")
            .context("middle")
            .context("outer")
            .context("top");
        assert_eq!(
            compact_error(&error),
            "top\ncaused by: outer\ncaused by: middle"
        );
    }

    #[test]
    fn watch_nudges_are_throttled() {
        let mut last = None;
        assert!(should_process_watch_event(&mut last));
        assert!(!should_process_watch_event(&mut last));

        let mut stale = Some(Instant::now() - std::time::Duration::from_secs(1));
        assert!(should_process_watch_event(&mut stale));
    }
}
