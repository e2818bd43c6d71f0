mod api;
mod app;
mod cli;
mod config;
mod context;
mod endpoint;
mod input;
mod k8s;
mod logs;
mod model;
mod session;
mod socket;
mod surface;
mod ui;
mod ws;

use anyhow::{Context, Result};
use api::{DashboardApi, ResourceQuery};
use app::{App, AppCommand, AppSettings, Launch};
use clap::Parser;
use cli::{CliArgs, Command};
use config::{RuntimeConfigSnapshot, RuntimeConfigWatcher};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use endpoint::Endpoint;
use futures::StreamExt;
use input::KeyContext;
use k8s::KubeDefaults;
use model::{SessionTarget, ViewPreferences};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use ws::{SocketEnvelope, WsConnector};

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const REST_TIMEOUT: Duration = Duration::from_secs(8);
const TICK: Duration = Duration::from_millis(50);
const CONFIG_POLL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let mut watcher = args
        .config
        .clone()
        .map(RuntimeConfigWatcher::at)
        .unwrap_or_else(RuntimeConfigWatcher::discover);
    let config = watcher.load_current()?;
    let server = args
        .server
        .clone()
        .or_else(|| config.server.clone())
        .context("no gateway configured: pass --server or set `server` in kubeterm.yaml")?;
    let endpoint = Endpoint::parse(&server)?;
    let theme = args.theme.or(config.theme).unwrap_or_default();
    info!(
        gateway = endpoint.host(),
        tls = endpoint.is_tls(),
        config = config.source.as_deref().unwrap_or("-"),
        "starting kubeterm"
    );

    let launch = build_launch(args.command, &KubeDefaults::discover());
    run(endpoint, &config, theme, launch, watcher).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder.with_writer(Mutex::new(file)).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

fn build_launch(command: Command, defaults: &KubeDefaults) -> Launch {
    match command {
        Command::Exec(pod) => {
            let (context, namespace) = defaults.resolve(pod.context, pod.namespace);
            Launch::Exec(SessionTarget::exec(context, namespace, pod.pod, pod.container))
        }
        Command::Logs(logs) => {
            let (context, namespace) = defaults.resolve(logs.pod.context, logs.pod.namespace);
            let prefs = ViewPreferences {
                wrap_enabled: logs.wrap,
                show_timestamps: !logs.no_timestamps,
            };
            Launch::Logs {
                target: SessionTarget::logs(
                    context,
                    namespace,
                    logs.pod.pod,
                    logs.pod.container,
                    prefs.show_timestamps,
                ),
                prefs,
            }
        }
        Command::Describe(describe) => {
            let (context, namespace) = defaults.resolve(describe.context, describe.namespace);
            Launch::Describe(ResourceQuery {
                context,
                namespace,
                name: describe.name,
                kind: describe.kind,
            })
        }
    }
}

async fn run(
    endpoint: Endpoint,
    config: &RuntimeConfigSnapshot,
    theme: context::Theme,
    launch: Launch,
    watcher: RuntimeConfigWatcher,
) -> Result<()> {
    let api = DashboardApi::new(endpoint.clone())?;
    let (events_tx, events_rx) = mpsc::unbounded_channel::<SocketEnvelope>();
    let mut app = App::new(
        WsConnector::new(events_tx),
        AppSettings {
            endpoint,
            surface: config.terminal.surface_options(),
            log_viewer: config.terminal.log_viewer(),
        },
        theme,
    );

    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(
        &mut terminal,
        &mut app,
        &api,
        launch,
        events_rx,
        watcher,
        keyboard_enhanced,
    )
    .await;
    app.shutdown();
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
            EnableBracketedPaste,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .context("failed to enter alternate screen")?;
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
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App<WsConnector>,
    api: &DashboardApi,
    launch: Launch,
    mut events_rx: mpsc::UnboundedReceiver<SocketEnvelope>,
    mut watcher: RuntimeConfigWatcher,
    keyboard_enhanced: bool,
) -> Result<()> {
    let size = terminal.size().context("failed to read terminal size")?;
    app.set_viewport(size.width, size.height);
    let command = app.launch(launch, Instant::now());
    execute_app_command(app, api, command).await;

    let mut reader = EventStream::new();
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_config_poll = Instant::now();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key)))
                        if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) =>
                    {
                        let keys = KeyContext {
                            application_cursor: app.application_cursor(),
                            keyboard_enhanced,
                        };
                        if let Some(action) = input::map_key(app.mode(), key, keys) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action, Instant::now());
                            execute_app_command(app, api, command).await;
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        if let Some(action) = input::map_paste(app.mode(), text) {
                            app.apply_action(action, Instant::now());
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        app.set_viewport(width, height);
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
            maybe_envelope = events_rx.recv() => {
                if let Some(envelope) = maybe_envelope {
                    app.handle_socket(envelope);
                    while let Ok(envelope) = events_rx.try_recv() {
                        app.handle_socket(envelope);
                    }
                }
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                app.tick(now);
                if now.duration_since(last_config_poll) >= CONFIG_POLL {
                    last_config_poll = now;
                    match watcher.reload_if_changed() {
                        Ok(Some(snapshot)) => app.apply_config(&snapshot),
                        Ok(None) => {}
                        Err(error) => {
                            warn!(error = %format!("{error:#}"), "config reload failed");
                            app.set_status(format!("Config reload failed: {error:#}"));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

async fn execute_app_command(app: &mut App<WsConnector>, api: &DashboardApi, command: AppCommand) {
    let mut next = command;
    loop {
        next = match next {
            AppCommand::None => return,
            AppCommand::LoadScopes => match timeout(REST_TIMEOUT, api.scopes()).await {
                Ok(Ok(scopes)) => app.set_scopes(scopes),
                Ok(Err(error)) => {
                    app.scopes_failed(&format!("{error:#}"));
                    AppCommand::None
                }
                Err(_) => {
                    app.scopes_failed("timed out");
                    AppCommand::None
                }
            },
            AppCommand::LoadDetails(query) => {
                let result = match timeout(REST_TIMEOUT, api.resource_details(&query)).await {
                    Ok(Ok(details)) => Ok(details),
                    Ok(Err(error)) => Err(format!("{error:#}")),
                    Err(_) => Err("Failed to fetch details: timed out".to_string()),
                };
                if let Err(error) = &result {
                    warn!(kind = %query.kind, name = %query.name, error = %error, "details unavailable");
                }
                app.set_details(&query, result);
                AppCommand::None
            }
        };
    }
}
