use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{info, warn};

use hue_api::{create_app_key, BridgeClient, DemoBridge, HueBridge};
use hue_state::{
    init_logging, init_logging_from_env, LoggingMode, Message, Reconciler, ReconcilerConfig,
    ReconcilerHandle,
};
use hue_stream::{BridgeEventSource, EventSubscription, StreamConfig};

pub mod app;
pub mod config;
pub mod ui;

use app::App;
use config::{BridgeConfig, Config};

/// Name registered with the bridge when pairing
const APP_NAME: &str = "hue-tui";

/// How long to wait for the link button
const PAIRING_TIMEOUT: Duration = Duration::from_secs(30);

/// Frame interval for input polling and redraws
const TICK: Duration = Duration::from_millis(16);

/// Terminal dashboard for Philips Hue lights
///
/// Connects to the last used bridge from the saved config unless a host
/// and key are given. Pair once with `--host <ip> --pair`.
#[derive(Parser, Debug)]
#[command(name = "hue")]
#[command(about = "Terminal dashboard for Philips Hue lights")]
#[command(version)]
pub struct Args {
    /// Bridge address (IP or hostname)
    #[arg(long)]
    pub host: Option<String>,

    /// Application key; looked up in the saved config when omitted
    #[arg(long)]
    pub app_key: Option<String>,

    /// Use the built-in demo bridge (also enabled by HUE_DEMO)
    #[arg(long)]
    pub demo: bool,

    /// Pair with the bridge at --host; press its link button first
    #[arg(long, requires = "host")]
    pub pair: bool,

    /// Logging mode: silent, file, development or debug
    ///
    /// Defaults to HUE_LOG_MODE, then silent.
    #[arg(long)]
    pub log_mode: Option<LoggingMode>,
}

impl Args {
    fn demo_requested(&self) -> bool {
        self.demo || std::env::var("HUE_DEMO").map(|v| !v.is_empty()).unwrap_or(false)
    }
}

/// Which bridge the dashboard talks to
enum Target {
    Demo,
    Bridge(BridgeConfig),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.log_mode {
        Some(mode) => init_logging(mode),
        None => init_logging_from_env(),
    }
    .context("Failed to initialize logging")?;

    let target = resolve_target(&args).await?;
    run(target).await
}

async fn resolve_target(args: &Args) -> Result<Target> {
    if args.demo_requested() {
        return Ok(Target::Demo);
    }

    let mut config = Config::load().context("Failed to load config")?;

    if args.pair {
        let host = args.host.clone().context("--pair needs --host")?;
        let bridge = pair(&host).await?;
        config.add_bridge(bridge.clone());
        config.last_bridge_id = Some(bridge.bridge_id.clone());
        config.save().context("Failed to save config")?;
        return Ok(Target::Bridge(bridge));
    }

    match (&args.host, &args.app_key) {
        (Some(host), Some(key)) => Ok(Target::Bridge(BridgeConfig {
            host: host.clone(),
            username: key.clone(),
            bridge_id: host.clone(),
        })),
        (Some(host), None) => match config.bridges.iter().find(|b| &b.host == host) {
            Some(bridge) => Ok(Target::Bridge(bridge.clone())),
            None => bail!("No app key saved for {}. Run `hue --host {} --pair`.", host, host),
        },
        (None, _) => match config.last_bridge() {
            Ok(bridge) => Ok(Target::Bridge(bridge.clone())),
            Err(_) => bail!("No bridge configured. Run `hue --host <ip> --pair` or `hue --demo`."),
        },
    }
}

async fn pair(host: &str) -> Result<BridgeConfig> {
    println!("Press the link button on the bridge at {}...", host);
    let key = create_app_key(host, APP_NAME, PAIRING_TIMEOUT)
        .await
        .context("Pairing failed")?;
    println!("Paired with {}", host);
    info!("paired with bridge at {}", host);

    // Without discovery the host doubles as the bridge id
    Ok(BridgeConfig {
        host: host.to_string(),
        username: key.username,
        bridge_id: host.to_string(),
    })
}

async fn run(target: Target) -> Result<()> {
    let (client, label, mut subscription, events) = match target {
        Target::Demo => {
            let client: Arc<dyn BridgeClient> = Arc::new(DemoBridge::new());
            (client, "demo".to_string(), None, None)
        }
        Target::Bridge(bridge) => {
            let client = HueBridge::new(&bridge.host, &bridge.username, &bridge.bridge_id)
                .context("Invalid bridge address")?;
            let (mut subscription, events) = EventSubscription::new(
                BridgeEventSource::new(client.clone()),
                StreamConfig::default(),
            )?;
            subscription.start();
            let client: Arc<dyn BridgeClient> = Arc::new(client);
            (client, bridge.host, Some(subscription), Some(events))
        }
    };

    let (reconciler, handle) = Reconciler::new(client, ReconcilerConfig::default());
    let reconciler = reconciler.with_span(tracing::info_span!("reconciler", bridge = %label));
    let reconciler_task = tokio::spawn(reconciler.run(events));
    handle.send(Message::Refresh).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut App::new(), &handle, &label).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = handle.shutdown().await {
        warn!("reconciler already stopped: {}", e);
    }
    if let Some(subscription) = subscription.as_mut() {
        subscription.stop().await;
    }
    if let Err(e) = reconciler_task.await {
        warn!("reconciler task failed: {}", e);
    }

    result
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    handle: &ReconcilerHandle,
    bridge: &str,
) -> Result<()> {
    let mut state = handle.subscribe();
    let mut redraw = true;

    loop {
        let dashboard = match state.has_changed() {
            Ok(true) => {
                redraw = true;
                Arc::clone(&state.borrow_and_update())
            }
            Ok(false) => Arc::clone(&state.borrow()),
            Err(_) => bail!("Reconciler stopped unexpectedly"),
        };

        // Non-blocking input with a frame-length timeout
        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        break;
                    }
                    for message in app.handle_key(key.code, &dashboard.store) {
                        if let Err(e) = handle.try_send(message) {
                            warn!("dropped input: {}", e);
                        }
                    }
                    redraw = true;
                }
            }
        }

        if app.should_quit() {
            break;
        }

        if redraw {
            terminal.draw(|frame| ui::render(frame, app, &dashboard, bridge))?;
            redraw = false;
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}
