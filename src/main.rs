mod app;
mod config;
mod domain;
mod infrastructure;
mod logging;
mod ui;

use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use crate::app::{App, StatusLevel};
use crate::domain::greeting::{DEFAULT_CONTRACT, DEFAULT_EVENT_SIGNATURE};
use crate::domain::GreetingFilter;
use crate::infrastructure::ethereum::ProviderConfig;
use crate::infrastructure::runtime::{ListenerSettings, RuntimeBridge};

const DEFAULT_RPC: &str = "localhost:8545";

#[derive(Debug, Parser)]
#[command(
    name = "greetform",
    version,
    about = "Greetform: a sign-up form next to a live NewGreeting event feed"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// WebSocket endpoint (e.g. ws://localhost:8546)
    #[arg(long)]
    ws: Option<String>,

    /// IPC path (e.g. ~/.ethereum/geth.ipc). Unix only.
    #[arg(long)]
    ipc: Option<PathBuf>,

    /// Contract emitting the greeting events
    #[arg(long)]
    contract: Option<String>,

    /// Event signature to listen for (e.g. "NewGreeting(bytes32)")
    #[arg(long)]
    event: Option<String>,

    /// Log file (defaults to the data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("warning: {err}; using defaults");
            config::Config::default()
        }
    };

    let log_path = args
        .log_file
        .clone()
        .or_else(config::log_file_path)
        .unwrap_or_else(|| PathBuf::from("greetform.log"));
    if let Err(err) = logging::init(&log_path, logging::DEFAULT_LEVEL) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let settings = listener_settings(&args, &config)?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();
    app.rpc_endpoint = settings.endpoint.display();
    app.filter = settings.filter.clone();
    app.set_status("Connecting…", StatusLevel::Info);

    let res = RuntimeBridge::new(settings).and_then(|runtime| run_app(&mut terminal, app, runtime));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    mut runtime: RuntimeBridge,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        pump_background(&mut app, &runtime);
        terminal.draw(|f| ui::draw(f, &app))?;
        if app.should_quit {
            runtime.shutdown();
            app.mark_stopped();
            info!(listener = %app.listener.label(), "exiting");
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn pump_background(app: &mut App, runtime: &RuntimeBridge) {
    for event in runtime.poll_events() {
        app.apply_runtime_event(event);
    }
}

/// Resolve the listener settings; command line arguments win over the file
fn listener_settings(args: &Args, config: &config::Config) -> Result<ListenerSettings> {
    let listener = &config.listener;
    let endpoint = endpoint_from_args(args)
        .or_else(|| endpoint_from_config(listener))
        .unwrap_or_else(|| ProviderConfig::Http(normalize_http_endpoint(DEFAULT_RPC)));

    let contract = match non_empty(args.contract.as_deref()).or(non_empty(listener.contract.as_deref()))
    {
        Some(raw) => {
            Address::from_str(raw).with_context(|| format!("invalid contract address {raw:?}"))?
        }
        None => DEFAULT_CONTRACT,
    };
    let signature = non_empty(args.event.as_deref())
        .or(non_empty(listener.event.as_deref()))
        .unwrap_or(DEFAULT_EVENT_SIGNATURE);
    if !is_event_signature(signature) {
        bail!("invalid event signature {signature:?}, expected e.g. \"NewGreeting(bytes32)\"");
    }

    let mut settings = ListenerSettings::new(endpoint, GreetingFilter::new(contract, signature));
    if let Some(ms) = listener.poll_interval_ms {
        settings.poll_interval = Duration::from_millis(ms.max(1));
    }
    if let Some(ms) = listener.request_timeout_ms {
        settings.request_timeout = Duration::from_millis(ms.max(1));
    }
    if let Some(ms) = listener.retry_initial_ms {
        settings.retry_initial = Duration::from_millis(ms.max(1));
    }
    if let Some(ms) = listener.retry_max_ms {
        settings.retry_max = Duration::from_millis(ms.max(1));
    }
    if settings.retry_max < settings.retry_initial {
        warn!("retry_max_ms is below retry_initial_ms, raising it");
        settings.retry_max = settings.retry_initial;
    }
    Ok(settings)
}

fn endpoint_from_args(args: &Args) -> Option<ProviderConfig> {
    #[cfg(unix)]
    {
        if let Some(ipc) = args.ipc.as_ref().and_then(|p| expand_path(&p.to_string_lossy())) {
            return Some(ProviderConfig::Ipc(ipc));
        }
    }
    if let Some(ws) = non_empty(args.ws.as_deref()) {
        return Some(ProviderConfig::WebSocket(ws.to_string()));
    }
    non_empty(args.rpc.as_deref()).map(|rpc| ProviderConfig::Http(normalize_http_endpoint(rpc)))
}

fn endpoint_from_config(listener: &config::ListenerConfig) -> Option<ProviderConfig> {
    #[cfg(unix)]
    {
        if let Some(ipc) = non_empty(listener.ipc.as_deref()).and_then(expand_path) {
            return Some(ProviderConfig::Ipc(ipc));
        }
    }
    if let Some(ws) = non_empty(listener.ws.as_deref()) {
        return Some(ProviderConfig::WebSocket(ws.to_string()));
    }
    non_empty(listener.rpc.as_deref())
        .map(|rpc| ProviderConfig::Http(normalize_http_endpoint(rpc)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn is_event_signature(signature: &str) -> bool {
    match signature.split_once('(') {
        Some((name, rest)) => !name.is_empty() && rest.ends_with(')'),
        None => false,
    }
}

fn normalize_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn expand_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return Some(home.join(rest));
        }
    }

    let mut buf = PathBuf::from(trimmed);
    if buf.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            buf = cwd.join(buf);
        }
    }
    Some(buf)
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('s') => app.submit(),
            _ => {}
        }
        return;
    }

    if app.help_open {
        if matches!(key.code, KeyCode::F(1) | KeyCode::Esc) {
            app.help_open = false;
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::F(1) => app.help_open = true,
        KeyCode::Tab | KeyCode::Down => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.focus_prev(),
        KeyCode::Enter => app.activate(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Char(c) => app.input_char(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Focus;
    use crate::domain::Field;

    fn args(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("greetform").chain(extra.iter().copied()))
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_defaults() {
        let settings = listener_settings(&args(&[]), &config::Config::default()).unwrap();
        assert_eq!(
            settings.endpoint,
            ProviderConfig::Http("http://localhost:8545".into())
        );
        assert_eq!(settings.filter.address(), DEFAULT_CONTRACT);
        assert_eq!(settings.filter.signature(), "NewGreeting(bytes32)");
        assert_eq!(settings.poll_interval, Duration::from_millis(1_000));
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = config::Config::default();
        config.listener.rpc = Some("10.0.0.1:8545".into());
        config.listener.contract = Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".into());
        config.listener.poll_interval_ms = Some(250);

        let settings = listener_settings(&args(&[]), &config).unwrap();
        assert_eq!(
            settings.endpoint,
            ProviderConfig::Http("http://10.0.0.1:8545".into())
        );
        assert_eq!(settings.poll_interval, Duration::from_millis(250));

        let settings = listener_settings(
            &args(&[
                "--ws",
                "ws://127.0.0.1:8546",
                "--contract",
                "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
                "--event",
                "GreetingChanged(bytes32)",
            ]),
            &config,
        )
        .unwrap();
        assert_eq!(
            settings.endpoint,
            ProviderConfig::WebSocket("ws://127.0.0.1:8546".into())
        );
        assert_eq!(settings.filter.address(), DEFAULT_CONTRACT);
        assert_eq!(settings.filter.signature(), "GreetingChanged(bytes32)");
    }

    #[test]
    fn test_rejects_bad_contract_and_event() {
        let config = config::Config::default();
        assert!(listener_settings(&args(&["--contract", "0x1234"]), &config).is_err());
        assert!(listener_settings(&args(&["--event", "NewGreeting"]), &config).is_err());
    }

    #[test]
    fn test_retry_max_never_below_initial() {
        let mut config = config::Config::default();
        config.listener.retry_initial_ms = Some(2_000);
        config.listener.retry_max_ms = Some(100);
        let settings = listener_settings(&args(&[]), &config).unwrap();
        assert_eq!(settings.retry_max, Duration::from_millis(2_000));
    }

    #[test]
    fn test_normalize_http_endpoint() {
        assert_eq!(normalize_http_endpoint("localhost:8545"), "http://localhost:8545");
        assert_eq!(normalize_http_endpoint(" https://rpc.example "), "https://rpc.example");
    }

    #[test]
    fn test_keys_drive_the_form() {
        let mut app = App::new();
        press(&mut app, KeyCode::Char('A'));
        press(&mut app, KeyCode::Char('l'));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Field(Field::Age));
        assert_eq!(app.form.value(Field::Name), "Al");

        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.form.value(Field::Name), "A");

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(app.last_submission.is_none());
        assert_eq!(app.status_text().map(|(_, level)| level), Some(StatusLevel::Warn));

        press(&mut app, KeyCode::F(1));
        assert!(app.help_open);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.form.value(Field::Name), "A");
        press(&mut app, KeyCode::Esc);
        assert!(!app.help_open);
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }
}
