//! gatekeep - a command-line host for the gatekeep session layer.
//!
//! Restores any persisted session, runs one session operation, and prints
//! the notifications and navigation requests it produced.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use gatekeep_core::events::{AppEvent, EventChannel, ToastKind, UiEvent};
use gatekeep_core::storage::open_store;
use gatekeep_core::{Config, MultipartBody, SessionStore};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: gatekeep <command> [args]

Commands:
  login [email]                 Log in (password is prompted)
  register <json>               Submit a registration payload
  logout                        End the session
  status                        Show the current session
  profile                       Fetch and print the profile
  change-password               Change password (prompted)
  update-profile <json>         Update profile fields
  update-settings <field=value|field=@file>...
                                Update general settings (multipart)";

/// Initialize the tracing subscriber for logging.
/// `RUST_LOG` controls the level; `GATEKEEP_LOG_DIR` adds a daily log file.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var("GATEKEEP_LOG_DIR") {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "gatekeep.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;
    let store = open_store(&config)?;
    let (events, mut rx) = EventChannel::new();
    let events = Arc::new(events);
    let session = SessionStore::new(&config, store, events.clone(), events)
        .context("Failed to set up session")?;

    if session.restore() {
        info!("Resumed previous session");
    }

    let result = run(&session, command, &args[1..]).await;
    print_events(&mut rx);
    result
}

async fn run(session: &SessionStore, command: &str, args: &[String]) -> Result<()> {
    match command {
        "login" => {
            let email = match args.first() {
                Some(email) => email.clone(),
                None => prompt_line("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            session
                .authenticate(&json!({ "email": email, "password": password }))
                .await?;
        }
        "register" => {
            let payload = parse_json_arg(args)?;
            let response = session.register(&payload).await?;
            if let Some(body) = response.as_json() {
                println!("{}", serde_json::to_string_pretty(body)?);
            }
        }
        "logout" => session.sign_out(),
        "status" => {
            let state = session.snapshot();
            let status = json!({
                "authenticated": state.is_authenticated(),
                "profile": state.profile(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        "profile" => {
            let profile = session.fetch_profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        "change-password" => {
            let old_password = rpassword::prompt_password("Current password: ")?;
            let new_password = rpassword::prompt_password("New password: ")?;
            session
                .change_password(&json!({
                    "oldPassword": old_password,
                    "newPassword": new_password,
                }))
                .await?;
        }
        "update-profile" => {
            let payload = parse_json_arg(args)?;
            session.update_profile_settings(&payload).await?;
        }
        "update-settings" => {
            let settings = parse_settings(args)?;
            session.update_general_settings(settings).await?;
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn parse_json_arg(args: &[String]) -> Result<Value> {
    let raw = args.first().context("Expected a JSON payload argument")?;
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON payload: {}", raw))
}

/// Build a multipart body from `field=value` and `field=@path` arguments.
fn parse_settings(args: &[String]) -> Result<MultipartBody> {
    if args.is_empty() {
        bail!("Expected at least one field=value argument");
    }

    let mut body = MultipartBody::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .with_context(|| format!("Expected field=value, got '{}'", arg))?;
        body = match value.strip_prefix('@') {
            Some(file) => {
                let path = Path::new(file);
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.to_string());
                body.file(name, file_name, content_type_for(path), bytes)
            }
            None => body.text(name, value),
        };
    }
    Ok(body)
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn print_events(rx: &mut UnboundedReceiver<AppEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            AppEvent::Ui(UiEvent::AddToast(toast)) => {
                let tag = match toast.kind {
                    ToastKind::Success => "success",
                    ToastKind::Danger => "danger",
                };
                eprintln!("[{}] {}", tag, toast.content);
            }
            AppEvent::Ui(UiEvent::HideLoading) => {}
            AppEvent::Navigate(route) => eprintln!("→ {}", route.name()),
        }
    }
}
