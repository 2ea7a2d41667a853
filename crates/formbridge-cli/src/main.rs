//! Command-line front end for the FormBridge integration core.

use std::path::PathBuf;

use anyhow::{bail, Context};
use formbridge_core::SettingsMap;
use formbridge_integrations::service::{
    SaveSettingsRequest, SettingsType, TestConnectionRequest,
};
use formbridge_store::LogFilter;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("FORMBRIDGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// `key=value` pairs into a settings map. Values that parse as JSON keep
/// their type, anything else is taken as a string.
fn parse_pairs(args: &[String]) -> anyhow::Result<SettingsMap> {
    let mut map = SettingsMap::new();
    for arg in args {
        let (key, raw) = arg
            .split_once('=')
            .with_context(|| format!("Expected key=value, got {:?}", arg))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], idx: usize, what: &str) -> anyhow::Result<Option<T>> {
    match args.get(idx) {
        None => Ok(None),
        Some(raw) => match raw.parse() {
            Ok(v) => Ok(Some(v)),
            Err(_) => bail!("Invalid {}: {}", what, raw),
        },
    }
}

fn print_help() {
    println!("FormBridge: form submission integrations");
    println!();
    println!("Usage: formbridge <command> [args]");
    println!();
    println!("Commands:");
    println!("  list                              List registered integrations");
    println!("  test <id> [key=value...]          Test credentials against the platform");
    println!("  configure <id> [key=value...]     Save global settings");
    println!("  configure-form <id> <form> [k=v]  Save per-form settings");
    println!("  submit <submission> [key=value]   Dispatch a submission (needs form_id=)");
    println!("  logs [id] [limit]                 Show recent activity");
    println!("  stats <id> [days]                 Activity counts by status");
    println!("  prune-logs                        Delete entries past retention");
    println!("  help                              Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    if matches!(command, "--help" | "-h" | "help") {
        print_help();
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = formbridge_core::FormBridgeConfig::from_env(&data_dir)?;
    let store = formbridge_store::SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    let state = AppState::new(&config, store);

    match command {
        "list" => print_json(&state.service.list_integrations())?,
        "test" => {
            let Some(id) = args.get(2) else {
                bail!("Usage: formbridge test <id> [key=value...]");
            };
            let resp = state
                .service
                .test_connection(TestConnectionRequest {
                    integration_id: id.clone(),
                    credentials: parse_pairs(&args[3..])?,
                })
                .await;
            print_json(&resp)?;
            if !resp.success {
                std::process::exit(1);
            }
        }
        "configure" | "configure-form" => {
            let form = command == "configure-form";
            let Some(id) = args.get(2) else {
                bail!("Usage: formbridge {} <id> ...", command);
            };
            let (form_id, rest) = if form {
                (parse_arg::<i64>(&args, 3, "form id")?, args.get(4..).unwrap_or_default())
            } else {
                (None, &args[3..])
            };
            let resp = state.service.save_settings(SaveSettingsRequest {
                integration_id: id.clone(),
                settings_type: if form { SettingsType::Form } else { SettingsType::Global },
                form_id,
                settings: parse_pairs(rest)?,
            });
            print_json(&resp)?;
            if !resp.success {
                std::process::exit(1);
            }
        }
        "submit" => {
            let Some(submission_id) = parse_arg::<i64>(&args, 2, "submission id")? else {
                bail!("Usage: formbridge submit <submission-id> form_id=<id> [key=value...]");
            };
            let report = state
                .service
                .handle_submission(submission_id, parse_pairs(&args[3..])?)
                .await?;
            print_json(&report)?;
        }
        "logs" => {
            // A numeric first argument is the limit.
            let (filter, limit_idx) = match args.get(2) {
                Some(id) if id.parse::<usize>().is_err() => (LogFilter::for_integration(id), 3),
                _ => (LogFilter::default(), 2),
            };
            let limit = parse_arg(&args, limit_idx, "limit")?.unwrap_or(20);
            print_json(&state.logger.get_logs(&filter, limit, 0)?)?;
        }
        "stats" => {
            let Some(id) = args.get(2) else {
                bail!("Usage: formbridge stats <id> [days]");
            };
            let days = parse_arg(&args, 3, "days")?.unwrap_or(30);
            print_json(&state.logger.get_stats(id, days)?)?;
        }
        "prune-logs" => {
            let removed = state.logger.clear_old_logs()?;
            println!(
                "Removed {} entries older than {} days (as of {})",
                removed,
                state.logger.retention_days(),
                chrono::Utc::now().format("%Y-%m-%d")
            );
        }
        other => {
            eprintln!("Unknown command: {}. Use 'formbridge help' for usage.", other);
            std::process::exit(1);
        }
    }

    Ok(())
}
