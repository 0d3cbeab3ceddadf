//! TabHost: process lifecycle and state persistence core.
//!
//! Protocol: one JSON object per line on stdin/stdout.
//! Request:  {"id":1, "method":"window.open", "params":{...}, "origin":{"window_id":1}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Host event (stdin): {"event":"window_closed", "window_id":1}
//! Host command (stdout): {"command":"window.create", ...}

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info, warn};

use tabhost::app::App;
use tabhost::config::HostConfig;
use tabhost::host::stdio::StdioHost;
use tabhost::host::{ExitStatus, HostEvent};
use tabhost::logging::init_logging;
use tabhost::rpc_handler::handle_method;
use tabhost::types::permission::Origin;

#[derive(Parser, Debug)]
#[command(name = "tabhost", version, about = "Multi-window browser host core")]
struct Args {
    /// Directory holding the state, language and snapshot files
    #[arg(long, value_name = "DIR")]
    profile_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = HostConfig::load().context("failed to load host config")?;
    if let Some(dir) = args.profile_dir {
        config.profile_dir = dir;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    init_logging(&config.log_level);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let status = runtime.block_on(run(config))?;
    info!(?status, "exiting");
    std::process::exit(status.code());
}

async fn run(config: HostConfig) -> Result<ExitStatus> {
    let (tx, mut events) = unbounded_channel();
    let host = StdioHost::new(Box::new(io::stdout()), tx);
    info!(profile = %config.profile_dir.display(), "starting");
    let mut app = App::new(host, config);

    app.host
        .respond(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}))
        .context("failed to signal ready")?;
    if app.startup().is_err() {
        return Ok(ExitStatus::Failure);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if let Some(status) = app.host().exit_status() {
            return Ok(status);
        }
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => handle_line(&mut app, &line),
                    None => {
                        // Shell is gone; no window will confirm a close
                        warn!("stdin closed, saving and exiting");
                        return Ok(app.disconnect());
                    }
                }
            }
            Some(event) = events.recv() => app.handle_event(event),
        }
    }
}

fn handle_line(app: &mut App<StdioHost>, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    let msg: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            respond(app, json!({"id": null, "error": format!("parse error: {}", e)}));
            return;
        }
    };

    if msg.get("event").is_some() {
        match serde_json::from_value::<HostEvent>(msg) {
            Ok(event) => app.handle_event(event),
            Err(e) => warn!("Malformed host event: {}", e),
        }
        return;
    }

    let id = msg.get("id").cloned().unwrap_or(Value::Null);
    let method = msg.get("method").and_then(|v| v.as_str()).unwrap_or("");
    let params = msg.get("params").cloned().unwrap_or(json!({}));
    let origin = msg
        .get("origin")
        .and_then(|o| serde_json::from_value::<Origin>(o.clone()).ok());

    let response = match handle_method(app, origin, method, &params) {
        Ok(val) => json!({"id": id, "result": val}),
        Err(err) => json!({"id": id, "error": err}),
    };
    respond(app, response);
}

fn respond(app: &mut App<StdioHost>, response: Value) {
    if let Err(e) = app.host.respond(&response) {
        error!("Failed to write response: {}", e);
    }
}
