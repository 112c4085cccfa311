mod access;
mod attendance;
mod clock;
mod config;
mod db;
mod grid;
mod ipc;
mod prefs;
mod remote;
mod week;

use clock::{Clock, FixedClock, SystemClock};
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::{error, info};

fn main() {
    config::init_logging();

    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            std::process::exit(2);
        }
    };

    let clock: Box<dyn Clock> = match cfg.today {
        Some(today) => Box::new(FixedClock(today)),
        None => Box::new(SystemClock),
    };
    let mut state = ipc::AppState::new(clock);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        today = %state.clock.today(),
        "rollcalld starting"
    );

    if let Some(path) = cfg.workspace {
        if let Err(e) = ipc::select_workspace(&mut state, path) {
            error!("failed to open configured workspace: {e:#}");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, shutting down");
}
