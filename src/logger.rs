use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

/// Which exchanges end up in the message log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageLogMode {
    #[default]
    Full,
    ErrorsOnly,
}

/// One completed request to Domoticz.
pub(crate) struct Exchange<'a> {
    pub id: Uuid,
    pub path: &'a str,
    pub user: Option<&'a str>,
    pub status: Option<u16>,
    pub body: Option<&'a str>,
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_exchange(&mut self, exchange: &Exchange<'_>) {
        if self.mode == MessageLogMode::ErrorsOnly && exchange.error.is_none() {
            return;
        }

        // Bodies are JSON when Domoticz is healthy; keep them structured if so.
        let body = exchange.body.map(|b| {
            serde_json::from_str::<Value>(b).unwrap_or_else(|_| Value::String(b.to_string()))
        });

        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "id": exchange.id.to_string(),
            "path": exchange.path,
            "user": exchange.user,
            "status": exchange.status,
            "elapsed_ms": exchange.elapsed_ms as u64,
            "body": body,
            "error": exchange.error,
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
