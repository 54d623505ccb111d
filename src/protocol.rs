use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::translate::{Command, SwitchCommand};
use crate::types::DeviceReading;
use crate::{Error, Result};

pub const STATUS_ERR: &str = "ERR";

/// Which `json.htm` query reads a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStyle {
    /// `type=devices&rid=N` (Domoticz before 2023.2)
    #[default]
    Devices,
    /// `type=command&param=getdevices&rid=N`
    GetDevices,
}

/// Top-level JSON object every `json.htm` call returns.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<Vec<Value>>,
}

pub fn base_url(api_address: &str, port: &str) -> String {
    let address = api_address.trim().trim_end_matches('/');
    let address = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let port = port.trim();
    if port.is_empty() {
        address
    } else {
        format!("{address}:{port}")
    }
}

pub fn read_device_path(idx: u32, style: EndpointStyle) -> String {
    match style {
        EndpointStyle::Devices => format!("/json.htm?type=devices&rid={idx}"),
        EndpointStyle::GetDevices => {
            format!("/json.htm?type=command&param=getdevices&rid={idx}")
        }
    }
}

/// Path and query for a command. The space in `Set Level` is sent as `%20`.
pub fn command_path(command: &Command) -> String {
    match command {
        Command::SwitchLight { idx, cmd } => {
            let switchcmd = match cmd {
                SwitchCommand::Off => "Off".to_string(),
                SwitchCommand::On => "On".to_string(),
                SwitchCommand::SetLevel(level) => format!("Set%20Level&level={level}"),
            };
            format!("/json.htm?type=command&param=switchlight&idx={idx}&switchcmd={switchcmd}")
        }
        Command::SetSetpoint { idx, setpoint } => {
            format!("/json.htm?type=command&param=setsetpoint&idx={idx}&setpoint={setpoint}")
        }
    }
}

pub fn parse_envelope(body: &str) -> Result<Envelope> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("invalid JSON envelope: {e}")))?;
    if envelope.status == STATUS_ERR {
        return Err(Error::Rejected {
            title: envelope.title.unwrap_or_default(),
            message: envelope.message.unwrap_or_default(),
        });
    }
    Ok(envelope)
}

pub fn parse_device_reading(idx: u32, envelope: &Envelope) -> Result<DeviceReading> {
    let device = envelope
        .result
        .as_ref()
        .and_then(|r| r.first())
        .ok_or(Error::MissingResult { idx })?;
    if !device.is_object() {
        return Err(Error::Protocol(format!("result[0] for idx {idx} is not an object")));
    }

    Ok(DeviceReading {
        idx,
        name: device.get("Name").and_then(|v| v.as_str()).map(str::to_string),
        level: device.get("Level").and_then(lenient_i64),
        status: device.get("Status").and_then(|v| v.as_str()).map(str::to_string),
        temperature: device.get("Temp").and_then(lenient_f64),
        set_point: device.get("SetPoint").and_then(lenient_f64),
    })
}

// Domoticz sends some numeric fields as strings ("SetPoint": "21.50").
fn lenient_f64(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn lenient_i64(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}
