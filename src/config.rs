//! Accessory configuration, as found in the host's `config.json`:
//!
//! ```json
//! {
//!   "accessory": "DomoticzThermostat",
//!   "name": "Living room",
//!   "ApiAddress": "http://192.168.1.10",
//!   "port": "8080",
//!   "username": "admin",
//!   "password": "secret",
//!   "CurrentHeatingCoolingStateIDX": 12,
//!   "TargetHeatingCoolingStateIDX": 13,
//!   "CurrentTemperatureIDX": 14,
//!   "TargetTemperatureIDX": 15,
//!   "TargetHeatingCoolingStateMaxValue": "COOL",
//!   "messageLog": "/var/log/domoticz-thermostat.ndjson",
//!   "messageLogMode": "errors-only"
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::accessory::ACCESSORY_NAME;
use crate::gateway::DEFAULT_TIMEOUT;
use crate::logger::MessageLogMode;
use crate::protocol::EndpointStyle;
use crate::translate::max_allowed_target_state;
use crate::types::*;
use crate::{Error, Result};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Domoticz `idx` of each device backing the thermostat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIndices {
    pub current_heating: u32,
    pub target_heating: u32,
    pub current_temperature: u32,
    pub target_temperature: u32,
}

#[derive(Debug, Clone)]
pub struct ThermostatConfig {
    pub name: String,
    pub api_address: String,
    pub port: String,
    pub credentials: Option<Credentials>,
    pub indices: DeviceIndices,
    pub max_target_state: TargetHeatingCoolingState,
    pub endpoint: EndpointStyle,
    pub heating_state_source: HeatingStateSource,
    pub unknown_state_policy: UnknownStatePolicy,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub message_log: Option<String>,
    pub message_log_mode: MessageLogMode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

impl NumberOrString {
    fn into_string(self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::String(s) => s,
        }
    }

    fn into_index(self, field: &str) -> Result<u32> {
        match self {
            NumberOrString::Number(n) => u32::try_from(n)
                .map_err(|_| Error::Config(format!("{field} out of range: {n}"))),
            NumberOrString::String(s) if s.trim().is_empty() => Ok(0),
            NumberOrString::String(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{field} is not a device index: {s:?}"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    name: String,
    #[serde(rename = "ApiAddress")]
    api_address: String,
    #[serde(default)]
    port: Option<NumberOrString>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(rename = "CurrentHeatingCoolingStateIDX", default)]
    current_heating_idx: Option<NumberOrString>,
    #[serde(rename = "TargetHeatingCoolingStateIDX", default)]
    target_heating_idx: Option<NumberOrString>,
    #[serde(rename = "CurrentTemperatureIDX", default)]
    current_temperature_idx: Option<NumberOrString>,
    #[serde(rename = "TargetTemperatureIDX", default)]
    target_temperature_idx: Option<NumberOrString>,
    #[serde(rename = "TargetHeatingCoolingStateMaxValue", default)]
    max_value: Option<String>,
    #[serde(default)]
    endpoint: EndpointStyle,
    #[serde(default)]
    heating_state_source: HeatingStateSource,
    #[serde(default)]
    unknown_state_policy: UnknownStatePolicy,
    /// Seconds.
    #[serde(default)]
    timeout: Option<f64>,
    #[serde(default)]
    accept_invalid_certs: bool,
    #[serde(default)]
    message_log: Option<String>,
    #[serde(default)]
    message_log_mode: MessageLogMode,
}

impl ThermostatConfig {
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawConfig = serde_json::from_value(value)
            .map_err(|e| Error::Config(format!("invalid accessory config: {e}")))?;
        Self::from_raw(raw)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// All `DomoticzThermostat` entries of a host `config.json`.
    pub fn from_host_config_file(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let contents = std::fs::read_to_string(path)?;
        let root: Value = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid host config: {e}")))?;
        let Some(Value::Array(accessories)) = root.get("accessories") else {
            return Ok(Vec::new());
        };
        accessories
            .iter()
            .filter(|a| a.get("accessory").and_then(|v| v.as_str()) == Some(ACCESSORY_NAME))
            .map(|a| Self::from_value(a.clone()))
            .collect()
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        if raw.api_address.trim().is_empty() {
            return Err(Error::Config("ApiAddress must not be empty".to_string()));
        }

        let index = |v: Option<NumberOrString>, field: &str| -> Result<u32> {
            v.map(|v| v.into_index(field)).transpose().map(Option::unwrap_or_default)
        };

        let target_heating = index(raw.target_heating_idx, "TargetHeatingCoolingStateIDX")?;
        if target_heating == 0 {
            return Err(Error::Config("TargetHeatingCoolingStateIDX is required".to_string()));
        }
        let current_heating =
            match index(raw.current_heating_idx, "CurrentHeatingCoolingStateIDX")? {
                0 => target_heating,
                idx => idx,
            };

        let credentials = match raw.username {
            Some(username) if !username.is_empty() => Some(Credentials {
                username,
                password: raw.password.unwrap_or_default(),
            }),
            _ => None,
        };

        let timeout = match raw.timeout {
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
            Some(secs) => return Err(Error::Config(format!("timeout must be positive: {secs}"))),
            None => DEFAULT_TIMEOUT,
        };

        Ok(ThermostatConfig {
            name: raw.name,
            api_address: raw.api_address,
            port: raw.port.map(NumberOrString::into_string).unwrap_or_default(),
            credentials,
            indices: DeviceIndices {
                current_heating,
                target_heating,
                current_temperature: index(raw.current_temperature_idx, "CurrentTemperatureIDX")?,
                target_temperature: index(raw.target_temperature_idx, "TargetTemperatureIDX")?,
            },
            max_target_state: max_allowed_target_state(
                raw.max_value.as_deref().unwrap_or_default(),
            ),
            endpoint: raw.endpoint,
            heating_state_source: raw.heating_state_source,
            unknown_state_policy: raw.unknown_state_policy,
            timeout,
            accept_invalid_certs: raw.accept_invalid_certs,
            message_log: raw.message_log,
            message_log_mode: raw.message_log_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "accessory": "DomoticzThermostat",
            "name": "Living room",
            "ApiAddress": "http://192.168.1.10",
            "port": "8080",
            "CurrentHeatingCoolingStateIDX": 12,
            "TargetHeatingCoolingStateIDX": 13,
            "CurrentTemperatureIDX": 14,
            "TargetTemperatureIDX": 15
        })
    }

    #[test]
    fn parses_minimal_config() {
        let config = ThermostatConfig::from_value(base()).unwrap();
        assert_eq!(config.name, "Living room");
        assert_eq!(config.port, "8080");
        assert_eq!(config.indices.current_heating, 12);
        assert_eq!(config.indices.target_temperature, 15);
        assert_eq!(config.max_target_state, TargetHeatingCoolingState::Heat);
        assert_eq!(config.endpoint, EndpointStyle::Devices);
        assert_eq!(config.heating_state_source, HeatingStateSource::Level);
        assert_eq!(config.unknown_state_policy, UnknownStatePolicy::Strict);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.credentials.is_none());
        assert!(config.message_log.is_none());
        assert_eq!(config.message_log_mode, MessageLogMode::Full);
    }

    #[test]
    fn message_log_mode_is_configurable() {
        let mut v = base();
        v["messageLog"] = json!("/tmp/domoticz.ndjson");
        v["messageLogMode"] = json!("errors-only");
        let config = ThermostatConfig::from_value(v).unwrap();
        assert_eq!(config.message_log.as_deref(), Some("/tmp/domoticz.ndjson"));
        assert_eq!(config.message_log_mode, MessageLogMode::ErrorsOnly);

        let mut v = base();
        v["messageLogMode"] = json!("verbose");
        assert!(matches!(ThermostatConfig::from_value(v), Err(Error::Config(_))));
    }

    #[test]
    fn port_and_indices_accept_numbers_or_strings() {
        let mut v = base();
        v["port"] = json!(8080);
        v["TargetTemperatureIDX"] = json!("21");
        let config = ThermostatConfig::from_value(v).unwrap();
        assert_eq!(config.port, "8080");
        assert_eq!(config.indices.target_temperature, 21);
    }

    #[test]
    fn current_heating_falls_back_to_target() {
        let mut v = base();
        v["CurrentHeatingCoolingStateIDX"] = json!(0);
        assert_eq!(ThermostatConfig::from_value(v).unwrap().indices.current_heating, 13);

        let mut v = base();
        v.as_object_mut().unwrap().remove("CurrentHeatingCoolingStateIDX");
        assert_eq!(ThermostatConfig::from_value(v).unwrap().indices.current_heating, 13);
    }

    #[test]
    fn max_value_and_extensions() {
        let mut v = base();
        v["TargetHeatingCoolingStateMaxValue"] = json!("AUTO");
        v["endpoint"] = json!("getdevices");
        v["heatingStateSource"] = json!("status");
        v["unknownStatePolicy"] = json!("fallback-off");
        v["timeout"] = json!(2.5);
        let config = ThermostatConfig::from_value(v).unwrap();
        assert_eq!(config.max_target_state, TargetHeatingCoolingState::Auto);
        assert_eq!(config.endpoint, EndpointStyle::GetDevices);
        assert_eq!(config.heating_state_source, HeatingStateSource::Status);
        assert_eq!(config.unknown_state_policy, UnknownStatePolicy::FallbackOff);
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn garbage_max_value_means_heat() {
        let mut v = base();
        v["TargetHeatingCoolingStateMaxValue"] = json!("turbo");
        let config = ThermostatConfig::from_value(v).unwrap();
        assert_eq!(config.max_target_state, TargetHeatingCoolingState::Heat);
    }

    #[test]
    fn credentials_need_username() {
        let mut v = base();
        v["username"] = json!("");
        v["password"] = json!("pw");
        assert!(ThermostatConfig::from_value(v).unwrap().credentials.is_none());

        let mut v = base();
        v["username"] = json!("admin");
        v["password"] = json!("pw");
        let creds = ThermostatConfig::from_value(v).unwrap().credentials.unwrap();
        assert_eq!(creds.username, "admin");
        assert!(!format!("{creds:?}").contains("pw"));
    }

    #[test]
    fn rejects_missing_target_heating_idx() {
        let mut v = base();
        v.as_object_mut().unwrap().remove("TargetHeatingCoolingStateIDX");
        let err = ThermostatConfig::from_value(v).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_bad_index() {
        let mut v = base();
        v["CurrentTemperatureIDX"] = json!("kitchen");
        assert!(matches!(ThermostatConfig::from_value(v), Err(Error::Config(_))));
    }

    #[test]
    fn reads_host_config_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let host = json!({
            "bridge": { "name": "Bridge" },
            "accessories": [
                base(),
                { "accessory": "SomethingElse", "name": "Lamp" }
            ]
        });
        std::fs::write(tmp.path(), host.to_string()).unwrap();
        let configs = ThermostatConfig::from_host_config_file(tmp.path()).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "Living room");
    }
}
