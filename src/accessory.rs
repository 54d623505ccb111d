//! HomeKit thermostat accessory backed by Domoticz devices.
//!
//! The host (a HAP bridge) owns the protocol stack. It calls [`register`] once
//! at startup, builds one accessory per config entry through the registered
//! [`AccessoryFactory`], and then forwards characteristic reads and writes to
//! [`AccessoryPlugin::get`] / [`AccessoryPlugin::set`].
//!
//! Every access is one round trip to Domoticz. Accesses to the same
//! characteristic are serialized; different characteristics run concurrently.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::ThermostatConfig;
use crate::gateway::DomoticzClient;
use crate::translate::{
    current_state_from_reading, target_state_from_reading, target_state_to_command, Command,
};
use crate::types::*;
use crate::{Error, Result};

pub const PLUGIN_NAME: &str = "homebridge-domoticz-thermostat";
pub const ACCESSORY_NAME: &str = "DomoticzThermostat";

const MANUFACTURER: &str = "Domoticz";
const MODEL: &str = "Thermostat";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicProps {
    pub min_value: f64,
    pub max_value: f64,
    pub min_step: f64,
    pub writable: bool,
}

/// Characteristic metadata supplied by the host's HAP implementation.
/// Passed to each accessory at construction.
#[derive(Debug, Clone)]
pub struct HapCapabilities {
    props: HashMap<Characteristic, CharacteristicProps>,
}

impl HapCapabilities {
    /// Ranges from the HAP characteristic definitions.
    pub fn standard() -> Self {
        let mut props = HashMap::new();
        let mut add = |c: Characteristic, min_value: f64, max_value: f64, min_step: f64| {
            props.insert(
                c,
                CharacteristicProps { min_value, max_value, min_step, writable: c.writable() },
            );
        };
        add(Characteristic::CurrentHeatingCoolingState, 0.0, 2.0, 1.0);
        add(Characteristic::TargetHeatingCoolingState, 0.0, 3.0, 1.0);
        add(Characteristic::CurrentTemperature, -270.0, 100.0, 0.1);
        add(Characteristic::TargetTemperature, 10.0, 38.0, 0.1);
        add(Characteristic::TemperatureDisplayUnits, 0.0, 1.0, 1.0);
        Self { props }
    }

    pub fn with_props(
        mut self,
        characteristic: Characteristic,
        props: CharacteristicProps,
    ) -> Self {
        self.props.insert(characteristic, props);
        self
    }

    pub fn props(&self, characteristic: Characteristic) -> Option<CharacteristicProps> {
        self.props.get(&characteristic).copied()
    }
}

impl Default for HapCapabilities {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicDescription {
    pub characteristic: Characteristic,
    pub props: Option<CharacteristicProps>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceDescription {
    AccessoryInformation {
        manufacturer: String,
        model: String,
        serial_number: String,
    },
    Thermostat {
        name: String,
        characteristics: Vec<CharacteristicDescription>,
    },
}

/// Contract between the host and an accessory it created.
#[async_trait]
pub trait AccessoryPlugin: Send + Sync {
    fn identify(&self);

    fn services(&self) -> Vec<ServiceDescription>;

    async fn get(&self, characteristic: Characteristic) -> Result<CharacteristicValue>;

    async fn set(&self, characteristic: Characteristic, value: CharacteristicValue) -> Result<()>;
}

/// Builds an accessory from its raw JSON config block.
pub type AccessoryFactory = fn(Value, HapCapabilities) -> Result<Box<dyn AccessoryPlugin>>;

pub trait AccessoryHost {
    fn register_accessory(
        &mut self,
        plugin_name: &'static str,
        accessory_name: &'static str,
        factory: AccessoryFactory,
    );
}

/// Entry point called by the host when the plugin is loaded.
pub fn register<H: AccessoryHost + ?Sized>(host: &mut H) {
    host.register_accessory(PLUGIN_NAME, ACCESSORY_NAME, create_accessory);
}

fn create_accessory(config: Value, hap: HapCapabilities) -> Result<Box<dyn AccessoryPlugin>> {
    let config = ThermostatConfig::from_value(config)?;
    Ok(Box::new(ThermostatAccessory::new(config, hap)?))
}

pub struct ThermostatAccessory {
    config: ThermostatConfig,
    hap: HapCapabilities,
    gateway: DomoticzClient,
    in_flight: [Mutex<()>; 5],
}

impl ThermostatAccessory {
    pub fn new(config: ThermostatConfig, hap: HapCapabilities) -> Result<Self> {
        let gateway = DomoticzClient::from_config(&config)?;
        Ok(Self::with_client(config, hap, gateway))
    }

    pub fn with_client(
        config: ThermostatConfig,
        hap: HapCapabilities,
        gateway: DomoticzClient,
    ) -> Self {
        info!(
            name = %config.name,
            url = gateway.base_url(),
            max_target_state = config.max_target_state.as_config_str(),
            "Domoticz thermostat initialized"
        );
        Self {
            config,
            hap,
            gateway,
            in_flight: Default::default(),
        }
    }

    pub fn config(&self) -> &ThermostatConfig {
        &self.config
    }

    pub async fn current_heating_cooling_state(&self) -> Result<CurrentHeatingCoolingState> {
        self.exclusive(Characteristic::CurrentHeatingCoolingState, "get", async {
            let reading = self.gateway.read_device(self.config.indices.current_heating).await?;
            current_state_from_reading(
                &reading,
                self.config.heating_state_source,
                self.config.unknown_state_policy,
            )
        })
        .await
    }

    pub async fn target_heating_cooling_state(&self) -> Result<TargetHeatingCoolingState> {
        self.exclusive(Characteristic::TargetHeatingCoolingState, "get", async {
            let reading = self.gateway.read_device(self.config.indices.target_heating).await?;
            target_state_from_reading(
                &reading,
                self.config.heating_state_source,
                self.config.unknown_state_policy,
            )
        })
        .await
    }

    pub async fn set_target_heating_cooling_state(
        &self,
        state: TargetHeatingCoolingState,
    ) -> Result<()> {
        let characteristic = Characteristic::TargetHeatingCoolingState;
        self.exclusive(characteristic, "set", async {
            let max = self.config.max_target_state;
            if state > max {
                return Err(Error::OutOfRange {
                    characteristic,
                    value: f64::from(state.as_hap()),
                    min: f64::from(TargetHeatingCoolingState::Off.as_hap()),
                    max: f64::from(max.as_hap()),
                });
            }
            let command = target_state_to_command(
                state,
                self.config.indices.target_heating,
                self.config.heating_state_source,
            );
            self.gateway.send_command(&command).await.map(|_| ())
        })
        .await
    }

    pub async fn current_temperature(&self) -> Result<f64> {
        self.exclusive(Characteristic::CurrentTemperature, "get", async {
            let idx = self.config.indices.current_temperature;
            let reading = self.gateway.read_device(idx).await?;
            reading
                .temperature
                .ok_or_else(|| Error::Protocol(format!("device {idx} has no Temp")))
        })
        .await
    }

    pub async fn target_temperature(&self) -> Result<f64> {
        self.exclusive(Characteristic::TargetTemperature, "get", async {
            let idx = self.config.indices.target_temperature;
            let reading = self.gateway.read_device(idx).await?;
            reading
                .set_point
                .ok_or_else(|| Error::Protocol(format!("device {idx} has no SetPoint")))
        })
        .await
    }

    pub async fn set_target_temperature(&self, setpoint: f64) -> Result<()> {
        let characteristic = Characteristic::TargetTemperature;
        self.exclusive(characteristic, "set", async {
            if let Some(props) = self.hap.props(characteristic)
                && !(setpoint >= props.min_value && setpoint <= props.max_value)
            {
                return Err(Error::OutOfRange {
                    characteristic,
                    value: setpoint,
                    min: props.min_value,
                    max: props.max_value,
                });
            }
            let command = Command::SetSetpoint {
                idx: self.config.indices.target_temperature,
                setpoint,
            };
            self.gateway.send_command(&command).await.map(|_| ())
        })
        .await
    }

    /// Always Celsius; Domoticz reports Celsius regardless.
    pub fn temperature_display_units(&self) -> TemperatureDisplayUnits {
        TemperatureDisplayUnits::Celsius
    }

    /// Accepts any valid HAP unit and keeps reporting Celsius.
    pub fn set_temperature_display_units(&self, value: CharacteristicValue) -> Result<()> {
        let units = value
            .as_u8()
            .and_then(TemperatureDisplayUnits::from_hap)
            .ok_or_else(|| Error::UnknownCharacteristicValue(value.to_string()))?;
        debug!(?units, "ignoring TemperatureDisplayUnits change");
        Ok(())
    }

    async fn exclusive<T, F>(
        &self,
        characteristic: Characteristic,
        op: &'static str,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _guard = self.in_flight[slot(characteristic)].lock().await;
        let result = fut.await;
        if let Err(ref e) = result {
            error!(
                accessory = %self.config.name,
                characteristic = %characteristic,
                op,
                error = %e,
                "characteristic access failed"
            );
        }
        result
    }

    fn thermostat_props(&self, characteristic: Characteristic) -> Option<CharacteristicProps> {
        let props = self.hap.props(characteristic);
        match characteristic {
            Characteristic::TargetHeatingCoolingState => props.map(|p| CharacteristicProps {
                min_value: f64::from(TargetHeatingCoolingState::Off.as_hap()),
                max_value: f64::from(self.config.max_target_state.as_hap()),
                ..p
            }),
            _ => props,
        }
    }
}

fn slot(characteristic: Characteristic) -> usize {
    match characteristic {
        Characteristic::CurrentHeatingCoolingState => 0,
        Characteristic::TargetHeatingCoolingState => 1,
        Characteristic::CurrentTemperature => 2,
        Characteristic::TargetTemperature => 3,
        Characteristic::TemperatureDisplayUnits => 4,
    }
}

#[async_trait]
impl AccessoryPlugin for ThermostatAccessory {
    fn identify(&self) {
        info!(accessory = %self.config.name, "Identify!");
    }

    fn services(&self) -> Vec<ServiceDescription> {
        vec![
            ServiceDescription::AccessoryInformation {
                manufacturer: MANUFACTURER.to_string(),
                model: MODEL.to_string(),
                serial_number: format!("idx-{}", self.config.indices.target_heating),
            },
            ServiceDescription::Thermostat {
                name: self.config.name.clone(),
                characteristics: Characteristic::THERMOSTAT
                    .iter()
                    .map(|&c| CharacteristicDescription {
                        characteristic: c,
                        props: self.thermostat_props(c),
                    })
                    .collect(),
            },
        ]
    }

    async fn get(&self, characteristic: Characteristic) -> Result<CharacteristicValue> {
        match characteristic {
            Characteristic::CurrentHeatingCoolingState => {
                self.current_heating_cooling_state().await.map(Into::into)
            }
            Characteristic::TargetHeatingCoolingState => {
                self.target_heating_cooling_state().await.map(Into::into)
            }
            Characteristic::CurrentTemperature => self.current_temperature().await.map(Into::into),
            Characteristic::TargetTemperature => self.target_temperature().await.map(Into::into),
            Characteristic::TemperatureDisplayUnits => Ok(self.temperature_display_units().into()),
        }
    }

    async fn set(&self, characteristic: Characteristic, value: CharacteristicValue) -> Result<()> {
        match characteristic {
            Characteristic::TargetHeatingCoolingState => {
                let state = value
                    .as_u8()
                    .and_then(TargetHeatingCoolingState::from_hap)
                    .ok_or_else(|| Error::UnknownCharacteristicValue(value.to_string()))?;
                self.set_target_heating_cooling_state(state).await
            }
            Characteristic::TargetTemperature => self.set_target_temperature(value.as_f64()).await,
            Characteristic::TemperatureDisplayUnits => self.set_temperature_display_units(value),
            read_only => Err(Error::ReadOnly(read_only)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::DeviceIndices;
    use crate::logger::MessageLogMode;
    use crate::protocol::EndpointStyle;

    fn accessory(max: TargetHeatingCoolingState) -> ThermostatAccessory {
        ThermostatAccessory::new(config(max), HapCapabilities::standard()).unwrap()
    }

    fn config(max: TargetHeatingCoolingState) -> ThermostatConfig {
        ThermostatConfig {
            name: "Hall".to_string(),
            api_address: "http://127.0.0.1".to_string(),
            port: "1".to_string(),
            credentials: None,
            indices: DeviceIndices {
                current_heating: 1,
                target_heating: 2,
                current_temperature: 3,
                target_temperature: 4,
            },
            max_target_state: max,
            endpoint: EndpointStyle::Devices,
            heating_state_source: HeatingStateSource::Level,
            unknown_state_policy: UnknownStatePolicy::Strict,
            timeout: Duration::from_secs(1),
            accept_invalid_certs: false,
            message_log: None,
            message_log_mode: MessageLogMode::Full,
        }
    }

    #[test]
    fn services_clamp_target_state_range() {
        let accessory = accessory(TargetHeatingCoolingState::Cool);
        let services = accessory.services();
        assert_eq!(services.len(), 2);
        assert!(matches!(
            &services[0],
            ServiceDescription::AccessoryInformation { manufacturer, model, .. }
                if manufacturer == "Domoticz" && model == "Thermostat"
        ));
        let ServiceDescription::Thermostat { characteristics, .. } = &services[1] else {
            panic!("second service should be the thermostat");
        };
        assert_eq!(characteristics.len(), 5);
        let target = characteristics
            .iter()
            .find(|c| c.characteristic == Characteristic::TargetHeatingCoolingState)
            .unwrap();
        let props = target.props.unwrap();
        assert_eq!(props.min_value, 0.0);
        assert_eq!(props.max_value, 2.0);
        assert!(props.writable);
    }

    #[test]
    fn slots_are_distinct() {
        let mut seen: Vec<usize> = Characteristic::THERMOSTAT.iter().map(|&c| slot(c)).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn display_units_are_celsius_and_writes_are_ignored() {
        let accessory = accessory(TargetHeatingCoolingState::Heat);
        let value = accessory.get(Characteristic::TemperatureDisplayUnits).await.unwrap();
        assert_eq!(value, CharacteristicValue::UInt8(0));
        accessory
            .set(Characteristic::TemperatureDisplayUnits, CharacteristicValue::UInt8(1))
            .await
            .unwrap();
        let value = accessory.get(Characteristic::TemperatureDisplayUnits).await.unwrap();
        assert_eq!(value, CharacteristicValue::UInt8(0));
    }

    #[tokio::test]
    async fn invalid_display_units_are_rejected() {
        let accessory = accessory(TargetHeatingCoolingState::Heat);
        for value in [CharacteristicValue::UInt8(7), CharacteristicValue::Float(0.5)] {
            let err = accessory
                .set(Characteristic::TemperatureDisplayUnits, value)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::UnknownCharacteristicValue(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn read_only_characteristics_reject_writes() {
        let accessory = accessory(TargetHeatingCoolingState::Heat);
        let err = accessory
            .set(Characteristic::CurrentTemperature, CharacteristicValue::Float(20.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly(Characteristic::CurrentTemperature)));
    }

    #[tokio::test]
    async fn invalid_target_state_value_is_rejected() {
        let accessory = accessory(TargetHeatingCoolingState::Auto);
        let err = accessory
            .set(Characteristic::TargetHeatingCoolingState, CharacteristicValue::UInt8(9))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCharacteristicValue(_)));
    }

    struct RecordingHost {
        registered: Vec<(&'static str, &'static str, AccessoryFactory)>,
    }

    impl AccessoryHost for RecordingHost {
        fn register_accessory(
            &mut self,
            plugin_name: &'static str,
            accessory_name: &'static str,
            factory: AccessoryFactory,
        ) {
            self.registered.push((plugin_name, accessory_name, factory));
        }
    }

    #[test]
    fn register_installs_factory() {
        let mut host = RecordingHost { registered: Vec::new() };
        register(&mut host);
        assert_eq!(host.registered.len(), 1);
        let (plugin, name, factory) = host.registered[0];
        assert_eq!(plugin, PLUGIN_NAME);
        assert_eq!(name, ACCESSORY_NAME);

        let raw = serde_json::json!({
            "accessory": ACCESSORY_NAME,
            "name": "Hall",
            "ApiAddress": "127.0.0.1",
            "port": 8080,
            "TargetHeatingCoolingStateIDX": 2
        });
        let accessory = factory(raw, HapCapabilities::standard()).unwrap();
        assert_eq!(accessory.services().len(), 2);

        let bad = serde_json::json!({ "name": "Hall" });
        assert!(factory(bad, HapCapabilities::standard()).is_err());
    }
}
