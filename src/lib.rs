mod accessory;
mod config;
mod error;
mod gateway;
mod logger;
mod protocol;
mod translate;
mod types;

pub use accessory::{
    register, AccessoryFactory, AccessoryHost, AccessoryPlugin, CharacteristicDescription,
    CharacteristicProps, HapCapabilities, ServiceDescription, ThermostatAccessory, ACCESSORY_NAME,
    PLUGIN_NAME,
};
pub use config::{Credentials, DeviceIndices, ThermostatConfig};
pub use error::{Error, ErrorKind, Result};
pub use gateway::{DomoticzClient, DomoticzClientBuilder, DEFAULT_TIMEOUT};
pub use logger::MessageLogMode;
pub use protocol::{EndpointStyle, Envelope};
pub use translate::{
    level_to_current_state, level_to_target_state, max_allowed_target_state, status_to_state,
    target_state_to_command, Command, SwitchCommand,
};
pub use types::*;
