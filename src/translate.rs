//! Mapping between Domoticz device values and HomeKit thermostat states.
//!
//! Domoticz selector switches encode the heating mode as a ladder of levels in
//! steps of 10. The mapping is total over that ladder; anything else is an
//! [`Error::UnknownLevel`] unless the caller opts into
//! [`UnknownStatePolicy::FallbackOff`].

use tracing::warn;

use crate::types::*;
use crate::{Error, Result};

const LEVEL_OFF: i64 = 0;
const LEVEL_HEAT: i64 = 10;
const LEVEL_COOL: i64 = 20;
const LEVEL_AUTO: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    Off,
    On,
    SetLevel(u8),
}

/// A Domoticz command, rendered to a URL by the gateway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SwitchLight { idx: u32, cmd: SwitchCommand },
    SetSetpoint { idx: u32, setpoint: f64 },
}

impl Command {
    pub fn idx(&self) -> u32 {
        match self {
            Command::SwitchLight { idx, .. } | Command::SetSetpoint { idx, .. } => *idx,
        }
    }

    /// Selector level this command leaves the switch at, if it sets one.
    pub fn implied_level(&self) -> Option<i64> {
        match self {
            Command::SwitchLight { cmd: SwitchCommand::Off, .. } => Some(LEVEL_OFF),
            Command::SwitchLight { cmd: SwitchCommand::SetLevel(level), .. } => {
                Some(i64::from(*level))
            }
            _ => None,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Command::SwitchLight { .. } => "switchlight",
            Command::SetSetpoint { .. } => "setsetpoint",
        }
    }
}

pub fn level_to_current_state(level: i64) -> Result<CurrentHeatingCoolingState> {
    match level {
        LEVEL_OFF => Ok(CurrentHeatingCoolingState::Off),
        LEVEL_HEAT => Ok(CurrentHeatingCoolingState::Heat),
        LEVEL_COOL => Ok(CurrentHeatingCoolingState::Cool),
        other => Err(Error::UnknownLevel(other)),
    }
}

pub fn level_to_target_state(level: i64) -> Result<TargetHeatingCoolingState> {
    match level {
        LEVEL_OFF => Ok(TargetHeatingCoolingState::Off),
        LEVEL_HEAT => Ok(TargetHeatingCoolingState::Heat),
        LEVEL_COOL => Ok(TargetHeatingCoolingState::Cool),
        LEVEL_AUTO => Ok(TargetHeatingCoolingState::Auto),
        other => Err(Error::UnknownLevel(other)),
    }
}

/// Binary on/off reading: "On" is heating, everything else is off.
/// Cool and auto cannot be expressed by an on/off switch.
pub fn status_to_state(status: &str) -> TargetHeatingCoolingState {
    if status == "On" {
        TargetHeatingCoolingState::Heat
    } else {
        TargetHeatingCoolingState::Off
    }
}

pub fn target_state_to_command(
    state: TargetHeatingCoolingState,
    idx: u32,
    source: HeatingStateSource,
) -> Command {
    let cmd = match (source, state) {
        (_, TargetHeatingCoolingState::Off) => SwitchCommand::Off,
        (HeatingStateSource::Status, _) => SwitchCommand::On,
        (HeatingStateSource::Level, TargetHeatingCoolingState::Heat) => {
            SwitchCommand::SetLevel(LEVEL_HEAT as u8)
        }
        (HeatingStateSource::Level, TargetHeatingCoolingState::Cool) => {
            SwitchCommand::SetLevel(LEVEL_COOL as u8)
        }
        (HeatingStateSource::Level, TargetHeatingCoolingState::Auto) => {
            SwitchCommand::SetLevel(LEVEL_AUTO as u8)
        }
    };
    Command::SwitchLight { idx, cmd }
}

/// Parse `TargetHeatingCoolingStateMaxValue`. Unrecognised values mean HEAT.
pub fn max_allowed_target_state(value: &str) -> TargetHeatingCoolingState {
    match value {
        "OFF" => TargetHeatingCoolingState::Off,
        "HEAT" => TargetHeatingCoolingState::Heat,
        "COOL" => TargetHeatingCoolingState::Cool,
        "AUTO" => TargetHeatingCoolingState::Auto,
        _ => TargetHeatingCoolingState::Heat,
    }
}

pub fn current_state_from_reading(
    reading: &DeviceReading,
    source: HeatingStateSource,
    policy: UnknownStatePolicy,
) -> Result<CurrentHeatingCoolingState> {
    match source {
        HeatingStateSource::Status => {
            let mapped = required_status(reading).map(|status| match status_to_state(status) {
                TargetHeatingCoolingState::Heat => CurrentHeatingCoolingState::Heat,
                _ => CurrentHeatingCoolingState::Off,
            });
            apply_policy(mapped, policy, reading, CurrentHeatingCoolingState::Off)
        }
        HeatingStateSource::Level => {
            let mapped = required_level(reading).and_then(level_to_current_state);
            apply_policy(mapped, policy, reading, CurrentHeatingCoolingState::Off)
        }
    }
}

pub fn target_state_from_reading(
    reading: &DeviceReading,
    source: HeatingStateSource,
    policy: UnknownStatePolicy,
) -> Result<TargetHeatingCoolingState> {
    match source {
        HeatingStateSource::Status => {
            let mapped = required_status(reading).map(status_to_state);
            apply_policy(mapped, policy, reading, TargetHeatingCoolingState::Off)
        }
        HeatingStateSource::Level => {
            let mapped = required_level(reading).and_then(level_to_target_state);
            apply_policy(mapped, policy, reading, TargetHeatingCoolingState::Off)
        }
    }
}

fn required_level(reading: &DeviceReading) -> Result<i64> {
    reading
        .level
        .ok_or_else(|| Error::Protocol(format!("device {} has no Level", reading.idx)))
}

fn required_status(reading: &DeviceReading) -> Result<&str> {
    reading
        .status
        .as_deref()
        .ok_or_else(|| Error::Protocol(format!("device {} has no Status", reading.idx)))
}

fn apply_policy<T>(
    mapped: Result<T>,
    policy: UnknownStatePolicy,
    reading: &DeviceReading,
    off: T,
) -> Result<T> {
    match (mapped, policy) {
        (Ok(state), _) => Ok(state),
        (
            Err(e @ (Error::UnknownLevel(_) | Error::Protocol(_))),
            UnknownStatePolicy::FallbackOff,
        ) => {
            warn!(
                idx = reading.idx,
                level = ?reading.level,
                status = ?reading.status,
                error = %e,
                "reporting OFF for unmapped reading"
            );
            Ok(off)
        }
        (Err(e), _) => Err(e),
    }
}
