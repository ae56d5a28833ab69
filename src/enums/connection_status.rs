// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use std::fmt;

/// Status of a single hub port, as reported in the connection information for that port.
///
/// Anything other than `NoDeviceConnected` and `DeviceConnected` describes a device which is
/// physically present but could not be brought up by the hub driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    NoDeviceConnected,
    DeviceConnected,
    DeviceFailedEnumeration,
    DeviceGeneralFailure,
    DeviceCausedOvercurrent,
    DeviceNotEnoughPower,
    DeviceNotEnoughBandwidth,
    DeviceHubNestedTooDeeply,
    DeviceInLegacyHub,
    DeviceEnumerating,
    DeviceReset,
    Unknown(/*status: */u32),
}

impl From<u32> for ConnectionStatus {
    fn from(value: u32) -> Self {
        match value {
            0 => ConnectionStatus::NoDeviceConnected,
            1 => ConnectionStatus::DeviceConnected,
            2 => ConnectionStatus::DeviceFailedEnumeration,
            3 => ConnectionStatus::DeviceGeneralFailure,
            4 => ConnectionStatus::DeviceCausedOvercurrent,
            5 => ConnectionStatus::DeviceNotEnoughPower,
            6 => ConnectionStatus::DeviceNotEnoughBandwidth,
            7 => ConnectionStatus::DeviceHubNestedTooDeeply,
            8 => ConnectionStatus::DeviceInLegacyHub,
            9 => ConnectionStatus::DeviceEnumerating,
            10 => ConnectionStatus::DeviceReset,
            other => ConnectionStatus::Unknown(other),
        }
    }
}

impl ConnectionStatus {
    pub fn as_u32(&self) -> u32 {
        match *self {
            ConnectionStatus::NoDeviceConnected => 0,
            ConnectionStatus::DeviceConnected => 1,
            ConnectionStatus::DeviceFailedEnumeration => 2,
            ConnectionStatus::DeviceGeneralFailure => 3,
            ConnectionStatus::DeviceCausedOvercurrent => 4,
            ConnectionStatus::DeviceNotEnoughPower => 5,
            ConnectionStatus::DeviceNotEnoughBandwidth => 6,
            ConnectionStatus::DeviceHubNestedTooDeeply => 7,
            ConnectionStatus::DeviceInLegacyHub => 8,
            ConnectionStatus::DeviceEnumerating => 9,
            ConnectionStatus::DeviceReset => 10,
            ConnectionStatus::Unknown(value) => value,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, ConnectionStatus::NoDeviceConnected | ConnectionStatus::DeviceConnected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Unknown(value) => write!(f, "UnknownConnectionStatus({})", value),
            other => write!(f, "{:?}", other),
        }
    }
}
