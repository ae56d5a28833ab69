// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use std::fmt;

// NOTE: values match the USB_DEVICE_SPEED enumeration reported in the Speed byte of the connection information
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceSpeed {
    Low,
    Full,
    High,
    Super,
    Unknown(/*speed: */u8),
}

impl From<u8> for DeviceSpeed {
    fn from(value: u8) -> Self {
        match value {
            0 => DeviceSpeed::Low,
            1 => DeviceSpeed::Full,
            2 => DeviceSpeed::High,
            3 => DeviceSpeed::Super,
            other => DeviceSpeed::Unknown(other),
        }
    }
}

impl DeviceSpeed {
    pub fn as_u8(&self) -> u8 {
        match *self {
            DeviceSpeed::Low => 0,
            DeviceSpeed::Full => 1,
            DeviceSpeed::High => 2,
            DeviceSpeed::Super => 3,
            DeviceSpeed::Unknown(value) => value,
        }
    }
}

impl fmt::Display for DeviceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpeed::Low => f.write_str("low speed"),
            DeviceSpeed::Full => f.write_str("full speed"),
            DeviceSpeed::High => f.write_str("high speed"),
            DeviceSpeed::Super => f.write_str("super speed"),
            DeviceSpeed::Unknown(value) => write!(f, "unknown speed ({})", value),
        }
    }
}
