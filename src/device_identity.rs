// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{DeviceDescriptor, IdentityError};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The join key of a USB device: `USB\VID_xxxx&PID_xxxx\<suffix>`.
///
/// The vendor and product ids come from the device descriptor rather than from the PnP instance id, since the
/// instance id's VID/PID segments are rewritten when a filter driver takes over the device; the suffix (the
/// port location or serial number assigned by the USB hub driver) survives that rebind.
#[derive(Clone, Debug)]
pub struct DeviceIdentity {
    vendor_id: u16,
    product_id: u16,
    suffix: String,
    // the formatted identity; equality, hashing and lookups use only this
    key: String,
}

impl DeviceIdentity {
    pub fn new(vendor_id: u16, product_id: u16, suffix: &str) -> Self {
        let key = format!("USB\\VID_{:04x}&PID_{:04x}\\{}", vendor_id, product_id, suffix);
        DeviceIdentity { vendor_id, product_id, suffix: suffix.to_string(), key }
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

/// Derives the identity of a device from its descriptor and its PnP device instance id (e.g.
/// `USB\VID_046D&PID_C52B\5&2A2C3E1&0&3`).  The suffix is the third `\`-separated segment, copied verbatim.
pub fn resolve_identity(device_descriptor: &DeviceDescriptor, raw_pnp_path: &str) -> Result<DeviceIdentity, IdentityError> {
    let suffix = match raw_pnp_path.split('\\').nth(2) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(IdentityError::MissingInstanceSuffix(raw_pnp_path.to_string())),
    };
    Ok(DeviceIdentity::new(device_descriptor.vendor_id, device_descriptor.product_id, suffix))
}

impl PartialEq for DeviceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DeviceIdentity {}

// NOTE: Hash must agree with Borrow<str> so that identity maps can be queried with a plain &str
impl Hash for DeviceIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Borrow<str> for DeviceIdentity {
    fn borrow(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
