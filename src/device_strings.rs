// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

/// The human readable strings of a device, as exposed in the identity map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceStrings {
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl DeviceStrings {
    // "<manufacturer> <product>", or whichever of the two is known
    pub fn display_name(&self) -> Option<String> {
        match (&self.manufacturer, &self.product) {
            (Some(manufacturer), Some(product)) => Some(format!("{} {}", manufacturer, product)),
            (Some(manufacturer), None) => Some(manufacturer.clone()),
            (None, Some(product)) => Some(product.clone()),
            (None, None) => None,
        }
    }
}
