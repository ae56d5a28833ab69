// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{
    ConfigurationDescriptor,
    ConnectionInfo,
    ConnectionStatus,
    DeviceIdentity,
    DeviceStrings,
    HubInformation,
    StringTable,
};
use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostControllerInfo {
    pub device_path: String,
    pub driver_key_name: Option<String>,
    pub device_instance_id: Option<String>,
    pub bus_number: Option<u32>,
    pub address: Option<u32>, // PCI (device << 16) | function
    pub root_hub_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HubInfo {
    pub hub_name: String,
    pub information: HubInformation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalHubInfo {
    pub connection: ConnectionInfo,
    pub hub: HubInfo,
    pub driver_key_name: Option<String>,
    pub device_instance_id: Option<String>,
}

/// Everything the walk learned about one leaf device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub connection: ConnectionInfo,
    pub configuration: Option<ConfigurationDescriptor>,
    pub strings: StringTable,
    pub driver_key_name: Option<String>,
    pub device_instance_id: Option<String>,
    pub identity: Option<DeviceIdentity>,
}

impl UsbDeviceInfo {
    fn string(&self, index: Option<u8>) -> Option<String> {
        match index {
            Some(index) if index != 0 => self.strings.get(index).map(str::to_string),
            _ => None,
        }
    }

    pub fn manufacturer(&self) -> Option<String> {
        self.string(self.connection.device_descriptor.map(|descriptor| descriptor.manufacturer_index))
    }

    pub fn product(&self) -> Option<String> {
        self.string(self.connection.device_descriptor.map(|descriptor| descriptor.product_index))
    }

    pub fn serial_number(&self) -> Option<String> {
        self.string(self.connection.device_descriptor.map(|descriptor| descriptor.serial_number_index))
    }

    pub fn device_strings(&self) -> DeviceStrings {
        DeviceStrings {
            manufacturer: self.manufacturer(),
            product: self.product(),
            serial_number: self.serial_number(),
        }
    }

    /// `[PortN] <product>`, falling back to `VID:PID`; a device which failed to come up is labelled with its
    /// connection status instead.
    pub fn label(&self) -> String {
        let port = self.connection.connection_index;
        if self.connection.status != ConnectionStatus::DeviceConnected {
            return format!("[Port{}] {}", port, self.connection.status);
        }
        match (self.product(), self.connection.device_descriptor) {
            (Some(product), _) => format!("[Port{}] {}", port, product),
            (None, Some(descriptor)) => format!("[Port{}] {:04X}:{:04X}", port, descriptor.vendor_id, descriptor.product_id),
            (None, None) => format!("[Port{}] UnknownDevice", port),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeInfo {
    HostController(HostControllerInfo),
    RootHub(HubInfo),
    ExternalHub(ExternalHubInfo),
    Device(UsbDeviceInfo),
}

/// One node of the USB topology tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HardwareNode {
    pub label: String,
    pub info: NodeInfo,
    pub children: Vec<HardwareNode>,
}

impl HardwareNode {
    /// The number of the parent hub port this node is attached to (none for host controllers and root hubs).
    pub fn port(&self) -> Option<u32> {
        match &self.info {
            NodeInfo::ExternalHub(external_hub) => Some(external_hub.connection.connection_index),
            NodeInfo::Device(device) => Some(device.connection.connection_index),
            _ => None,
        }
    }

    /// All leaf devices at or below this node, depth first in port order.
    pub fn devices(&self) -> Vec<&UsbDeviceInfo> {
        let mut result = Vec::<&UsbDeviceInfo>::new();
        self.collect_devices(&mut result);
        result
    }

    fn collect_devices<'a>(&'a self, result: &mut Vec<&'a UsbDeviceInfo>) {
        if let NodeInfo::Device(device) = &self.info {
            result.push(device);
        }
        for child in &self.children {
            child.collect_devices(result);
        }
    }

    /// Returns the child attached to `port`, if any.
    pub fn child_at_port(&self, port: u32) -> Option<&HardwareNode> {
        self.children.iter().find(|child| child.port() == Some(port))
    }

    pub(crate) fn render_into(&self, output: &mut String, depth: usize) {
        // NOTE: writing to a String cannot fail
        let _ = writeln!(output, "{:indent$}{}", "", self.label, indent = depth * 2);
        for child in &self.children {
            child.render_into(output, depth + 1);
        }
    }
}
