// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{
    configuration_descriptor,
    device_identity,
    io_control::{ERROR_GEN_FAILURE, ERROR_INVALID_FUNCTION, ERROR_NOT_FOUND, ERROR_NOT_SUPPORTED},
    size_negotiated_query::{QueryRequest, SizeNegotiatedQuery, USB_DESCRIPTOR_REQUEST_SIZE},
    ConfigurationDescriptor,
    ConnectionInfo,
    NodeError,
    QueryError,
    QueryKind,
    StringDescriptorSource,
    StringTable,
    UsbDeviceInfo,
    UsbIoControl,
    WalkOption,
};
use log::debug;

/// A port with an external hub attached; the hub itself has not been opened yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalHubPort {
    pub connection: ConnectionInfo,
    pub hub_name: String,
    pub driver_key_name: Option<String>,
    pub device_instance_id: Option<String>,
}

/// How one hub port was classified.  Recoverable problems found along the way are carried with the node.
#[derive(Debug)]
pub enum PortResult {
    Empty(/*port: */u32),
    Device(UsbDeviceInfo, /*degraded: */Vec<NodeError>),
    Hub(ExternalHubPort, /*degraded: */Vec<NodeError>),
    // the device is present but did not answer; it is left out of the result
    Skipped(/*port: */u32, NodeError),
    // the port could not be classified (or its device could not be described) at all; the connection
    // information is carried whenever it was read
    Failed(/*port: */u32, Option<ConnectionInfo>, NodeError),
}

impl PortResult {
    pub fn port(&self) -> u32 {
        match self {
            PortResult::Empty(port) | PortResult::Skipped(port, _) | PortResult::Failed(port, _, _) => *port,
            PortResult::Device(device, _) => device.connection.connection_index,
            PortResult::Hub(hub, _) => hub.connection.connection_index,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct WalkSettings {
    include_configuration_descriptors: bool,
    include_string_descriptors: bool,
    resolve_device_instance_ids: bool,
}

/// Classifies the ports of one hub.
pub struct PortEnumerator<'a, T: UsbIoControl> {
    io: &'a T,
    query: SizeNegotiatedQuery<'a, T>,
    settings: WalkSettings,
}
//
impl<'a, T: UsbIoControl> PortEnumerator<'a, T> {
    pub fn new(io: &'a T, options: &[WalkOption]) -> Self {
        // parse options
        //
        let mut settings = WalkSettings::default();
        for option in options {
            match option {
                WalkOption::IncludeConfigurationDescriptors => {
                    settings.include_configuration_descriptors = true;
                },
                WalkOption::IncludeStringDescriptors => {
                    settings.include_string_descriptors = true;
                },
                WalkOption::ResolveDeviceInstanceIds => {
                    settings.resolve_device_instance_ids = true;
                },
            }
        }

        PortEnumerator { io, query: SizeNegotiatedQuery::new(io), settings }
    }

    /// Classifies ports 1..=port_count of `hub` (port numbers are 1-based).
    pub fn enumerate_ports(&self, hub: &T::Handle, port_count: u8) -> Vec<PortResult> {
        (1..=port_count as u32).map(|port| self.enumerate_port(hub, port)).collect()
    }

    pub fn enumerate_port(&self, hub: &T::Handle, port: u32) -> PortResult {
        let connection = match self.query_connection_info(hub, port) {
            Ok(value) => value,
            Err(error) => return PortResult::Failed(port, None, error),
        };
        if connection.is_empty() {
            return PortResult::Empty(port);
        }
        debug!("port {}: {} ({}, hub: {})", port, connection.status, connection.speed, connection.device_is_hub);

        let mut degraded = Vec::<NodeError>::new();

        // the driver key name links the port back to its PnP device node
        let driver_key_name = match self.query.query_name(hub, &QueryRequest::node_connection_driver_key_name(port)) {
            Ok(value) => Some(value),
            Err(error) => {
                degraded.push(error.into());
                None
            },
        };
        let device_instance_id = match (&driver_key_name, self.settings.resolve_device_instance_ids) {
            (Some(driver_key_name), true) => match self.io.device_instance_id_for_driver_key(driver_key_name) {
                Ok(Some(value)) => Some(value),
                Ok(None) => {
                    degraded.push(NodeError::InstanceIdLookupFailed(driver_key_name.clone(), ERROR_NOT_FOUND));
                    None
                },
                Err(win32_error) => {
                    degraded.push(NodeError::InstanceIdLookupFailed(driver_key_name.clone(), win32_error));
                    None
                },
            },
            _ => None,
        };

        // a device which failed to come up is reported as-is; it will not answer descriptor requests
        if connection.status.is_failure() {
            let device = UsbDeviceInfo {
                connection,
                configuration: None,
                strings: StringTable::default(),
                driver_key_name,
                device_instance_id,
                identity: None,
            };
            return PortResult::Device(device, degraded);
        }

        if connection.device_is_hub {
            let hub_name = match self.query.query_name(hub, &QueryRequest::node_connection_name(port)) {
                Ok(value) => value,
                Err(error) => return PortResult::Failed(port, Some(connection), error.into()),
            };
            let external_hub = ExternalHubPort { connection, hub_name, driver_key_name, device_instance_id };
            return PortResult::Hub(external_hub, degraded);
        }

        self.describe_device(hub, port, connection, driver_key_name, device_instance_id, degraded)
    }

    fn query_connection_info(&self, hub: &T::Handle, port: u32) -> Result<ConnectionInfo, NodeError> {
        match self.query.query(hub, &QueryRequest::node_connection_information_ex(port)) {
            Ok(buffer) => Ok(ConnectionInfo::decode_ex(&buffer)?),
            Err(QueryError::Win32Error(_, win32_error)) if win32_error == ERROR_INVALID_FUNCTION || win32_error == ERROR_NOT_SUPPORTED => {
                // older hub drivers only implement the original form of the query
                debug!("port {}: {:?} not supported (win32 error {}); using the legacy form", port, QueryKind::NodeConnectionInformationEx, win32_error);
                let buffer = self.query.query(hub, &QueryRequest::node_connection_information(port))?;
                Ok(ConnectionInfo::decode_legacy(&buffer)?)
            },
            Err(error) => Err(error.into()),
        }
    }

    fn describe_device(
        &self,
        hub: &T::Handle,
        port: u32,
        connection: ConnectionInfo,
        driver_key_name: Option<String>,
        device_instance_id: Option<String>,
        mut degraded: Vec<NodeError>,
    ) -> PortResult {
        let reported_descriptor = connection.device_descriptor;
        let device_descriptor = match reported_descriptor {
            Some(value) => value,
            None => {
                // decode_ex guarantees a descriptor for connected devices
                debug_assert!(false, "connected device without a device descriptor");
                return PortResult::Device(
                    UsbDeviceInfo { connection, configuration: None, strings: StringTable::default(), driver_key_name, device_instance_id, identity: None },
                    degraded,
                );
            },
        };

        let mut configuration: Option<ConfigurationDescriptor> = None;
        if self.settings.include_configuration_descriptors {
            let buffer = match self.query.query(hub, &QueryRequest::configuration_descriptor(port, 0)) {
                Ok(value) => value,
                Err(error) if error.win32_error() == Some(ERROR_GEN_FAILURE) => return PortResult::Skipped(port, error.into()),
                Err(error) => return PortResult::Failed(port, Some(connection), error.into()),
            };
            match ConfigurationDescriptor::decode(&buffer[USB_DESCRIPTOR_REQUEST_SIZE..]) {
                Ok(value) => configuration = Some(value),
                Err(error) => return PortResult::Failed(port, Some(connection), error.into()),
            }
        }

        let mut strings = StringTable::default();
        if self.settings.include_string_descriptors && configuration_descriptor::has_string_descriptors(&device_descriptor, configuration.as_ref()) {
            let mut source = PortStringSource { query: &self.query, hub, port };
            match StringTable::load_for_device(&mut source, &device_descriptor, configuration.as_ref()) {
                Ok((table, failures)) => {
                    strings = table;
                    degraded.extend(failures.into_iter().map(NodeError::from));
                },
                Err(error) => {
                    // string descriptor zero did not answer: the device is most likely suspended
                    return PortResult::Skipped(port, error.into());
                },
            }
        }

        let identity = match &device_instance_id {
            Some(device_instance_id) => match device_identity::resolve_identity(&device_descriptor, device_instance_id) {
                Ok(value) => Some(value),
                Err(error) => {
                    degraded.push(error.into());
                    None
                },
            },
            None => None,
        };

        let device = UsbDeviceInfo { connection, configuration, strings, driver_key_name, device_instance_id, identity };
        PortResult::Device(device, degraded)
    }
}

// string descriptors are read through the hub, addressed by the port the device is attached to
struct PortStringSource<'q, 'a, T: UsbIoControl> {
    query: &'q SizeNegotiatedQuery<'a, T>,
    hub: &'q T::Handle,
    port: u32,
}

impl<'q, 'a, T: UsbIoControl> StringDescriptorSource for PortStringSource<'q, 'a, T> {
    fn fetch_string_descriptor(&mut self, index: u8, language_id: u16) -> Result<Vec<u8>, QueryError> {
        let buffer = self.query.query(self.hub, &QueryRequest::string_descriptor(self.port, index, language_id))?;
        let descriptor = &buffer[USB_DESCRIPTOR_REQUEST_SIZE.min(buffer.len())..];

        // the response must hold exactly one descriptor of the declared length
        let declared_len = descriptor.first().copied().unwrap_or(0) as usize;
        if descriptor.len() < 2 || declared_len != descriptor.len() {
            return Err(QueryError::SizeMismatch(QueryKind::DescriptorFromNodeConnection, USB_DESCRIPTOR_REQUEST_SIZE + declared_len, buffer.len()));
        }
        Ok(descriptor.to_vec())
    }
}
