// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use win_usb_topology::{
    ConnectionInfo,
    ConnectionStatus,
    DeviceDescriptor,
    DeviceSpeed,
    EndpointDescriptor,
    EnumerateError,
    HostControllerInterface,
    HubInformation,
    PipeInfo,
    QueryKind,
    UsbIoControl,
};

pub const ERROR_FILE_NOT_FOUND: u32 = 2;
pub const ERROR_GEN_FAILURE: u32 = 31;
pub const ERROR_INVALID_FUNCTION: u32 = 1;
pub const LANGUAGE_EN_US: u16 = 0x0409;

const USB_DESCRIPTOR_REQUEST_SIZE: usize = 12;

// a HID boot mouse: configuration, interface (iInterface 4), HID class descriptor, interrupt IN endpoint
pub fn mouse_configuration() -> Vec<u8> {
    vec![
        9, 2, 34, 0, 1, 1, 0, 0xa0, 50,
        9, 4, 0, 0, 1, 3, 1, 2, 4,
        9, 0x21, 0x11, 0x01, 0, 1, 0x22, 0x34, 0,
        7, 5, 0x81, 3, 4, 0, 10,
    ]
}

pub fn string_descriptor(text: &str) -> Vec<u8> {
    let mut bytes = vec![0, 3];
    for code_unit in text.encode_utf16() {
        bytes.extend_from_slice(&code_unit.to_le_bytes());
    }
    bytes[0] = bytes.len() as u8;
    bytes
}

#[derive(Clone, Debug)]
pub struct FakeDevice {
    pub descriptor: DeviceDescriptor,
    pub configuration: Vec<u8>,
    pub strings: HashMap<u8, String>,
    // None: string descriptor zero fails (the device is suspended)
    pub language_ids: Option<Vec<u16>>,
    pub driver_key_name: String,
    pub device_instance_id: String,
}

impl FakeDevice {
    pub fn new(vendor_id: u16, product_id: u16, suffix: &str) -> Self {
        let descriptor = DeviceDescriptor {
            length: 18,
            descriptor_type: 1,
            usb_version: 0x0200,
            max_packet_size0: 8,
            vendor_id,
            product_id,
            device_version: 0x0100,
            manufacturer_index: 1,
            product_index: 2,
            serial_number_index: 3,
            num_configurations: 1,
            ..Default::default()
        };
        let mut strings = HashMap::new();
        strings.insert(1, "Contoso".to_string());
        strings.insert(2, format!("Device {:04X}:{:04X}", vendor_id, product_id));
        strings.insert(3, suffix.to_string());
        strings.insert(4, "Boot Mouse".to_string());
        FakeDevice {
            descriptor,
            configuration: mouse_configuration(),
            strings,
            language_ids: Some(vec![LANGUAGE_EN_US]),
            driver_key_name: format!("{{745a17a0-74d3-11d0-b6fe-00a0c90f57da}}\\{}", suffix),
            // NOTE: Windows renders the instance id with upper-case hex digits
            device_instance_id: format!("USB\\VID_{:04X}&PID_{:04X}\\{}", vendor_id, product_id, suffix),
        }
    }

    pub fn with_product(mut self, product: &str) -> Self {
        self.strings.insert(2, product.to_string());
        self
    }

    pub fn without_string(mut self, index: u8) -> Self {
        self.strings.remove(&index);
        self
    }

    pub fn suspended(mut self) -> Self {
        self.language_ids = None;
        self
    }

    pub fn with_configuration(mut self, configuration: Vec<u8>) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_instance_id(mut self, device_instance_id: &str) -> Self {
        self.device_instance_id = device_instance_id.to_string();
        self
    }
}

#[derive(Clone, Debug)]
pub enum FakePort {
    Device(FakeDevice),
    Hub { hub_name: String, driver_key_name: String },
    Failed(ConnectionStatus),
}

#[derive(Clone, Debug)]
pub struct FakeHub {
    pub port_count: u8,
    pub ports: BTreeMap<u32, FakePort>,
    // the hub driver rejects the EX form of the connection information query
    pub legacy_only: bool,
    pub openable: bool,
    pub node_information_failure: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct FakeHostController {
    pub device_path: String,
    pub driver_key_name: String,
    pub root_hub_name: String,
    pub openable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeQuery {
    pub kind: QueryKind,
    pub target: String,
    pub port: Option<u32>,
    // (descriptor type, descriptor index, language id)
    pub descriptor: Option<(u8, u8, u16)>,
}

pub struct FakeHandle {
    target: String,
    open_handles: Rc<Cell<usize>>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.open_handles.set(self.open_handles.get() - 1);
    }
}

#[derive(Default)]
pub struct FakeUsbHost {
    pub host_controllers: Vec<FakeHostController>,
    pub hubs: HashMap<String, FakeHub>,
    pub enumeration_failure: Option<u32>,
    open_handles: Rc<Cell<usize>>,
    max_open_handles: Cell<usize>,
    queries: RefCell<Vec<FakeQuery>>,
}

// ActualLength (u32) at `length_offset`, followed by a null-terminated utf-16 name
fn name_structure(header_len: usize, length_offset: usize, name: &str) -> Vec<u8> {
    let mut bytes = vec![0u8; header_len - 2];
    for code_unit in name.encode_utf16().chain(std::iter::once(0)) {
        bytes.extend_from_slice(&code_unit.to_le_bytes());
    }
    let total = bytes.len() as u32;
    bytes[length_offset..length_offset + 4].copy_from_slice(&total.to_le_bytes());
    bytes
}

// the OS copies as much of the structure as fits; a buffer smaller than the whole name still succeeds with ActualLength filled in
fn respond(buffer: &mut [u8], response: &[u8], preserve: usize) -> usize {
    let copy_len = response.len().min(buffer.len());
    buffer[preserve..copy_len].copy_from_slice(&response[preserve..copy_len]);
    copy_len
}

fn read_u32(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buffer[offset], buffer[offset + 1], buffer[offset + 2], buffer[offset + 3]])
}

fn read_u16(buffer: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buffer[offset], buffer[offset + 1]])
}

impl FakeUsbHost {
    pub fn new() -> Self {
        FakeUsbHost::default()
    }

    pub fn with_host_controller(mut self, device_path: &str, root_hub_name: &str, port_count: u8) -> Self {
        self.host_controllers.push(FakeHostController {
            device_path: device_path.to_string(),
            driver_key_name: format!("{{36fc9e60-c465-11cf-8056-444553540000}}\\{:04}", self.host_controllers.len()),
            root_hub_name: root_hub_name.to_string(),
            openable: true,
        });
        self.with_hub(root_hub_name, port_count)
    }

    pub fn with_unopenable_host_controller(mut self, device_path: &str) -> Self {
        self.host_controllers.push(FakeHostController {
            device_path: device_path.to_string(),
            driver_key_name: String::new(),
            root_hub_name: String::new(),
            openable: false,
        });
        self
    }

    pub fn with_hub(mut self, hub_name: &str, port_count: u8) -> Self {
        self.hubs.insert(hub_name.to_string(), FakeHub { port_count, ports: BTreeMap::new(), legacy_only: false, openable: true, node_information_failure: None });
        self
    }

    pub fn with_unopenable_hub(mut self, hub_name: &str) -> Self {
        if let Some(hub) = self.hubs.get_mut(hub_name) {
            hub.openable = false;
        }
        self
    }

    pub fn with_failing_node_information(mut self, hub_name: &str, win32_error: u32) -> Self {
        if let Some(hub) = self.hubs.get_mut(hub_name) {
            hub.node_information_failure = Some(win32_error);
        }
        self
    }

    // a hub whose connection name comes back empty
    pub fn with_nameless_hub(mut self, hub_name: &str, port: u32) -> Self {
        let driver_key_name = format!("{{36fc9e60-c465-11cf-8056-444553540000}}\\nameless{}", port);
        self.hubs.get_mut(hub_name).expect("unknown hub").ports.insert(port, FakePort::Hub { hub_name: String::new(), driver_key_name });
        self
    }

    pub fn with_legacy_hub(mut self, hub_name: &str) -> Self {
        if let Some(hub) = self.hubs.get_mut(hub_name) {
            hub.legacy_only = true;
        }
        self
    }

    pub fn with_device(mut self, hub_name: &str, port: u32, device: FakeDevice) -> Self {
        self.hubs.get_mut(hub_name).expect("unknown hub").ports.insert(port, FakePort::Device(device));
        self
    }

    pub fn with_external_hub(mut self, hub_name: &str, port: u32, external_hub_name: &str, port_count: u8) -> Self {
        let driver_key_name = format!("{{36fc9e60-c465-11cf-8056-444553540000}}\\{}", external_hub_name);
        self.hubs.get_mut(hub_name).expect("unknown hub").ports.insert(port, FakePort::Hub { hub_name: external_hub_name.to_string(), driver_key_name });
        self.with_hub(external_hub_name, port_count)
    }

    pub fn with_failed_port(mut self, hub_name: &str, port: u32, status: ConnectionStatus) -> Self {
        self.hubs.get_mut(hub_name).expect("unknown hub").ports.insert(port, FakePort::Failed(status));
        self
    }

    pub fn failing_enumeration(mut self, win32_error: u32) -> Self {
        self.enumeration_failure = Some(win32_error);
        self
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.get()
    }

    pub fn max_open_handles(&self) -> usize {
        self.max_open_handles.get()
    }

    pub fn queries(&self) -> Vec<FakeQuery> {
        self.queries.borrow().clone()
    }

    pub fn queries_for_port(&self, target: &str, port: u32) -> Vec<FakeQuery> {
        self.queries().into_iter().filter(|query| query.target == target && query.port == Some(port)).collect()
    }

    fn port(&self, hub_name: &str, port: u32) -> Option<&FakePort> {
        self.hubs.get(hub_name).and_then(|hub| hub.ports.get(&port))
    }

    fn connection_info(&self, hub_name: &str, port: u32, legacy: bool) -> ConnectionInfo {
        let mut connection = ConnectionInfo {
            connection_index: port,
            device_descriptor: None,
            current_configuration_value: 0,
            speed: if legacy { DeviceSpeed::Full } else { DeviceSpeed::High },
            device_is_hub: false,
            device_address: 0,
            number_of_open_pipes: 0,
            status: ConnectionStatus::NoDeviceConnected,
            pipes: Vec::new(),
            legacy,
        };
        match self.port(hub_name, port) {
            Some(FakePort::Device(device)) => {
                connection.device_descriptor = Some(device.descriptor);
                connection.current_configuration_value = 1;
                connection.device_address = port as u16 + 1;
                connection.number_of_open_pipes = 1;
                connection.status = ConnectionStatus::DeviceConnected;
                connection.pipes.push(PipeInfo {
                    endpoint: EndpointDescriptor { length: 7, endpoint_address: 0x81, attributes: 3, max_packet_size: 4, interval: 10 },
                    schedule_offset: 0,
                });
            },
            Some(FakePort::Hub { .. }) => {
                connection.device_descriptor = Some(DeviceDescriptor {
                    length: 18,
                    descriptor_type: 1,
                    usb_version: 0x0200,
                    device_class: 9,
                    max_packet_size0: 64,
                    vendor_id: 0x05e3,
                    product_id: 0x0610,
                    num_configurations: 1,
                    ..Default::default()
                });
                connection.current_configuration_value = 1;
                connection.device_is_hub = true;
                connection.device_address = port as u16 + 1;
                connection.status = ConnectionStatus::DeviceConnected;
            },
            Some(FakePort::Failed(status)) => {
                connection.status = *status;
            },
            None => {},
        }
        connection
    }

    fn hub_io_control(&self, hub_name: &str, kind: QueryKind, buffer: &mut [u8]) -> Result<usize, u32> {
        let hub = self.hubs.get(hub_name).ok_or(ERROR_FILE_NOT_FOUND)?;
        match kind {
            QueryKind::NodeInformation => {
                if let Some(win32_error) = hub.node_information_failure {
                    return Err(win32_error);
                }
                let information = HubInformation {
                    descriptor_length: 9,
                    descriptor_type: 0x29,
                    number_of_ports: hub.port_count,
                    hub_characteristics: 0x0009,
                    power_on_to_power_good: 50,
                    hub_control_current: 100,
                    is_bus_powered: false,
                };
                Ok(respond(buffer, &information.to_bytes(), 0))
            },
            QueryKind::NodeConnectionInformationEx | QueryKind::NodeConnectionInformation => {
                let legacy = kind == QueryKind::NodeConnectionInformation;
                if hub.legacy_only && !legacy {
                    return Err(ERROR_INVALID_FUNCTION);
                }
                let port = read_u32(buffer, 0);
                if port == 0 || port > hub.port_count as u32 {
                    return Err(ERROR_GEN_FAILURE);
                }
                let response = self.connection_info(hub_name, port, legacy).to_bytes();
                Ok(respond(buffer, &response, 0))
            },
            QueryKind::NodeConnectionName | QueryKind::NodeConnectionDriverKeyName => {
                let port = read_u32(buffer, 0);
                let name = match (self.port(hub_name, port), kind) {
                    (Some(FakePort::Hub { hub_name, .. }), QueryKind::NodeConnectionName) => hub_name.clone(),
                    (Some(FakePort::Hub { driver_key_name, .. }), _) => driver_key_name.clone(),
                    (Some(FakePort::Device(device)), QueryKind::NodeConnectionDriverKeyName) => device.driver_key_name.clone(),
                    (Some(FakePort::Failed(_)), QueryKind::NodeConnectionDriverKeyName) => format!("{{745a17a0-74d3-11d0-b6fe-00a0c90f57da}}\\failed{}", port),
                    _ => return Err(ERROR_GEN_FAILURE),
                };
                Ok(respond(buffer, &name_structure(10, 4, &name), 4))
            },
            QueryKind::DescriptorFromNodeConnection => {
                let port = read_u32(buffer, 0);
                let w_value = read_u16(buffer, 6);
                let language_id = read_u16(buffer, 8);
                let (descriptor_type, descriptor_index) = ((w_value >> 8) as u8, (w_value & 0xff) as u8);
                let device = match self.port(hub_name, port) {
                    Some(FakePort::Device(device)) => device,
                    _ => return Err(ERROR_GEN_FAILURE),
                };
                let descriptor = match (descriptor_type, descriptor_index) {
                    (2, 0) => device.configuration.clone(),
                    (3, 0) => match &device.language_ids {
                        Some(language_ids) => {
                            let mut bytes = vec![(2 + language_ids.len() * 2) as u8, 3];
                            for language_id in language_ids {
                                bytes.extend_from_slice(&language_id.to_le_bytes());
                            }
                            bytes
                        },
                        None => return Err(ERROR_GEN_FAILURE),
                    },
                    (3, index) => {
                        if device.language_ids.as_ref().map(|ids| ids.contains(&language_id)) != Some(true) {
                            return Err(ERROR_GEN_FAILURE);
                        }
                        match device.strings.get(&index) {
                            Some(text) => string_descriptor(text),
                            None => return Err(ERROR_GEN_FAILURE),
                        }
                    },
                    _ => return Err(ERROR_GEN_FAILURE),
                };
                let data_len = descriptor.len().min(buffer.len() - USB_DESCRIPTOR_REQUEST_SIZE);
                buffer[USB_DESCRIPTOR_REQUEST_SIZE..USB_DESCRIPTOR_REQUEST_SIZE + data_len].copy_from_slice(&descriptor[..data_len]);
                Ok(USB_DESCRIPTOR_REQUEST_SIZE + data_len)
            },
            _ => Err(ERROR_INVALID_FUNCTION),
        }
    }
}

impl UsbIoControl for FakeUsbHost {
    type Handle = FakeHandle;

    fn enumerate_host_controllers(&self) -> Result<Vec<HostControllerInterface>, EnumerateError> {
        if let Some(win32_error) = self.enumeration_failure {
            return Err(EnumerateError::Win32Error(win32_error));
        }
        Ok(self
            .host_controllers
            .iter()
            .enumerate()
            .map(|(index, host_controller)| HostControllerInterface {
                device_path: host_controller.device_path.clone(),
                device_instance_id: Some(format!("PCI\\VEN_8086&DEV_A36D&SUBSYS_00000000&REV_10\\3&11583659&0&{:02X}", index)),
                bus_number: Some(0),
                address: Some((0x14 << 16) | index as u32),
            })
            .collect())
    }

    fn open(&self, device_path: &str) -> Result<FakeHandle, u32> {
        let is_host_controller = self.host_controllers.iter().any(|host_controller| host_controller.device_path == device_path && host_controller.openable);
        let is_hub = device_path.strip_prefix("\\\\.\\").and_then(|hub_name| self.hubs.get(hub_name)).map(|hub| hub.openable) == Some(true);
        if !is_host_controller && !is_hub {
            return Err(ERROR_FILE_NOT_FOUND);
        }

        self.open_handles.set(self.open_handles.get() + 1);
        self.max_open_handles.set(self.max_open_handles.get().max(self.open_handles.get()));
        Ok(FakeHandle { target: device_path.to_string(), open_handles: self.open_handles.clone() })
    }

    fn io_control(&self, handle: &FakeHandle, kind: QueryKind, buffer: &mut [u8], _input_len: usize) -> Result<usize, u32> {
        let port = match kind {
            QueryKind::NodeConnectionInformation
            | QueryKind::NodeConnectionInformationEx
            | QueryKind::NodeConnectionName
            | QueryKind::NodeConnectionDriverKeyName
            | QueryKind::DescriptorFromNodeConnection => Some(read_u32(buffer, 0)),
            _ => None,
        };
        let descriptor = match kind {
            QueryKind::DescriptorFromNodeConnection => {
                let w_value = read_u16(buffer, 6);
                Some(((w_value >> 8) as u8, (w_value & 0xff) as u8, read_u16(buffer, 8)))
            },
            _ => None,
        };
        self.queries.borrow_mut().push(FakeQuery { kind, target: handle.target.clone(), port, descriptor });

        if let Some(host_controller) = self.host_controllers.iter().find(|host_controller| host_controller.device_path == handle.target) {
            let name = match kind {
                QueryKind::RootHubName => &host_controller.root_hub_name,
                QueryKind::HcdDriverKeyName => &host_controller.driver_key_name,
                _ => return Err(ERROR_INVALID_FUNCTION),
            };
            return Ok(respond(buffer, &name_structure(6, 0, name), 0));
        }

        let hub_name = handle.target.trim_start_matches("\\\\.\\").to_string();
        self.hub_io_control(&hub_name, kind, buffer)
    }

    fn device_instance_id_for_driver_key(&self, driver_key_name: &str) -> Result<Option<String>, u32> {
        for hub in self.hubs.values() {
            for port in hub.ports.values() {
                match port {
                    FakePort::Device(device) if device.driver_key_name == driver_key_name => return Ok(Some(device.device_instance_id.clone())),
                    FakePort::Hub { hub_name, driver_key_name: hub_driver_key_name } if hub_driver_key_name == driver_key_name => {
                        return Ok(Some(format!("USB\\VID_05E3&PID_0610\\{}", hub_name)));
                    },
                    _ => {},
                }
            }
        }
        Ok(None)
    }
}
