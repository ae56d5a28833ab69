// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{
    byte_buffer,
    size_negotiated_query::{USB_NODE_CONNECTION_INFORMATION_SIZE, USB_PIPE_INFO_SIZE},
    sub_descriptor::USB_ENDPOINT_DESCRIPTOR_SIZE,
    ConnectionStatus,
    DescriptorError,
    DeviceDescriptor,
    DeviceSpeed,
    EndpointDescriptor,
};

// field offsets within USB_NODE_CONNECTION_INFORMATION(_EX); the two forms differ only in the byte at offset 23
const CONNECTION_INDEX_OFFSET: usize = 0;
const DEVICE_DESCRIPTOR_OFFSET: usize = 4;
const CURRENT_CONFIGURATION_VALUE_OFFSET: usize = 22;
const SPEED_OFFSET: usize = 23; // Speed (EX) or LowSpeed (legacy)
const DEVICE_IS_HUB_OFFSET: usize = 24;
const DEVICE_ADDRESS_OFFSET: usize = 25;
const NUMBER_OF_OPEN_PIPES_OFFSET: usize = 27;
const CONNECTION_STATUS_OFFSET: usize = 31;
const PIPE_LIST_OFFSET: usize = USB_NODE_CONNECTION_INFORMATION_SIZE;

/// One open pipe of a connected device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipeInfo {
    pub endpoint: EndpointDescriptor,
    pub schedule_offset: u32,
}

/// The connection information which a hub reports for one of its ports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_index: u32,
    // None if the port is empty or the hub reported an unusable descriptor for a failed device
    pub device_descriptor: Option<DeviceDescriptor>,
    pub current_configuration_value: u8,
    pub speed: DeviceSpeed,
    pub device_is_hub: bool,
    pub device_address: u16,
    pub number_of_open_pipes: u32,
    pub status: ConnectionStatus,
    pub pipes: Vec<PipeInfo>,
    // true if the hub driver only supports the original (pre-EX) form of the query
    pub legacy: bool,
}

impl ConnectionInfo {
    pub fn decode_ex(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let speed = DeviceSpeed::from(byte_buffer::read_u8(bytes, SPEED_OFFSET)?);
        ConnectionInfo::decode_with_speed(bytes, speed, false)
    }

    /// Decodes the legacy form, translating its LowSpeed flag into a speed.
    pub fn decode_legacy(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let low_speed = byte_buffer::read_u8(bytes, SPEED_OFFSET)? != 0;
        let speed = if low_speed { DeviceSpeed::Low } else { DeviceSpeed::Full };
        ConnectionInfo::decode_with_speed(bytes, speed, true)
    }

    fn decode_with_speed(bytes: &[u8], speed: DeviceSpeed, legacy: bool) -> Result<Self, DescriptorError> {
        if bytes.len() < USB_NODE_CONNECTION_INFORMATION_SIZE {
            return Err(DescriptorError::BufferTooShort("connection information", USB_NODE_CONNECTION_INFORMATION_SIZE, bytes.len()));
        }

        let status = ConnectionStatus::from(byte_buffer::read_u32_le(bytes, CONNECTION_STATUS_OFFSET)?);
        let descriptor_bytes = byte_buffer::read_slice(bytes, DEVICE_DESCRIPTOR_OFFSET, CURRENT_CONFIGURATION_VALUE_OFFSET - DEVICE_DESCRIPTOR_OFFSET)?;
        // NOTE: only a connected device is required to carry a valid device descriptor
        let device_descriptor = match status {
            ConnectionStatus::DeviceConnected => Some(DeviceDescriptor::decode(descriptor_bytes)?),
            ConnectionStatus::NoDeviceConnected => None,
            _ => DeviceDescriptor::decode(descriptor_bytes).ok(),
        };

        // the pipe list holds as many entries as fit in the response, up to NumberOfOpenPipes
        let number_of_open_pipes = byte_buffer::read_u32_le(bytes, NUMBER_OF_OPEN_PIPES_OFFSET)?;
        let mut pipes = Vec::<PipeInfo>::new();
        for pipe_index in 0..number_of_open_pipes as usize {
            let offset = PIPE_LIST_OFFSET + pipe_index * USB_PIPE_INFO_SIZE;
            if offset + USB_PIPE_INFO_SIZE > bytes.len() {
                break;
            }
            pipes.push(PipeInfo {
                endpoint: EndpointDescriptor::decode(byte_buffer::read_slice(bytes, offset, USB_ENDPOINT_DESCRIPTOR_SIZE)?)?,
                schedule_offset: byte_buffer::read_u32_le(bytes, offset + USB_ENDPOINT_DESCRIPTOR_SIZE)?,
            });
        }

        Ok(ConnectionInfo {
            connection_index: byte_buffer::read_u32_le(bytes, CONNECTION_INDEX_OFFSET)?,
            device_descriptor,
            current_configuration_value: byte_buffer::read_u8(bytes, CURRENT_CONFIGURATION_VALUE_OFFSET)?,
            speed,
            device_is_hub: byte_buffer::read_u8(bytes, DEVICE_IS_HUB_OFFSET)? != 0,
            device_address: byte_buffer::read_u16_le(bytes, DEVICE_ADDRESS_OFFSET)?,
            number_of_open_pipes,
            status,
            pipes,
            legacy,
        })
    }

    /// Encodes the EX form of the structure (or the legacy form, if `legacy` is set).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::<u8>::with_capacity(PIPE_LIST_OFFSET + self.pipes.len() * USB_PIPE_INFO_SIZE);
        bytes.extend_from_slice(&self.connection_index.to_le_bytes());
        match &self.device_descriptor {
            Some(descriptor) => bytes.extend_from_slice(&descriptor.to_bytes()),
            None => bytes.extend_from_slice(&[0u8; 18]),
        }
        bytes.push(self.current_configuration_value);
        bytes.push(match self.legacy {
            true => (self.speed == DeviceSpeed::Low) as u8,
            false => self.speed.as_u8(),
        });
        bytes.push(self.device_is_hub as u8);
        bytes.extend_from_slice(&self.device_address.to_le_bytes());
        bytes.extend_from_slice(&self.number_of_open_pipes.to_le_bytes());
        bytes.extend_from_slice(&self.status.as_u32().to_le_bytes());
        for pipe in &self.pipes {
            bytes.extend_from_slice(&pipe.endpoint.to_bytes());
            bytes.extend_from_slice(&pipe.schedule_offset.to_le_bytes());
        }
        bytes
    }

    pub fn is_empty(&self) -> bool {
        self.status == ConnectionStatus::NoDeviceConnected
    }
}
