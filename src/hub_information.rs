// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{byte_buffer, size_negotiated_query::USB_NODE_INFORMATION_SIZE, DescriptorError};

// USB_HUB_NODE
const USB_HUB_NODE_TYPE: u32 = 0;

const NODE_TYPE_OFFSET: usize = 0;
const HUB_DESCRIPTOR_OFFSET: usize = 4;
const HUB_IS_BUS_POWERED_OFFSET: usize = 75;

/// The hub descriptor and power source reported for a (root or external) hub.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HubInformation {
    pub descriptor_length: u8,
    pub descriptor_type: u8,
    pub number_of_ports: u8,
    pub hub_characteristics: u16,
    pub power_on_to_power_good: u8, // in units of 2ms
    pub hub_control_current: u8, // in mA
    pub is_bus_powered: bool,
}

impl HubInformation {
    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.len() < USB_NODE_INFORMATION_SIZE {
            return Err(DescriptorError::BufferTooShort("hub node information", USB_NODE_INFORMATION_SIZE, bytes.len()));
        }
        let node_type = byte_buffer::read_u32_le(bytes, NODE_TYPE_OFFSET)?;
        if node_type != USB_HUB_NODE_TYPE {
            return Err(DescriptorError::UnexpectedNodeType(node_type));
        }

        Ok(HubInformation {
            descriptor_length: byte_buffer::read_u8(bytes, HUB_DESCRIPTOR_OFFSET)?,
            descriptor_type: byte_buffer::read_u8(bytes, HUB_DESCRIPTOR_OFFSET + 1)?,
            number_of_ports: byte_buffer::read_u8(bytes, HUB_DESCRIPTOR_OFFSET + 2)?,
            hub_characteristics: byte_buffer::read_u16_le(bytes, HUB_DESCRIPTOR_OFFSET + 3)?,
            power_on_to_power_good: byte_buffer::read_u8(bytes, HUB_DESCRIPTOR_OFFSET + 5)?,
            hub_control_current: byte_buffer::read_u8(bytes, HUB_DESCRIPTOR_OFFSET + 6)?,
            is_bus_powered: byte_buffer::read_u8(bytes, HUB_IS_BUS_POWERED_OFFSET)? != 0,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; USB_NODE_INFORMATION_SIZE];
        bytes[HUB_DESCRIPTOR_OFFSET] = self.descriptor_length;
        bytes[HUB_DESCRIPTOR_OFFSET + 1] = self.descriptor_type;
        bytes[HUB_DESCRIPTOR_OFFSET + 2] = self.number_of_ports;
        bytes[HUB_DESCRIPTOR_OFFSET + 3..HUB_DESCRIPTOR_OFFSET + 5].copy_from_slice(&self.hub_characteristics.to_le_bytes());
        bytes[HUB_DESCRIPTOR_OFFSET + 5] = self.power_on_to_power_good;
        bytes[HUB_DESCRIPTOR_OFFSET + 6] = self.hub_control_current;
        bytes[HUB_IS_BUS_POWERED_OFFSET] = self.is_bus_powered as u8;
        bytes
    }

    // wHubCharacteristics bit 2
    pub fn is_compound_device(&self) -> bool {
        self.hub_characteristics & 0x0004 != 0
    }
}
