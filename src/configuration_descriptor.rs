// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{byte_buffer, DescriptorError, DeviceDescriptor, SubDescriptor};

pub const USB_CONFIGURATION_DESCRIPTOR_TYPE: u8 = 0x02;
pub const USB_OTHER_SPEED_CONFIGURATION_DESCRIPTOR_TYPE: u8 = 0x07;
pub const USB_CONFIGURATION_DESCRIPTOR_SIZE: usize = 9;

// every descriptor starts with bLength and bDescriptorType
const DESCRIPTOR_HEADER_SIZE: usize = 2;
// iConfiguration
const CONFIGURATION_INDEX_OFFSET: usize = 6;

/// A configuration descriptor (or other-speed configuration descriptor) and the descriptors which follow it,
/// up to wTotalLength.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_index: u8,
    pub attributes: u8,
    pub max_power: u8, // in units of 2mA (high speed) or 8mA (super speed)
    pub sub_descriptors: Vec<SubDescriptor>,
}

impl ConfigurationDescriptor {
    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.len() < USB_CONFIGURATION_DESCRIPTOR_SIZE {
            return Err(DescriptorError::BufferTooShort("configuration descriptor", USB_CONFIGURATION_DESCRIPTOR_SIZE, bytes.len()));
        }
        let length = byte_buffer::read_u8(bytes, 0)?;
        if length as usize != USB_CONFIGURATION_DESCRIPTOR_SIZE {
            return Err(DescriptorError::InvalidLength("configuration descriptor", length, USB_CONFIGURATION_DESCRIPTOR_SIZE));
        }
        let descriptor_type = byte_buffer::read_u8(bytes, 1)?;
        if descriptor_type != USB_CONFIGURATION_DESCRIPTOR_TYPE && descriptor_type != USB_OTHER_SPEED_CONFIGURATION_DESCRIPTOR_TYPE {
            return Err(DescriptorError::InvalidDescriptorType("configuration descriptor", descriptor_type));
        }
        let total_length = byte_buffer::read_u16_le(bytes, 2)?;
        if (total_length as usize) < USB_CONFIGURATION_DESCRIPTOR_SIZE {
            return Err(DescriptorError::TotalLengthTooSmall(total_length));
        }
        if bytes.len() < total_length as usize {
            return Err(DescriptorError::BufferTooShort("configuration descriptor", total_length as usize, bytes.len()));
        }

        // NOTE: anything after wTotalLength is ignored
        let sub_descriptors = ConfigurationDescriptor::scan_sub_descriptors(&bytes[..total_length as usize])?;

        Ok(ConfigurationDescriptor {
            length,
            descriptor_type,
            total_length,
            num_interfaces: byte_buffer::read_u8(bytes, 4)?,
            configuration_value: byte_buffer::read_u8(bytes, 5)?,
            configuration_index: byte_buffer::read_u8(bytes, CONFIGURATION_INDEX_OFFSET)?,
            attributes: byte_buffer::read_u8(bytes, 7)?,
            max_power: byte_buffer::read_u8(bytes, 8)?,
            sub_descriptors,
        })
    }

    /// Walks the descriptors which follow the 9-byte configuration header using only the bLength and
    /// bDescriptorType of each one.  The scan ends when fewer than two bytes remain.
    pub fn scan_sub_descriptors(configuration: &[u8]) -> Result<Vec<SubDescriptor>, DescriptorError> {
        let mut result = Vec::<SubDescriptor>::new();

        let end = configuration.len();
        let mut offset = USB_CONFIGURATION_DESCRIPTOR_SIZE;
        while offset + DESCRIPTOR_HEADER_SIZE <= end {
            let length = byte_buffer::read_u8(configuration, offset)?;

            // a descriptor which cannot hold its own header would stall the scan
            if (length as usize) < DESCRIPTOR_HEADER_SIZE {
                return Err(DescriptorError::InvalidSubDescriptorLength(offset, length));
            }
            if offset + length as usize > end {
                return Err(DescriptorError::SubDescriptorOverrun(offset, length, end));
            }
            let descriptor_bytes = byte_buffer::read_slice(configuration, offset, length as usize)?;
            result.push(SubDescriptor::decode(descriptor_bytes, offset)?);

            offset += length as usize;
        }

        Ok(result)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let total_length = self.total_length.to_le_bytes();
        let mut bytes = vec![
            self.length,
            self.descriptor_type,
            total_length[0], total_length[1],
            self.num_interfaces,
            self.configuration_value,
            self.configuration_index,
            self.attributes,
            self.max_power,
        ];
        for sub_descriptor in &self.sub_descriptors {
            bytes.extend_from_slice(&sub_descriptor.to_bytes());
        }
        bytes
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &crate::InterfaceDescriptor> {
        self.sub_descriptors.iter().filter_map(|sub_descriptor| match sub_descriptor {
            SubDescriptor::Interface(interface) => Some(interface),
            _ => None,
        })
    }

    /// String indices referenced by this configuration: iConfiguration, then each interface's iInterface,
    /// each interface association's iFunction and the iConfiguration of any configuration descriptor found
    /// past the header, in descriptor order, without duplicates or zeros.
    pub fn string_indices(&self) -> Vec<u8> {
        let mut result = Vec::<u8>::new();
        let mut push = |index: u8| {
            if index != 0 && !result.contains(&index) {
                result.push(index);
            }
        };

        push(self.configuration_index);
        for sub_descriptor in &self.sub_descriptors {
            match sub_descriptor {
                SubDescriptor::Interface(interface) => push(interface.interface_index),
                SubDescriptor::InterfaceAssociation(association) => push(association.function_index),
                SubDescriptor::Other { descriptor_type, data }
                    if *descriptor_type == USB_CONFIGURATION_DESCRIPTOR_TYPE || *descriptor_type == USB_OTHER_SPEED_CONFIGURATION_DESCRIPTOR_TYPE =>
                {
                    if let Some(configuration_index) = data.get(CONFIGURATION_INDEX_OFFSET) {
                        push(*configuration_index);
                    }
                },
                _ => {},
            }
        }

        result
    }
}

/// Returns true if the device or its configuration references at least one string descriptor.
pub fn has_string_descriptors(device: &DeviceDescriptor, configuration: Option<&ConfigurationDescriptor>) -> bool {
    if device.has_string_indices() {
        return true;
    }
    match configuration {
        Some(configuration) => !configuration.string_indices().is_empty(),
        None => false,
    }
}
