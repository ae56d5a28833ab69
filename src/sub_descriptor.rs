// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{byte_buffer, DescriptorError};

pub const USB_INTERFACE_DESCRIPTOR_TYPE: u8 = 0x04;
pub const USB_ENDPOINT_DESCRIPTOR_TYPE: u8 = 0x05;
pub const USB_INTERFACE_ASSOCIATION_DESCRIPTOR_TYPE: u8 = 0x0B;

pub const USB_INTERFACE_DESCRIPTOR_SIZE: usize = 9;
// USB_INTERFACE_DESCRIPTOR2 appends wNumClasses
pub const USB_INTERFACE_DESCRIPTOR2_SIZE: usize = 11;
pub const USB_ENDPOINT_DESCRIPTOR_SIZE: usize = 7;
pub const USB_INTERFACE_ASSOCIATION_DESCRIPTOR_SIZE: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_index: u8,
    pub num_classes: Option<u16>,
}

impl InterfaceDescriptor {
    fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let length = byte_buffer::read_u8(bytes, 0)?;
        let num_classes = match length as usize {
            USB_INTERFACE_DESCRIPTOR2_SIZE => Some(byte_buffer::read_u16_le(bytes, 9)?),
            _ => None,
        };
        Ok(InterfaceDescriptor {
            length,
            interface_number: byte_buffer::read_u8(bytes, 2)?,
            alternate_setting: byte_buffer::read_u8(bytes, 3)?,
            num_endpoints: byte_buffer::read_u8(bytes, 4)?,
            interface_class: byte_buffer::read_u8(bytes, 5)?,
            interface_subclass: byte_buffer::read_u8(bytes, 6)?,
            interface_protocol: byte_buffer::read_u8(bytes, 7)?,
            interface_index: byte_buffer::read_u8(bytes, 8)?,
            num_classes,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![
            self.length,
            USB_INTERFACE_DESCRIPTOR_TYPE,
            self.interface_number,
            self.alternate_setting,
            self.num_endpoints,
            self.interface_class,
            self.interface_subclass,
            self.interface_protocol,
            self.interface_index,
        ];
        if let Some(num_classes) = self.num_classes {
            bytes.extend_from_slice(&num_classes.to_le_bytes());
        }
        bytes
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceAssociationDescriptor {
    pub length: u8,
    pub first_interface: u8,
    pub interface_count: u8,
    pub function_class: u8,
    pub function_subclass: u8,
    pub function_protocol: u8,
    pub function_index: u8,
}

impl InterfaceAssociationDescriptor {
    fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        Ok(InterfaceAssociationDescriptor {
            length: byte_buffer::read_u8(bytes, 0)?,
            first_interface: byte_buffer::read_u8(bytes, 2)?,
            interface_count: byte_buffer::read_u8(bytes, 3)?,
            function_class: byte_buffer::read_u8(bytes, 4)?,
            function_subclass: byte_buffer::read_u8(bytes, 5)?,
            function_protocol: byte_buffer::read_u8(bytes, 6)?,
            function_index: byte_buffer::read_u8(bytes, 7)?,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        vec![
            self.length,
            USB_INTERFACE_ASSOCIATION_DESCRIPTOR_TYPE,
            self.first_interface,
            self.interface_count,
            self.function_class,
            self.function_subclass,
            self.function_protocol,
            self.function_index,
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub endpoint_address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.len() < USB_ENDPOINT_DESCRIPTOR_SIZE {
            return Err(DescriptorError::BufferTooShort("endpoint descriptor", USB_ENDPOINT_DESCRIPTOR_SIZE, bytes.len()));
        }
        Ok(EndpointDescriptor {
            length: byte_buffer::read_u8(bytes, 0)?,
            endpoint_address: byte_buffer::read_u8(bytes, 2)?,
            attributes: byte_buffer::read_u8(bytes, 3)?,
            max_packet_size: byte_buffer::read_u16_le(bytes, 4)?,
            interval: byte_buffer::read_u8(bytes, 6)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; USB_ENDPOINT_DESCRIPTOR_SIZE] {
        let max_packet_size = self.max_packet_size.to_le_bytes();
        [
            self.length,
            USB_ENDPOINT_DESCRIPTOR_TYPE,
            self.endpoint_address,
            self.attributes,
            max_packet_size[0], max_packet_size[1],
            self.interval,
        ]
    }

    pub fn endpoint_number(&self) -> u8 {
        self.endpoint_address & 0x0F
    }

    pub fn is_in(&self) -> bool {
        self.endpoint_address & 0x80 != 0
    }
}

/// One descriptor found inside a configuration descriptor, after the configuration header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubDescriptor {
    InterfaceAssociation(InterfaceAssociationDescriptor),
    Interface(InterfaceDescriptor),
    Endpoint(EndpointDescriptor),
    // class-specific, vendor-specific or otherwise unrecognised; kept verbatim (header included)
    Other {
        descriptor_type: u8,
        data: Vec<u8>,
    },
}

impl SubDescriptor {
    /// Decodes one sub-descriptor; `bytes` is exactly the bLength bytes of the descriptor and `offset` is its
    /// position inside the configuration (for error context).
    pub(crate) fn decode(bytes: &[u8], offset: usize) -> Result<Self, DescriptorError> {
        let length = byte_buffer::read_u8(bytes, 0)?;
        let descriptor_type = byte_buffer::read_u8(bytes, 1)?;

        match descriptor_type {
            USB_INTERFACE_DESCRIPTOR_TYPE => {
                let length_usize = length as usize;
                if length_usize != USB_INTERFACE_DESCRIPTOR_SIZE && length_usize != USB_INTERFACE_DESCRIPTOR2_SIZE {
                    return Err(DescriptorError::InvalidInterfaceLength(offset, length));
                }
                Ok(SubDescriptor::Interface(InterfaceDescriptor::decode(bytes)?))
            },
            USB_INTERFACE_ASSOCIATION_DESCRIPTOR_TYPE => {
                if (length as usize) < USB_INTERFACE_ASSOCIATION_DESCRIPTOR_SIZE {
                    return Err(DescriptorError::InvalidInterfaceAssociationLength(offset, length));
                }
                Ok(SubDescriptor::InterfaceAssociation(InterfaceAssociationDescriptor::decode(bytes)?))
            },
            // a short endpoint descriptor is kept verbatim rather than rejected
            USB_ENDPOINT_DESCRIPTOR_TYPE if length as usize >= USB_ENDPOINT_DESCRIPTOR_SIZE => {
                Ok(SubDescriptor::Endpoint(EndpointDescriptor::decode(bytes)?))
            },
            _ => Ok(SubDescriptor::Other { descriptor_type, data: bytes.to_vec() }),
        }
    }

    pub fn descriptor_type(&self) -> u8 {
        match self {
            SubDescriptor::InterfaceAssociation(_) => USB_INTERFACE_ASSOCIATION_DESCRIPTOR_TYPE,
            SubDescriptor::Interface(_) => USB_INTERFACE_DESCRIPTOR_TYPE,
            SubDescriptor::Endpoint(_) => USB_ENDPOINT_DESCRIPTOR_TYPE,
            SubDescriptor::Other { descriptor_type, .. } => *descriptor_type,
        }
    }

    /// The declared bLength of the descriptor.
    pub fn length(&self) -> u8 {
        match self {
            SubDescriptor::InterfaceAssociation(descriptor) => descriptor.length,
            SubDescriptor::Interface(descriptor) => descriptor.length,
            SubDescriptor::Endpoint(descriptor) => descriptor.length,
            SubDescriptor::Other { data, .. } => data.len() as u8,
        }
    }

    /// Re-encodes the descriptor.  Bytes past the standard fields of a recognised descriptor (e.g. the audio
    /// class bRefresh/bSynchAddress endpoint extension) are not retained and are written as zeros.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = match self {
            SubDescriptor::InterfaceAssociation(descriptor) => descriptor.to_bytes(),
            SubDescriptor::Interface(descriptor) => descriptor.to_bytes(),
            SubDescriptor::Endpoint(descriptor) => descriptor.to_bytes().to_vec(),
            SubDescriptor::Other { data, .. } => return data.clone(),
        };
        bytes.resize(self.length() as usize, 0);
        bytes
    }
}
