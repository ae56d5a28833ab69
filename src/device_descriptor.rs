// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{byte_buffer, DescriptorError};

pub const USB_DEVICE_DESCRIPTOR_SIZE: usize = 18;

/// The standard USB device descriptor (USB 2.0 §9.6.1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub usb_version: u16, // bcdUSB
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_version: u16, // bcdDevice
    pub manufacturer_index: u8,
    pub product_index: u8,
    pub serial_number_index: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.len() < USB_DEVICE_DESCRIPTOR_SIZE {
            return Err(DescriptorError::BufferTooShort("device descriptor", USB_DEVICE_DESCRIPTOR_SIZE, bytes.len()));
        }
        let length = byte_buffer::read_u8(bytes, 0)?;
        if length as usize != USB_DEVICE_DESCRIPTOR_SIZE {
            return Err(DescriptorError::InvalidLength("device descriptor", length, USB_DEVICE_DESCRIPTOR_SIZE));
        }

        // NOTE: the descriptor type is not validated; hubs report zeroed descriptors for ports in some failure states
        Ok(DeviceDescriptor {
            length,
            descriptor_type: byte_buffer::read_u8(bytes, 1)?,
            usb_version: byte_buffer::read_u16_le(bytes, 2)?,
            device_class: byte_buffer::read_u8(bytes, 4)?,
            device_subclass: byte_buffer::read_u8(bytes, 5)?,
            device_protocol: byte_buffer::read_u8(bytes, 6)?,
            max_packet_size0: byte_buffer::read_u8(bytes, 7)?,
            vendor_id: byte_buffer::read_u16_le(bytes, 8)?,
            product_id: byte_buffer::read_u16_le(bytes, 10)?,
            device_version: byte_buffer::read_u16_le(bytes, 12)?,
            manufacturer_index: byte_buffer::read_u8(bytes, 14)?,
            product_index: byte_buffer::read_u8(bytes, 15)?,
            serial_number_index: byte_buffer::read_u8(bytes, 16)?,
            num_configurations: byte_buffer::read_u8(bytes, 17)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; USB_DEVICE_DESCRIPTOR_SIZE] {
        let usb_version = self.usb_version.to_le_bytes();
        let vendor_id = self.vendor_id.to_le_bytes();
        let product_id = self.product_id.to_le_bytes();
        let device_version = self.device_version.to_le_bytes();
        [
            self.length,
            self.descriptor_type,
            usb_version[0], usb_version[1],
            self.device_class,
            self.device_subclass,
            self.device_protocol,
            self.max_packet_size0,
            vendor_id[0], vendor_id[1],
            product_id[0], product_id[1],
            device_version[0], device_version[1],
            self.manufacturer_index,
            self.product_index,
            self.serial_number_index,
            self.num_configurations,
        ]
    }

    pub fn has_string_indices(&self) -> bool {
        self.manufacturer_index != 0 || self.product_index != 0 || self.serial_number_index != 0
    }
}
