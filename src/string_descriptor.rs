// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{byte_buffer, DescriptorError};

pub const USB_STRING_DESCRIPTOR_TYPE: u8 = 0x03;

fn string_payload(bytes: &[u8]) -> Result<&[u8], DescriptorError> {
    if bytes.len() < 2 {
        return Err(DescriptorError::BufferTooShort("string descriptor", 2, bytes.len()));
    }
    let length = byte_buffer::read_u8(bytes, 0)?;
    if (length as usize) < 2 || length as usize > bytes.len() {
        return Err(DescriptorError::InvalidLength("string descriptor", length, bytes.len()));
    }
    let descriptor_type = byte_buffer::read_u8(bytes, 1)?;
    if descriptor_type != USB_STRING_DESCRIPTOR_TYPE {
        return Err(DescriptorError::InvalidDescriptorType("string descriptor", descriptor_type));
    }

    let payload_len = length as usize - 2;
    if payload_len % 2 != 0 {
        return Err(DescriptorError::OddStringLength(payload_len));
    }
    Ok(byte_buffer::read_slice(bytes, 2, payload_len)?)
}

/// Decodes a string descriptor (bLength, bDescriptorType, UTF-16LE code units) into text.  Embedded null
/// characters are dropped.
pub fn decode_string(bytes: &[u8]) -> Result<String, DescriptorError> {
    let payload = string_payload(bytes)?;
    let code_units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .filter(|code_unit| *code_unit != 0)
        .collect();
    Ok(String::from_utf16(&code_units)?)
}

/// Decodes string descriptor zero, which carries the array of supported language ids (LANGIDs) rather than text.
pub fn decode_language_ids(bytes: &[u8]) -> Result<Vec<u16>, DescriptorError> {
    let payload = string_payload(bytes)?;
    Ok(payload.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect())
}
