// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::BufferBoundsError;
use std::ops::Deref;

// NOTE: all multi-byte fields in USB descriptors and in the (packed) usbioctl.h structures are little-endian

fn checked_range(bytes_len: usize, offset: usize, width: usize) -> Result<std::ops::Range<usize>, BufferBoundsError> {
    match offset.checked_add(width) {
        Some(end) if end <= bytes_len => Ok(offset..end),
        _ => Err(BufferBoundsError { offset, width, len: bytes_len }),
    }
}

pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, BufferBoundsError> {
    let range = checked_range(bytes.len(), offset, 1)?;
    Ok(bytes[range.start])
}

pub fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16, BufferBoundsError> {
    let range = checked_range(bytes.len(), offset, 2)?;
    Ok(u16::from_le_bytes([bytes[range.start], bytes[range.start + 1]]))
}

pub fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, BufferBoundsError> {
    let range = checked_range(bytes.len(), offset, 4)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[range]);
    Ok(u32::from_le_bytes(raw))
}

pub fn read_slice(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], BufferBoundsError> {
    let range = checked_range(bytes.len(), offset, len)?;
    Ok(&bytes[range])
}

/// Reads a UTF-16LE string which starts at `offset` and runs to the end of `bytes` or to the first null
/// character, whichever comes first.  A trailing odd byte is ignored.
pub fn read_utf16_until_null(bytes: &[u8], offset: usize) -> Result<Result<String, std::string::FromUtf16Error>, BufferBoundsError> {
    let tail = read_slice(bytes, offset, bytes.len().saturating_sub(offset))?;
    let code_units: Vec<u16> = tail
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|code_unit| *code_unit != 0)
        .collect();
    Ok(String::from_utf16(&code_units))
}

/// An owned, zero-initialised byte buffer with bounds-checked little-endian field writers.
///
/// Used as the in/out buffer of every topology query; the structures exchanged with the OS are never aliased
/// as Rust structs, they are always read and written field-by-field at explicit offsets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    pub fn zeroed(len: usize) -> Self {
        ByteBuffer { bytes: vec![0; len] }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), BufferBoundsError> {
        let range = checked_range(self.bytes.len(), offset, 1)?;
        self.bytes[range.start] = value;
        Ok(())
    }

    pub fn write_u16_le(&mut self, offset: usize, value: u16) -> Result<(), BufferBoundsError> {
        let range = checked_range(self.bytes.len(), offset, 2)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_u32_le(&mut self, offset: usize, value: u32) -> Result<(), BufferBoundsError> {
        let range = checked_range(self.bytes.len(), offset, 4)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_slice(&mut self, offset: usize, value: &[u8]) -> Result<(), BufferBoundsError> {
        let range = checked_range(self.bytes.len(), offset, value.len())?;
        self.bytes[range].copy_from_slice(value);
        Ok(())
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        ByteBuffer { bytes }
    }
}
