// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{
    byte_buffer::{self, ByteBuffer},
    configuration_descriptor::{USB_CONFIGURATION_DESCRIPTOR_SIZE, USB_CONFIGURATION_DESCRIPTOR_TYPE},
    io_control::{ERROR_INSUFFICIENT_BUFFER, ERROR_MORE_DATA},
    string_descriptor::USB_STRING_DESCRIPTOR_TYPE,
    QueryError,
    QueryKind,
    UsbIoControl,
};
use log::debug;

// the first attempt plus at most two renegotiations
pub const MAX_QUERY_ATTEMPTS: u32 = 3;

// sizes of the fixed parts of the usbioctl.h structures (all declared with 1-byte packing)
pub const USB_HCD_NAME_SIZE: usize = 6; // USB_ROOT_HUB_NAME, USB_HCD_DRIVERKEY_NAME
pub const USB_NODE_CONNECTION_NAME_SIZE: usize = 10; // USB_NODE_CONNECTION_NAME, USB_NODE_CONNECTION_DRIVERKEY_NAME
pub const USB_NODE_INFORMATION_SIZE: usize = 76;
pub const USB_DESCRIPTOR_REQUEST_SIZE: usize = 12;
pub const USB_NODE_CONNECTION_INFORMATION_SIZE: usize = 35;
pub const USB_PIPE_INFO_SIZE: usize = 11;
// NOTE: connection information is requested with room for a generous fixed number of open pipes rather than a computed count
pub const MAX_PIPES_PER_CONNECTION: usize = 30;
pub const MAXIMUM_USB_STRING_LENGTH: usize = 255;
// the largest response any request can need: a descriptor request header followed by a u16-sized payload
pub const MAX_QUERY_BUFFER_SIZE: usize = USB_DESCRIPTOR_REQUEST_SIZE + u16::MAX as usize;

/// The request fields written into the query buffer before it is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestHeader {
    None,
    ConnectionIndex(/*connection_index: */u32),
    // USB_DESCRIPTOR_REQUEST: ConnectionIndex followed by a GET_DESCRIPTOR setup packet
    Descriptor {
        connection_index: u32,
        descriptor_type: u8,
        descriptor_index: u8,
        language_id: u16,
    },
}

impl RequestHeader {
    fn write(&self, buffer: &mut ByteBuffer) -> Result<(), QueryError> {
        match *self {
            RequestHeader::None => {},
            RequestHeader::ConnectionIndex(connection_index) => {
                buffer.write_u32_le(0, connection_index)?;
            },
            RequestHeader::Descriptor { connection_index, descriptor_type, descriptor_index, language_id } => {
                // NOTE: the hub driver fills in bmRequest and bRequest itself; we set them anyway so the request is self-describing
                let data_len = buffer.len().saturating_sub(USB_DESCRIPTOR_REQUEST_SIZE);
                buffer.write_u32_le(0, connection_index)?;
                buffer.write_u8(4, 0x80)?; // bmRequest: device-to-host, standard, device
                buffer.write_u8(5, 0x06)?; // bRequest: GET_DESCRIPTOR
                buffer.write_u16_le(6, ((descriptor_type as u16) << 8) | descriptor_index as u16)?; // wValue
                buffer.write_u16_le(8, language_id)?; // wIndex
                buffer.write_u16_le(10, data_len.min(u16::MAX as usize) as u16)?; // wLength
            },
        }
        Ok(())
    }

    // number of leading bytes which carry request data
    fn input_len(&self, buffer_len: usize) -> usize {
        match self {
            RequestHeader::None => 0,
            _ => buffer_len,
        }
    }
}

/// Where a response declares the size of the complete structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActualLength {
    // a u32 holding the total structure size in bytes (the ActualLength field of the name structures)
    Total32 { offset: usize },
    // a u16 holding the size of a payload which follows a request header (wTotalLength of a configuration descriptor)
    Payload16 { offset: usize, header: usize },
}

impl ActualLength {
    fn required_len(&self, bytes: &[u8]) -> Result<usize, QueryError> {
        Ok(match *self {
            ActualLength::Total32 { offset } => byte_buffer::read_u32_le(bytes, offset)? as usize,
            ActualLength::Payload16 { offset, header } => header + byte_buffer::read_u16_le(bytes, offset)? as usize,
        })
    }
}

/// How the byte count reported by a successful call is checked against the buffer which was sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseLength {
    // the response must fill the buffer exactly; anything else is treated as corruption
    Exact,
    // the buffer is a fixed upper bound; the response is truncated to the reported byte count
    UpTo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub kind: QueryKind,
    pub header: RequestHeader,
    pub initial_len: usize,
    pub actual_length: Option<ActualLength>,
    pub response: ResponseLength,
}
//
impl QueryRequest {
    pub fn root_hub_name() -> Self {
        QueryRequest::hcd_name(QueryKind::RootHubName)
    }
    //
    pub fn hcd_driver_key_name() -> Self {
        QueryRequest::hcd_name(QueryKind::HcdDriverKeyName)
    }
    //
    pub fn node_information() -> Self {
        QueryRequest {
            kind: QueryKind::NodeInformation,
            header: RequestHeader::None,
            initial_len: USB_NODE_INFORMATION_SIZE,
            actual_length: None,
            response: ResponseLength::UpTo,
        }
    }
    //
    pub fn node_connection_information_ex(connection_index: u32) -> Self {
        QueryRequest::node_connection_information_with_kind(QueryKind::NodeConnectionInformationEx, connection_index)
    }
    //
    pub fn node_connection_information(connection_index: u32) -> Self {
        QueryRequest::node_connection_information_with_kind(QueryKind::NodeConnectionInformation, connection_index)
    }
    //
    pub fn node_connection_name(connection_index: u32) -> Self {
        QueryRequest::node_connection_name_with_kind(QueryKind::NodeConnectionName, connection_index)
    }
    //
    pub fn node_connection_driver_key_name(connection_index: u32) -> Self {
        QueryRequest::node_connection_name_with_kind(QueryKind::NodeConnectionDriverKeyName, connection_index)
    }
    //
    // NOTE: the first attempt is sized for the configuration header only; wTotalLength then sizes the second attempt
    pub fn configuration_descriptor(connection_index: u32, descriptor_index: u8) -> Self {
        QueryRequest {
            kind: QueryKind::DescriptorFromNodeConnection,
            header: RequestHeader::Descriptor {
                connection_index,
                descriptor_type: USB_CONFIGURATION_DESCRIPTOR_TYPE,
                descriptor_index,
                language_id: 0,
            },
            initial_len: USB_DESCRIPTOR_REQUEST_SIZE + USB_CONFIGURATION_DESCRIPTOR_SIZE,
            actual_length: Some(ActualLength::Payload16 { offset: USB_DESCRIPTOR_REQUEST_SIZE + 2, header: USB_DESCRIPTOR_REQUEST_SIZE }),
            response: ResponseLength::Exact,
        }
    }
    //
    pub fn string_descriptor(connection_index: u32, descriptor_index: u8, language_id: u16) -> Self {
        QueryRequest {
            kind: QueryKind::DescriptorFromNodeConnection,
            header: RequestHeader::Descriptor {
                connection_index,
                descriptor_type: USB_STRING_DESCRIPTOR_TYPE,
                descriptor_index,
                language_id,
            },
            initial_len: USB_DESCRIPTOR_REQUEST_SIZE + MAXIMUM_USB_STRING_LENGTH,
            actual_length: None,
            response: ResponseLength::UpTo,
        }
    }

    fn hcd_name(kind: QueryKind) -> Self {
        QueryRequest {
            kind,
            header: RequestHeader::None,
            initial_len: USB_HCD_NAME_SIZE,
            actual_length: Some(ActualLength::Total32 { offset: 0 }),
            response: ResponseLength::Exact,
        }
    }

    fn node_connection_name_with_kind(kind: QueryKind, connection_index: u32) -> Self {
        QueryRequest {
            kind,
            header: RequestHeader::ConnectionIndex(connection_index),
            initial_len: USB_NODE_CONNECTION_NAME_SIZE,
            actual_length: Some(ActualLength::Total32 { offset: 4 }),
            response: ResponseLength::Exact,
        }
    }

    fn node_connection_information_with_kind(kind: QueryKind, connection_index: u32) -> Self {
        QueryRequest {
            kind,
            header: RequestHeader::ConnectionIndex(connection_index),
            initial_len: USB_NODE_CONNECTION_INFORMATION_SIZE + MAX_PIPES_PER_CONNECTION * USB_PIPE_INFO_SIZE,
            actual_length: None,
            response: ResponseLength::UpTo,
        }
    }
}

/// Issues one request class against a host controller or hub handle, growing the buffer whenever the OS
/// reports that it was too small.
pub struct SizeNegotiatedQuery<'a, T: UsbIoControl> {
    io: &'a T,
}
//
impl<'a, T: UsbIoControl> SizeNegotiatedQuery<'a, T> {
    pub fn new(io: &'a T) -> Self {
        SizeNegotiatedQuery { io }
    }

    pub fn query(&self, handle: &T::Handle, request: &QueryRequest) -> Result<ByteBuffer, QueryError> {
        let mut buffer_len = request.initial_len;

        for attempt in 1..=MAX_QUERY_ATTEMPTS {
            let mut buffer = ByteBuffer::zeroed(buffer_len);
            request.header.write(&mut buffer)?;
            let input_len = request.header.input_len(buffer_len);

            match self.io.io_control(handle, request.kind, buffer.as_mut_slice(), input_len) {
                Ok(bytes_returned) => {
                    // a "successful" call whose actual length exceeds our buffer only returned the fixed part of the structure
                    if let Some(actual_length) = request.actual_length {
                        let required_len = actual_length.required_len(&buffer)?;
                        if required_len > buffer_len {
                            buffer_len = checked_buffer_len(request.kind, required_len)?;
                            debug!("{:?}: attempt {} returned a partial structure; retrying with {} bytes", request.kind, attempt, buffer_len);
                            continue;
                        }
                    }

                    match request.response {
                        ResponseLength::Exact => {
                            if bytes_returned != buffer_len {
                                return Err(QueryError::SizeMismatch(request.kind, buffer_len, bytes_returned));
                            }
                        },
                        ResponseLength::UpTo => {
                            if bytes_returned > buffer_len {
                                return Err(QueryError::SizeMismatch(request.kind, buffer_len, bytes_returned));
                            }
                            buffer.truncate(bytes_returned);
                        },
                    }
                    return Ok(buffer);
                },
                Err(win32_error) if win32_error == ERROR_INSUFFICIENT_BUFFER || win32_error == ERROR_MORE_DATA => {
                    // the actual length field is populated even on the too-small response; if it is not, double the buffer
                    let required_len = match request.actual_length {
                        Some(actual_length) => actual_length.required_len(&buffer).unwrap_or(0),
                        None => 0,
                    };
                    buffer_len = if required_len > buffer_len {
                        checked_buffer_len(request.kind, required_len)?
                    } else {
                        buffer_len.saturating_mul(2).min(MAX_QUERY_BUFFER_SIZE)
                    };
                    debug!("{:?}: attempt {} reported win32 error {}; retrying with {} bytes", request.kind, attempt, win32_error, buffer_len);
                },
                Err(win32_error) => {
                    return Err(QueryError::Win32Error(request.kind, win32_error));
                },
            }
        }

        Err(QueryError::BufferNegotiationExhausted(request.kind, MAX_QUERY_ATTEMPTS))
    }

    /// Issues a name query and decodes the null-terminated UTF-16 name which follows its ActualLength field.
    pub fn query_name(&self, handle: &T::Handle, request: &QueryRequest) -> Result<String, QueryError> {
        let name_offset = match request.actual_length {
            Some(ActualLength::Total32 { offset }) => offset + 4,
            _ => USB_HCD_NAME_SIZE - 2,
        };
        let buffer = self.query(handle, request)?;
        let name = match byte_buffer::read_utf16_until_null(&buffer, name_offset)? {
            Ok(value) => value,
            Err(decoding_error) => {
                return Err(QueryError::StringDecodingError(request.kind, decoding_error));
            },
        };
        if name.is_empty() {
            return Err(QueryError::EmptyName(request.kind));
        }
        Ok(name)
    }
}

// a length declared by the device (or driver) is trusted only up to MAX_QUERY_BUFFER_SIZE
fn checked_buffer_len(kind: QueryKind, required_len: usize) -> Result<usize, QueryError> {
    if required_len > MAX_QUERY_BUFFER_SIZE {
        return Err(QueryError::SizeMismatch(kind, MAX_QUERY_BUFFER_SIZE, required_len));
    }
    Ok(required_len)
}
