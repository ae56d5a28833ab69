// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

mod byte_buffer;
pub use byte_buffer::ByteBuffer;

mod configuration_descriptor;
pub use configuration_descriptor::{has_string_descriptors, ConfigurationDescriptor};

mod connection_info;
pub use connection_info::{ConnectionInfo, PipeInfo};

mod device_descriptor;
pub use device_descriptor::DeviceDescriptor;

mod device_identity;
pub use device_identity::{resolve_identity, DeviceIdentity};

mod device_strings;
pub use device_strings::DeviceStrings;

mod enumeration_result;
pub use enumeration_result::EnumerationResult;

mod enums;
pub use enums::*;

mod errors;
pub use errors::*;

mod hardware_node;
pub use hardware_node::{ExternalHubInfo, HardwareNode, HostControllerInfo, HubInfo, NodeInfo, UsbDeviceInfo};

mod hub_information;
pub use hub_information::HubInformation;

mod io_control;
pub use io_control::{HostControllerInterface, UsbIoControl};

mod port_enumerator;
pub use port_enumerator::{ExternalHubPort, PortEnumerator, PortResult};

mod size_negotiated_query;
pub use size_negotiated_query::{ActualLength, QueryRequest, RequestHeader, ResponseLength, SizeNegotiatedQuery};

mod string_descriptor;
pub use string_descriptor::{decode_language_ids, decode_string};

mod string_table;
pub use string_table::{StringDescriptorSource, StringTable};

mod sub_descriptor;
pub use sub_descriptor::{EndpointDescriptor, InterfaceAssociationDescriptor, InterfaceDescriptor, SubDescriptor};

mod usb_topology_enumerator;
pub use usb_topology_enumerator::UsbTopologyEnumerator;

mod walk_issue;
pub use walk_issue::{IssueSeverity, NodeLocation, WalkIssue};

#[cfg(target_os = "windows")]
mod win32;
#[cfg(target_os = "windows")]
pub use win32::{OwnedHandle, Win32UsbIoControl};

/// Win32 status codes and fixed protocol limits used by the walk.
pub mod constants {
    pub use crate::io_control::{
        ERROR_GEN_FAILURE,
        ERROR_INSUFFICIENT_BUFFER,
        ERROR_INVALID_FUNCTION,
        ERROR_MORE_DATA,
        ERROR_NOT_FOUND,
        ERROR_NOT_SUPPORTED,
    };
    pub use crate::size_negotiated_query::{
        MAXIMUM_USB_STRING_LENGTH,
        MAX_PIPES_PER_CONNECTION,
        MAX_QUERY_ATTEMPTS,
        MAX_QUERY_BUFFER_SIZE,
        USB_DESCRIPTOR_REQUEST_SIZE,
        USB_NODE_CONNECTION_INFORMATION_SIZE,
        USB_NODE_INFORMATION_SIZE,
        USB_PIPE_INFO_SIZE,
    };
}
