// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

// function codes for the USB user mode IOCTLs; see usbiodef.h
const HCD_GET_ROOT_HUB_NAME: u32 = 258;
const HCD_GET_DRIVERKEY_NAME: u32 = 265;
const USB_GET_NODE_INFORMATION: u32 = 258;
const USB_GET_NODE_CONNECTION_INFORMATION: u32 = 259;
const USB_GET_DESCRIPTOR_FROM_NODE_CONNECTION: u32 = 260;
const USB_GET_NODE_CONNECTION_NAME: u32 = 261;
const USB_GET_NODE_CONNECTION_DRIVERKEY_NAME: u32 = 264;
const USB_GET_NODE_CONNECTION_INFORMATION_EX: u32 = 274;

const FILE_DEVICE_USB: u32 = 0x22; // FILE_DEVICE_UNKNOWN
const METHOD_BUFFERED: u32 = 0;
const FILE_ANY_ACCESS: u32 = 0;

const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// The USB topology queries issued against host controller and hub handles.
///
/// NOTE: IOCTL_USB_GET_ROOT_HUB_NAME and IOCTL_USB_GET_NODE_INFORMATION share the same control code; they are
///       told apart by the kind of handle they are sent to (host controller vs. hub), so implementations of
///       UsbIoControl should dispatch on the QueryKind rather than on the raw code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    HcdDriverKeyName,
    RootHubName,
    NodeInformation,
    NodeConnectionInformation,
    NodeConnectionInformationEx,
    DescriptorFromNodeConnection,
    NodeConnectionName,
    NodeConnectionDriverKeyName,
}

impl QueryKind {
    pub const fn io_control_code(self) -> u32 {
        let function = match self {
            QueryKind::HcdDriverKeyName => HCD_GET_DRIVERKEY_NAME,
            QueryKind::RootHubName => HCD_GET_ROOT_HUB_NAME,
            QueryKind::NodeInformation => USB_GET_NODE_INFORMATION,
            QueryKind::NodeConnectionInformation => USB_GET_NODE_CONNECTION_INFORMATION,
            QueryKind::NodeConnectionInformationEx => USB_GET_NODE_CONNECTION_INFORMATION_EX,
            QueryKind::DescriptorFromNodeConnection => USB_GET_DESCRIPTOR_FROM_NODE_CONNECTION,
            QueryKind::NodeConnectionName => USB_GET_NODE_CONNECTION_NAME,
            QueryKind::NodeConnectionDriverKeyName => USB_GET_NODE_CONNECTION_DRIVERKEY_NAME,
        };
        ctl_code(FILE_DEVICE_USB, function, METHOD_BUFFERED, FILE_ANY_ACCESS)
    }
}
