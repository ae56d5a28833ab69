// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{EnumerateError, QueryKind};

// win32 status codes which the topology walk interprets (rather than just reports)
pub const ERROR_INVALID_FUNCTION: u32 = 1;
pub const ERROR_GEN_FAILURE: u32 = 31;
pub const ERROR_NOT_SUPPORTED: u32 = 50;
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;
pub const ERROR_MORE_DATA: u32 = 234;
pub const ERROR_NOT_FOUND: u32 = 1168;

/// One device interface of the USB host controller interface class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostControllerInterface {
    pub device_path: String,
    pub device_instance_id: Option<String>,
    //
    // bus location (optional; not every host controller reports these)
    pub bus_number: Option<u32>,
    pub address: Option<u32>,
}

/// The operating system boundary of the topology walk.
///
/// Every query the walk issues goes through this trait: listing host controllers, opening a host controller
/// or hub by device path, sending one buffered IOCTL and mapping a driver key name back to a PnP device
/// instance id.  Handles are closed when they are dropped.
///
/// Failures are reported as raw win32 status codes; the caller attaches context.
pub trait UsbIoControl {
    type Handle;

    fn enumerate_host_controllers(&self) -> Result<Vec<HostControllerInterface>, EnumerateError>;

    fn open(&self, device_path: &str) -> Result<Self::Handle, u32>;

    /// Sends `kind` to `handle`.  The first `input_len` bytes of `buffer` are the request; on success the OS
    /// has overwritten `buffer` with the response and the number of bytes written is returned.
    fn io_control(&self, handle: &Self::Handle, kind: QueryKind, buffer: &mut [u8], input_len: usize) -> Result<usize, u32>;

    /// Returns Ok(None) if no present device carries the driver key.
    fn device_instance_id_for_driver_key(&self, driver_key_name: &str) -> Result<Option<String>, u32>;
}
