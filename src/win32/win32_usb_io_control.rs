// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{
    win32::{DeviceInfoSet, OwnedHandle},
    EnumerateError,
    HostControllerInterface,
    QueryKind,
    UsbIoControl,
};
use log::debug;
use scalefs_common::win32_utils;
use windows_sys::{
    core::GUID,
    Win32::Devices::DeviceAndDriverInstallation::{
        DIGCF_ALLCLASSES, DIGCF_DEVICEINTERFACE, DIGCF_PRESENT, SPDRP_ADDRESS, SPDRP_BUSNUMBER, SPDRP_DRIVER,
    },
    Win32::System::IO::DeviceIoControl,
};

// GUID_DEVINTERFACE_USB_HOST_CONTROLLER; see usbiodef.h
const GUID_DEVINTERFACE_USB_HOST_CONTROLLER: GUID = GUID::from_u128(0x3abf6f2d_71c4_462a_8a92_1e6861e6af27);

/// The UsbIoControl implementation backed by SetupAPI and DeviceIoControl.
pub struct Win32UsbIoControl {
}
//
impl Win32UsbIoControl {
    pub fn new() -> Self {
        Win32UsbIoControl {}
    }
}

impl Default for Win32UsbIoControl {
    fn default() -> Self {
        Win32UsbIoControl::new()
    }
}

impl UsbIoControl for Win32UsbIoControl {
    type Handle = OwnedHandle;

    fn enumerate_host_controllers(&self) -> Result<Vec<HostControllerInterface>, EnumerateError> {
        let mut result = Vec::<HostControllerInterface>::new();

        let device_info_set = DeviceInfoSet::get_class_devs(Some(&GUID_DEVINTERFACE_USB_HOST_CONTROLLER), DIGCF_PRESENT | DIGCF_DEVICEINTERFACE)
            .map_err(EnumerateError::Win32Error)?;

        // NOTE: we use a for loop here, but we intend to exit it early once we find the final device; the upper bound is simply a maximum placeholder
        for device_index in 0..u32::MAX {
            let devinfo_data = match device_info_set.enum_device_info(device_index).map_err(EnumerateError::Win32Error)? {
                Some(value) => value,
                None => break,
            };

            // the instance id and bus location are informational; a host controller without them is still walked
            let device_instance_id = match device_info_set.device_instance_id(&devinfo_data) {
                Ok(value) => Some(value),
                Err(error) => {
                    debug!("could not read the device instance id of host controller #{}: {}", device_index, EnumerateError::from(error));
                    None
                },
            };
            let bus_number = device_info_set.registry_property_u32(&devinfo_data, SPDRP_BUSNUMBER).unwrap_or(None);
            let address = device_info_set.registry_property_u32(&devinfo_data, SPDRP_ADDRESS).unwrap_or(None);

            for member_index in 0..u32::MAX {
                let interface_data = match device_info_set.enum_device_interfaces(&devinfo_data, &GUID_DEVINTERFACE_USB_HOST_CONTROLLER, member_index).map_err(EnumerateError::Win32Error)? {
                    Some(value) => value,
                    None => break,
                };
                let device_path = device_info_set.device_interface_path(&interface_data)?;

                result.push(HostControllerInterface {
                    device_path,
                    device_instance_id: device_instance_id.clone(),
                    bus_number,
                    address,
                });
            }
        }

        Ok(result)
    }

    fn open(&self, device_path: &str) -> Result<OwnedHandle, u32> {
        OwnedHandle::open(device_path)
    }

    // see: https://learn.microsoft.com/en-us/windows/win32/api/ioapiset/nf-ioapiset-deviceiocontrol
    fn io_control(&self, handle: &OwnedHandle, kind: QueryKind, buffer: &mut [u8], input_len: usize) -> Result<usize, u32> {
        // NOTE: all USB topology IOCTLs are METHOD_BUFFERED, so the request and the response share one buffer
        let buffer_ptr = buffer.as_mut_ptr() as *mut core::ffi::c_void;
        let input_ptr: *const core::ffi::c_void = match input_len {
            0 => std::ptr::null(),
            _ => buffer_ptr,
        };
        let mut bytes_returned: u32 = 0;
        let io_control_result = unsafe {
            DeviceIoControl(
                handle.raw(),
                kind.io_control_code(),
                input_ptr,
                input_len.min(buffer.len()) as u32,
                buffer_ptr,
                buffer.len() as u32,
                &mut bytes_returned,
                std::ptr::null_mut(),
            )
        };
        if io_control_result == 0 {
            return Err(win32_utils::get_last_error_as_win32_error().0);
        }
        Ok(bytes_returned as usize)
    }

    fn device_instance_id_for_driver_key(&self, driver_key_name: &str) -> Result<Option<String>, u32> {
        let device_info_set = DeviceInfoSet::get_class_devs(None, DIGCF_ALLCLASSES | DIGCF_PRESENT)?;

        for device_index in 0..u32::MAX {
            let devinfo_data = match device_info_set.enum_device_info(device_index)? {
                Some(value) => value,
                None => break,
            };

            // NOTE: driver keys are registry paths and therefore compared case-insensitively
            let matches_driver_key = match device_info_set.registry_property_string(&devinfo_data, SPDRP_DRIVER) {
                Ok(Some(device_driver_key_name)) => device_driver_key_name.eq_ignore_ascii_case(driver_key_name),
                _ => false,
            };
            if matches_driver_key {
                return match device_info_set.device_instance_id(&devinfo_data) {
                    Ok(value) => Ok(Some(value)),
                    Err(error) => match EnumerateError::from(error) {
                        EnumerateError::Win32Error(win32_error) => Err(win32_error),
                        _ => Err(windows::Win32::Foundation::ERROR_INVALID_DATA.0),
                    },
                };
            }
        }

        Ok(None)
    }
}
