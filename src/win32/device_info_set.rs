// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{win32, EnumerateError};
use scalefs_common::win32_utils;
use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_DATA, ERROR_NO_MORE_ITEMS};
use windows_sys::{
    core::GUID,
    Win32::Devices::DeviceAndDriverInstallation::{
        HDEVINFO,
        SP_DEVICE_INTERFACE_DATA,
        SP_DEVICE_INTERFACE_DETAIL_DATA_W,
        SP_DEVINFO_DATA,
        SetupDiDestroyDeviceInfoList,
        SetupDiEnumDeviceInfo,
        SetupDiEnumDeviceInterfaces,
        SetupDiGetClassDevsW,
        SetupDiGetDeviceInstanceIdW,
        SetupDiGetDeviceInterfaceDetailW,
        SetupDiGetDeviceRegistryPropertyW,
    },
    Win32::Foundation::INVALID_HANDLE_VALUE,
};

pub(crate) enum GetDeviceInstanceIdFromDevinfoDataError {
    StringDecodingError(/*error: */std::string::FromUtf16Error),
    Win32Error(/*win32_error: */u32),
}

impl From<GetDeviceInstanceIdFromDevinfoDataError> for EnumerateError {
    fn from(error: GetDeviceInstanceIdFromDevinfoDataError) -> Self {
        match error {
            GetDeviceInstanceIdFromDevinfoDataError::StringDecodingError(decoding_error) => EnumerateError::StringDecodingError(decoding_error),
            GetDeviceInstanceIdFromDevinfoDataError::Win32Error(win32_error) => EnumerateError::Win32Error(win32_error),
        }
    }
}

/// A SetupAPI device information set; destroyed on drop.
pub(crate) struct DeviceInfoSet {
    handle: HDEVINFO,
}
//
impl DeviceInfoSet {
    // see: https://docs.microsoft.com/en-us/windows/win32/api/setupapi/nf-setupapi-setupdigetclassdevsw
    pub fn get_class_devs(class_guid: Option<&GUID>, flags: u32) -> Result<Self, u32> {
        let class_guid_ptr: *const GUID = match class_guid {
            Some(value) => value,
            None => std::ptr::null(),
        };
        let handle = unsafe { SetupDiGetClassDevsW(class_guid_ptr, std::ptr::null(), 0, flags) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(win32_utils::get_last_error_as_win32_error().0);
        }
        Ok(DeviceInfoSet { handle })
    }

    /// Returns Ok(None) once `device_index` runs past the last device in the set.
    // see: https://learn.microsoft.com/en-us/windows/win32/api/setupapi/nf-setupapi-setupdienumdeviceinfo
    pub fn enum_device_info(&self, device_index: u32) -> Result<Option<SP_DEVINFO_DATA>, u32> {
        let mut devinfo_data: SP_DEVINFO_DATA = SP_DEVINFO_DATA { cbSize: 0, ClassGuid: GUID::from_u128(0), DevInst: 0, Reserved: 0 };
        devinfo_data.cbSize = std::mem::size_of::<SP_DEVINFO_DATA>() as u32;

        let enum_device_info_result = unsafe { SetupDiEnumDeviceInfo(self.handle, device_index, &mut devinfo_data) };
        if enum_device_info_result == 0 {
            let win32_error = win32_utils::get_last_error_as_win32_error().0;
            if win32_error == ERROR_NO_MORE_ITEMS.0 {
                return Ok(None);
            }
            return Err(win32_error);
        }
        Ok(Some(devinfo_data))
    }

    // see: https://learn.microsoft.com/en-us/windows/win32/api/setupapi/nf-setupapi-setupdienumdeviceinterfaces
    pub fn enum_device_interfaces(&self, devinfo_data: &SP_DEVINFO_DATA, interface_class_guid: &GUID, member_index: u32) -> Result<Option<SP_DEVICE_INTERFACE_DATA>, u32> {
        let mut interface_data = SP_DEVICE_INTERFACE_DATA { cbSize: 0, InterfaceClassGuid: GUID::from_u128(0), Flags: 0, Reserved: 0 };
        interface_data.cbSize = std::mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32;

        let enum_interfaces_result = unsafe { SetupDiEnumDeviceInterfaces(self.handle, devinfo_data, interface_class_guid, member_index, &mut interface_data) };
        if enum_interfaces_result == 0 {
            let win32_error = win32_utils::get_last_error_as_win32_error().0;
            if win32_error == ERROR_NO_MORE_ITEMS.0 {
                return Ok(None);
            }
            return Err(win32_error);
        }
        Ok(Some(interface_data))
    }

    /// Returns the device path of a device interface (the path which CreateFileW opens).
    // see: https://learn.microsoft.com/en-us/windows/win32/api/setupapi/nf-setupapi-setupdigetdeviceinterfacedetailw
    pub fn device_interface_path(&self, interface_data: &SP_DEVICE_INTERFACE_DATA) -> Result<String, EnumerateError> {
        // get the required size of the detail data structure; we'll get an error code of ERROR_INSUFFICIENT_BUFFER and the required_size parameter will contain the required size
        let mut required_size: u32 = 0;
        let get_detail_result = unsafe { SetupDiGetDeviceInterfaceDetailW(self.handle, interface_data, std::ptr::null_mut(), 0, &mut required_size, std::ptr::null_mut()) };
        if get_detail_result == 0 {
            let win32_error = win32_utils::get_last_error_as_win32_error().0;
            if win32_error != ERROR_INSUFFICIENT_BUFFER.0 {
                return Err(EnumerateError::Win32Error(win32_error));
            }
        }
        let detail_size = std::mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>();
        if (required_size as usize) < detail_size {
            return Err(EnumerateError::Win32Error(ERROR_INVALID_DATA.0));
        }

        // NOTE: the detail data is a cbSize field followed by a variable-length DevicePath; we back it with a u32 vector so that it is suitably aligned
        let mut detail_buffer = vec![0u32; (required_size as usize + 3) / 4];
        let detail_data = detail_buffer.as_mut_ptr() as *mut SP_DEVICE_INTERFACE_DETAIL_DATA_W;
        unsafe { (*detail_data).cbSize = detail_size as u32 };
        let get_detail_result = unsafe { SetupDiGetDeviceInterfaceDetailW(self.handle, interface_data, detail_data, required_size, std::ptr::null_mut(), std::ptr::null_mut()) };
        if get_detail_result == 0 {
            return Err(EnumerateError::Win32Error(win32_utils::get_last_error_as_win32_error().0));
        }

        // the device path starts right after cbSize and runs to the end of the buffer (or its null terminator)
        let device_path_offset = std::mem::size_of::<u32>();
        let device_path_len = (required_size as usize - device_path_offset) / 2;
        let device_path_chars = unsafe { std::slice::from_raw_parts((detail_data as *const u8).add(device_path_offset) as *const u16, device_path_len) };
        let device_path = win32::utf16_until_null(device_path_chars)?;
        if device_path.is_empty() {
            return Err(EnumerateError::StringTerminationDecodingError);
        }
        Ok(device_path)
    }

    pub fn device_instance_id(&self, devinfo_data: &SP_DEVINFO_DATA) -> Result<String, GetDeviceInstanceIdFromDevinfoDataError> {
        // get the size of the device instance id, null-terminated, as a count of utf-16 characters; we'll get an error code of ERROR_INSUFFICIENT_BUFFER and the required_size parameter will contain the required size
        // see: https://learn.microsoft.com/en-us/windows/win32/api/setupapi/nf-setupapi-setupdigetdeviceinstanceidw
        let mut required_size: u32 = 0;
        let get_device_instance_id_result = unsafe { SetupDiGetDeviceInstanceIdW(self.handle, devinfo_data, std::ptr::null_mut(), 0, &mut required_size) };
        if get_device_instance_id_result == 0 {
            let win32_error = win32_utils::get_last_error_as_win32_error().0;
            if win32_error != ERROR_INSUFFICIENT_BUFFER.0 {
                return Err(GetDeviceInstanceIdFromDevinfoDataError::Win32Error(win32_error));
            }
        } else {
            debug_assert!(false, "SetupDiGetDeviceInstanceIdW returned success when we asked it for the required buffer size");
            return Err(GetDeviceInstanceIdFromDevinfoDataError::Win32Error(ERROR_INVALID_DATA.0));
        }
        if required_size == 0 {
            return Err(GetDeviceInstanceIdFromDevinfoDataError::Win32Error(ERROR_INVALID_DATA.0));
        }

        let mut device_instance_id_as_utf16_chars = vec![0u16; required_size as usize];
        let get_device_instance_id_result = unsafe { SetupDiGetDeviceInstanceIdW(self.handle, devinfo_data, device_instance_id_as_utf16_chars.as_mut_ptr(), required_size, std::ptr::null_mut()) };
        if get_device_instance_id_result == 0 {
            return Err(GetDeviceInstanceIdFromDevinfoDataError::Win32Error(win32_utils::get_last_error_as_win32_error().0));
        }

        win32::utf16_until_null(&device_instance_id_as_utf16_chars).map_err(GetDeviceInstanceIdFromDevinfoDataError::StringDecodingError)
    }

    // returns Ok(None) if the device does not have the property
    // see: https://learn.microsoft.com/en-us/windows/win32/api/setupapi/nf-setupapi-setupdigetdeviceregistrypropertyw
    fn registry_property_bytes(&self, devinfo_data: &SP_DEVINFO_DATA, property: u32) -> Result<Option<Vec<u8>>, u32> {
        let mut required_size: u32 = 0;
        let get_property_result = unsafe { SetupDiGetDeviceRegistryPropertyW(self.handle, devinfo_data, property, std::ptr::null_mut(), std::ptr::null_mut(), 0, &mut required_size) };
        if get_property_result == 0 {
            let win32_error = win32_utils::get_last_error_as_win32_error().0;
            if win32_error == ERROR_INVALID_DATA.0 {
                return Ok(None);
            } else if win32_error != ERROR_INSUFFICIENT_BUFFER.0 {
                return Err(win32_error);
            }
        }
        if required_size == 0 {
            return Ok(None);
        }

        let mut property_buffer = vec![0u8; required_size as usize];
        let get_property_result = unsafe {
            SetupDiGetDeviceRegistryPropertyW(self.handle, devinfo_data, property, std::ptr::null_mut(), property_buffer.as_mut_ptr(), required_size, std::ptr::null_mut())
        };
        if get_property_result == 0 {
            return Err(win32_utils::get_last_error_as_win32_error().0);
        }
        Ok(Some(property_buffer))
    }

    pub fn registry_property_string(&self, devinfo_data: &SP_DEVINFO_DATA, property: u32) -> Result<Option<String>, u32> {
        let property_buffer = match self.registry_property_bytes(devinfo_data, property)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let chars: Vec<u16> = property_buffer.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
        match win32::utf16_until_null(&chars) {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ERROR_INVALID_DATA.0),
        }
    }

    pub fn registry_property_u32(&self, devinfo_data: &SP_DEVINFO_DATA, property: u32) -> Result<Option<u32>, u32> {
        let property_buffer = match self.registry_property_bytes(devinfo_data, property)? {
            Some(value) => value,
            None => return Ok(None),
        };
        if property_buffer.len() < 4 {
            return Err(ERROR_INVALID_DATA.0);
        }
        Ok(Some(u32::from_le_bytes([property_buffer[0], property_buffer[1], property_buffer[2], property_buffer[3]])))
    }
}

impl Drop for DeviceInfoSet {
    fn drop(&mut self) {
        let destroy_result = unsafe { SetupDiDestroyDeviceInfoList(self.handle) };
        debug_assert!(destroy_result != 0, "Could not clean up device info set; win32 error: {}", win32_utils::get_last_error_as_win32_error().0);
    }
}
