// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

mod device_info_set;
pub(crate) use device_info_set::DeviceInfoSet;

mod owned_handle;
pub use owned_handle::OwnedHandle;

mod win32_usb_io_control;
pub use win32_usb_io_control::Win32UsbIoControl;

// decodes a null-terminated (or unterminated) utf-16 buffer
pub(crate) fn utf16_until_null(chars: &[u16]) -> Result<String, std::string::FromUtf16Error> {
    let len = chars.iter().position(|ch| *ch == 0).unwrap_or(chars.len());
    String::from_utf16(&chars[..len])
}
