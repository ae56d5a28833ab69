// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use scalefs_common::win32_utils;
use windows_sys::Win32::{
    Foundation::{CloseHandle, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE},
    Storage::FileSystem::{CreateFileW, FILE_SHARE_WRITE, OPEN_EXISTING},
};

/// A handle to a host controller or hub device, closed on drop.
pub struct OwnedHandle {
    handle: HANDLE,
}

impl OwnedHandle {
    pub fn open(device_path: &str) -> Result<Self, u32> {
        // NOTE: the utf16 vector must remain in scope until CreateFileW returns
        let device_path_as_utf16_chars: Vec<u16> = device_path.encode_utf16().chain(std::iter::once(0)).collect();

        // NOTE: the USB IOCTLs require write access; sharing write access lets other enumerators open the same device
        // see: https://learn.microsoft.com/en-us/windows/win32/api/fileapi/nf-fileapi-createfilew
        let handle = unsafe {
            CreateFileW(
                device_path_as_utf16_chars.as_ptr(),
                GENERIC_WRITE,
                FILE_SHARE_WRITE,
                std::ptr::null(),
                OPEN_EXISTING,
                0,
                0,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(win32_utils::get_last_error_as_win32_error().0);
        }

        Ok(OwnedHandle { handle })
    }

    pub(crate) fn raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        let close_result = unsafe { CloseHandle(self.handle) };
        debug_assert!(close_result != 0, "Could not close device handle; win32 error: {}", win32_utils::get_last_error_as_win32_error().0);
    }
}
