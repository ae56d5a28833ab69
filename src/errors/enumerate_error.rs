// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use thiserror::Error;

/// A failure which prevents the walk from producing any result (e.g. the host controller interface class
/// cannot be listed); per-node failures are reported as WalkIssues instead.
#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("invalid string encoding in device interface data: {0}")]
    StringDecodingError(#[from] std::string::FromUtf16Error),
    #[error("device interface data is not null terminated")]
    StringTerminationDecodingError,
    #[error("could not enumerate USB host controllers (win32 error {0})")]
    Win32Error(/*win32_error: */u32),
}
