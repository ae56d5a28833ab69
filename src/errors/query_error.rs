// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{BufferBoundsError, QueryKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0:?} failed (win32 error {1})")]
    Win32Error(/*kind: */QueryKind, /*win32_error: */u32),
    #[error("{0:?} returned {2} bytes for a {1} byte request")]
    SizeMismatch(/*kind: */QueryKind, /*expected: */usize, /*returned: */usize),
    #[error("{0:?} still reported an insufficient buffer after {1} attempts")]
    BufferNegotiationExhausted(/*kind: */QueryKind, /*attempts: */u32),
    #[error("{0:?} returned an empty name")]
    EmptyName(/*kind: */QueryKind),
    #[error("{0:?} returned an invalid string encoding: {1}")]
    StringDecodingError(/*kind: */QueryKind, /*error: */std::string::FromUtf16Error),
    #[error(transparent)]
    OutOfBounds(#[from] BufferBoundsError),
}

impl QueryError {
    pub fn win32_error(&self) -> Option<u32> {
        match self {
            QueryError::Win32Error(_, win32_error) => Some(*win32_error),
            _ => None,
        }
    }
}
