// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("access of {width} bytes at offset {offset} exceeds buffer of {len} bytes")]
pub struct BufferBoundsError {
    pub offset: usize,
    pub width: usize,
    pub len: usize,
}
