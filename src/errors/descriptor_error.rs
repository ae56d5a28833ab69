// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::BufferBoundsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("{0} needs {1} bytes but only {2} are available")]
    BufferTooShort(/*structure: */&'static str, /*needed: */usize, /*available: */usize),
    #[error("{0} declares bLength {1}; expected {2}")]
    InvalidLength(/*structure: */&'static str, /*declared: */u8, /*expected: */usize),
    #[error("{0} has descriptor type {1:#04x}")]
    InvalidDescriptorType(/*structure: */&'static str, /*descriptor_type: */u8),
    #[error("configuration wTotalLength {0} is smaller than the configuration header")]
    TotalLengthTooSmall(/*total_length: */u16),
    #[error("sub-descriptor at offset {0} declares bLength {1}, which cannot reach the next descriptor")]
    InvalidSubDescriptorLength(/*offset: */usize, /*length: */u8),
    #[error("sub-descriptor at offset {0} with bLength {1} overruns the configuration end at {2}")]
    SubDescriptorOverrun(/*offset: */usize, /*length: */u8, /*end: */usize),
    #[error("interface descriptor at offset {0} has bLength {1}; expected 9 or 11")]
    InvalidInterfaceLength(/*offset: */usize, /*length: */u8),
    #[error("interface association descriptor at offset {0} has bLength {1}; expected at least 8")]
    InvalidInterfaceAssociationLength(/*offset: */usize, /*length: */u8),
    #[error("string descriptor payload of {0} bytes is not a whole number of UTF-16 code units")]
    OddStringLength(/*payload_len: */usize),
    #[error("hub node information reports node type {0}; expected a hub")]
    UnexpectedNodeType(/*node_type: */u32),
    #[error("invalid string encoding: {0}")]
    StringDecodingError(#[from] std::string::FromUtf16Error),
    #[error(transparent)]
    OutOfBounds(#[from] BufferBoundsError),
}
