// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{DescriptorError, IdentityError, QueryError, StringError};
use thiserror::Error;

/// Any failure confined to a single node of the topology (a host controller, a hub, a port or a string).
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("could not open {0} (win32 error {1})")]
    OpenFailed(/*device_path: */String, /*win32_error: */u32),
    #[error("could not resolve the device instance id for driver key {0} (win32 error {1})")]
    InstanceIdLookupFailed(/*driver_key_name: */String, /*win32_error: */u32),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    String(#[from] StringError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
