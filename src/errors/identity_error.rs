// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("device instance id {0:?} has no unique suffix segment")]
    MissingInstanceSuffix(/*device_instance_id: */String),
}
