// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{DescriptorError, QueryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StringError {
    // the language id list (string index 0) could not be read; the device is most likely suspended
    #[error("could not read the supported language ids: {0}")]
    LanguageListUnavailable(#[source] QueryError),
    #[error("malformed language id list: {0}")]
    LanguageListMalformed(#[source] DescriptorError),
    #[error("could not read string {index} (language {language_id:#06x}): {error}")]
    Query {
        index: u8,
        language_id: u16,
        #[source]
        error: QueryError,
    },
    #[error("malformed string {index} (language {language_id:#06x}): {error}")]
    Descriptor {
        index: u8,
        language_id: u16,
        #[source]
        error: DescriptorError,
    },
}
