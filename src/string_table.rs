// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{
    string_descriptor,
    ConfigurationDescriptor,
    DeviceDescriptor,
    QueryError,
    StringError,
};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Fetches raw string descriptors (bLength, bDescriptorType, UTF-16LE payload) for one device.
pub trait StringDescriptorSource {
    fn fetch_string_descriptor(&mut self, index: u8, language_id: u16) -> Result<Vec<u8>, QueryError>;
}

/// The string descriptors of one device, keyed by (index, language id).
///
/// Strings are fetched lazily and at most once per key: a key which has been fetched (successfully or not) is
/// answered from the table without another query.  Only the first language advertised in string descriptor
/// zero is ever requested.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringTable {
    language_ids: Vec<u16>,
    strings: BTreeMap<(u8, u16), String>,
    unavailable: BTreeSet<(u8, u16)>,
}

impl StringTable {
    /// Reads string descriptor zero.  A failure here usually means that the device is suspended and will not
    /// answer any string request.
    pub fn load_language_ids<S: StringDescriptorSource>(source: &mut S) -> Result<Self, StringError> {
        let bytes = source.fetch_string_descriptor(0, 0).map_err(StringError::LanguageListUnavailable)?;
        let language_ids = string_descriptor::decode_language_ids(&bytes).map_err(StringError::LanguageListMalformed)?;

        if language_ids.len() > 1 {
            debug!("device advertises {} string languages; only language {:#06x} is read", language_ids.len(), language_ids[0]);
        }

        Ok(StringTable { language_ids, ..Default::default() })
    }

    /// Resolves every string index referenced by the device descriptor and (if present) the configuration.
    /// Individual string failures are returned alongside the table; only a language list failure is an error.
    pub fn load_for_device<S: StringDescriptorSource>(
        source: &mut S,
        device: &DeviceDescriptor,
        configuration: Option<&ConfigurationDescriptor>,
    ) -> Result<(StringTable, Vec<StringError>), StringError> {
        let mut table = StringTable::load_language_ids(source)?;
        let mut failures = Vec::<StringError>::new();

        let mut indices = vec![device.manufacturer_index, device.product_index, device.serial_number_index];
        if let Some(configuration) = configuration {
            indices.extend(configuration.string_indices());
        }
        for index in indices {
            if let Err(error) = table.resolve(source, index) {
                failures.push(error);
            }
        }

        Ok((table, failures))
    }

    pub fn language_ids(&self) -> &[u16] {
        &self.language_ids
    }

    pub fn primary_language_id(&self) -> Option<u16> {
        self.language_ids.first().copied()
    }

    /// Returns the text of string `index` in the primary language, querying `source` only on the first request
    /// for that index.  Index zero (the language list) and devices without languages resolve to None.
    pub fn resolve<S: StringDescriptorSource>(&mut self, source: &mut S, index: u8) -> Result<Option<&str>, StringError> {
        let language_id = match self.primary_language_id() {
            Some(value) => value,
            None => return Ok(None),
        };
        if index == 0 {
            return Ok(None);
        }

        let key = (index, language_id);
        if self.strings.contains_key(&key) || self.unavailable.contains(&key) {
            return Ok(self.strings.get(&key).map(String::as_str));
        }

        let bytes = match source.fetch_string_descriptor(index, language_id) {
            Ok(value) => value,
            Err(error) => {
                self.unavailable.insert(key);
                return Err(StringError::Query { index, language_id, error });
            },
        };
        let text = match string_descriptor::decode_string(&bytes) {
            Ok(value) => value,
            Err(error) => {
                self.unavailable.insert(key);
                return Err(StringError::Descriptor { index, language_id, error });
            },
        };

        self.strings.insert(key, text);
        Ok(self.strings.get(&key).map(String::as_str))
    }

    /// Returns a previously resolved string in the primary language.
    pub fn get(&self, index: u8) -> Option<&str> {
        let language_id = self.primary_language_id()?;
        self.strings.get(&(index, language_id)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
