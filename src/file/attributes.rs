use crate::{
    data_type::{ArrayValues, DataTypeError, Element, NumType},
    node::AttributeMetadata,
};

use super::{AttrInfo, Cursor, File, NexusError};

fn check_attr_name(name: &str) -> Result<(), NexusError> {
    if name.is_empty() {
        Err(NexusError::InvalidName("empty attribute name".to_string()))
    } else {
        Ok(())
    }
}

fn check_attr_type(attribute: &AttributeMetadata, requested: NumType) -> Result<(), NexusError> {
    if attribute.data_type == requested {
        Ok(())
    } else {
        Err(DataTypeError::Mismatch {
            stored: attribute.data_type,
            requested,
        }
        .into())
    }
}

/// Split NUL padded rows of `row_len` bytes into strings.
fn split_rows(bytes: &[u8], row_len: usize) -> Vec<String> {
    bytes
        .chunks(row_len.max(1))
        .map(|row| {
            ArrayValues::Char(row.to_vec())
                .as_text()
                .unwrap_or_default()
        })
        .collect()
}

impl File {
    fn put_attr_values(&mut self, name: &str, values: &ArrayValues, shape: Vec<u64>) -> Result<(), NexusError> {
        check_attr_name(name)?;
        let (backend, path) = self.current_entity()?;
        backend.put_attribute(path, AttributeMetadata::new(name, values, shape))
    }

    fn find_attr(&self, name: &str) -> Result<AttributeMetadata, NexusError> {
        check_attr_name(name)?;
        let (backend, path) = self.current_entity()?;
        backend
            .attributes(path)?
            .into_iter()
            .find(|attribute| attribute.name == name)
            .ok_or_else(|| NexusError::NotFound(format!("attribute {name} of {path}")))
    }

    /// Write the single value attribute `name` to the open dataset, or to the current group if no dataset is open.
    ///
    /// An existing attribute `name` is replaced.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidName`] if `name` is empty, or [`NexusError::InvalidState`] if the file is closed.
    pub fn put_attr<T: Element>(&mut self, name: &str, value: T) -> Result<(), NexusError> {
        self.put_attr_array(name, &[value])
    }

    /// Write the one-dimensional attribute `name`. See [`File::put_attr`].
    ///
    /// # Errors
    /// See [`File::put_attr`].
    pub fn put_attr_array<T: Element>(&mut self, name: &str, values: &[T]) -> Result<(), NexusError> {
        let values = T::into_values(values.to_vec());
        let shape = vec![values.len() as u64];
        self.put_attr_values(name, &values, shape)
    }

    /// Write the text attribute `name`. An empty string is written as a single space.
    ///
    /// # Errors
    /// See [`File::put_attr`].
    pub fn put_attr_str(&mut self, name: &str, text: &str) -> Result<(), NexusError> {
        let values = ArrayValues::from(if text.is_empty() { " " } else { text });
        let shape = vec![values.len() as u64];
        self.put_attr_values(name, &values, shape)
    }

    /// Write the string array attribute `name`, a `CHAR` attribute with one NUL padded row per string.
    ///
    /// # Errors
    /// See [`File::put_attr`].
    pub fn put_attr_strings<S: AsRef<str>>(&mut self, name: &str, strings: &[S]) -> Result<(), NexusError> {
        let row_len = strings
            .iter()
            .map(|string| string.as_ref().len())
            .max()
            .unwrap_or(0)
            .max(1);
        let mut bytes = Vec::with_capacity(strings.len() * row_len);
        for string in strings {
            let start = bytes.len();
            bytes.extend_from_slice(string.as_ref().as_bytes());
            bytes.resize(start + row_len, 0);
        }
        let shape = vec![strings.len() as u64, row_len as u64];
        self.put_attr_values(name, &ArrayValues::Char(bytes), shape)
    }

    /// Write the attribute described by `info` from little-endian bytes of its storage type.
    ///
    /// # Errors
    /// See [`File::put_attr`]. Returns [`NexusError::RankMismatch`] if `bytes` does not hold `info.length` elements.
    pub fn put_attr_info(&mut self, info: &AttrInfo, bytes: &[u8]) -> Result<(), NexusError> {
        let values = ArrayValues::from_bytes(info.data_type, bytes)?;
        if values.len() != info.length {
            return Err(NexusError::RankMismatch(format!(
                "{} elements for attribute {} of length {}",
                values.len(),
                info.name,
                info.length
            )));
        }
        let shape = if info.shape.iter().product::<u64>() == info.length as u64 {
            info.shape.clone()
        } else {
            vec![info.length as u64]
        };
        self.put_attr_values(&info.name, &values, shape)
    }

    /// Read the first value of the attribute `name` of the open dataset, or of the current group.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no attribute `name`, [`NexusError::TypeMismatch`] if it does
    /// not store `T`, or [`NexusError::RangeError`] if it is empty.
    pub fn get_attr<T: Element>(&self, name: &str) -> Result<T, NexusError> {
        self.get_attr_array(name)?
            .into_iter()
            .next()
            .ok_or_else(|| NexusError::RangeError(format!("attribute {name} is empty")))
    }

    /// Read every value of the attribute `name`. See [`File::get_attr`].
    ///
    /// # Errors
    /// See [`File::get_attr`].
    pub fn get_attr_array<T: Element>(&self, name: &str) -> Result<Vec<T>, NexusError> {
        let attribute = self.find_attr(name)?;
        check_attr_type(&attribute, T::NUM_TYPE)?;
        Ok(T::from_values(attribute.values()?)?)
    }

    /// Read the text attribute `name`, without trailing NUL padding.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no attribute `name`, or [`NexusError::TypeMismatch`] if it is
    /// not text.
    pub fn get_attr_str(&self, name: &str) -> Result<String, NexusError> {
        let attribute = self.find_attr(name)?;
        check_attr_type(&attribute, NumType::Char)?;
        Ok(attribute.values()?.as_text().unwrap_or_default())
    }

    /// Read the string array attribute `name`. A one-dimensional text attribute reads as a single string.
    ///
    /// # Errors
    /// See [`File::get_attr_str`].
    pub fn get_attr_strings(&self, name: &str) -> Result<Vec<String>, NexusError> {
        let attribute = self.find_attr(name)?;
        check_attr_type(&attribute, NumType::Char)?;
        let values = attribute.values()?;
        match (&values, attribute.shape.as_slice()) {
            (ArrayValues::Char(bytes), [_, row_len]) => Ok(split_rows(
                bytes,
                usize::try_from(*row_len).unwrap_or(usize::MAX),
            )),
            _ => Ok(vec![values.as_text().unwrap_or_default()]),
        }
    }

    /// Read the attribute described by `info` in its storage type.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no attribute `info.name`, or [`NexusError::TypeMismatch`] if its
    /// storage type is no longer `info.data_type`.
    pub fn get_attr_info_value(&self, info: &AttrInfo) -> Result<ArrayValues, NexusError> {
        let attribute = self.find_attr(&info.name)?;
        check_attr_type(&attribute, info.data_type)?;
        Ok(attribute.values()?)
    }

    /// Read the text attribute described by `info`.
    ///
    /// # Errors
    /// See [`File::get_attr_info_value`].
    pub fn get_str_attr(&self, info: &AttrInfo) -> Result<String, NexusError> {
        let values = self.get_attr_info_value(info)?;
        values.as_text().ok_or_else(|| {
            NexusError::TypeMismatch(format!("attribute {} is not text", info.name))
        })
    }

    /// Read the first `length` elements, or `info.length` elements, of the attribute described by `info` as
    /// little-endian bytes of its storage type.
    ///
    /// # Errors
    /// See [`File::get_attr_info_value`]. Returns [`NexusError::RangeError`] if `length` exceeds the stored length.
    pub fn get_attr_bytes(&self, info: &AttrInfo, length: Option<usize>) -> Result<Vec<u8>, NexusError> {
        let mut values = self.get_attr_info_value(info)?;
        let length = length.unwrap_or(info.length);
        if length > values.len() {
            return Err(NexusError::RangeError(format!(
                "{length} elements of attribute {} of length {}",
                info.name,
                values.len()
            )));
        }
        values.truncate(length);
        Ok(values.to_bytes())
    }

    /// Return the next attribute of the open dataset or the current group, or [`None`] after the last one.
    ///
    /// Attributes are enumerated in creation order from a snapshot taken by the first call. Moving to another
    /// entity or calling [`File::init_attr_dir`] restarts the enumeration.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn get_next_attr(&mut self) -> Result<Option<AttrInfo>, NexusError> {
        if self.attr_cursor.is_none() {
            self.attr_cursor = Some(Cursor::new(self.get_attr_infos()?));
        }
        Ok(self.attr_cursor.as_mut().and_then(Cursor::advance))
    }

    /// Restart the enumeration of [`File::get_next_attr`].
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn init_attr_dir(&mut self) -> Result<(), NexusError> {
        self.ensure_open()?;
        self.attr_cursor = None;
        Ok(())
    }

    /// Describe every attribute of the open dataset or the current group, in creation order.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn get_attr_infos(&self) -> Result<Vec<AttrInfo>, NexusError> {
        let (backend, path) = self.current_entity()?;
        Ok(backend.attributes(path)?.iter().map(AttrInfo::from).collect())
    }

    /// Returns true if the open dataset or the current group has the attribute `name`.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn has_attr(&self, name: &str) -> Result<bool, NexusError> {
        let (backend, path) = self.current_entity()?;
        Ok(backend
            .attributes(path)?
            .iter()
            .any(|attribute| attribute.name == name))
    }
}
