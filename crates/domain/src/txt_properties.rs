use crate::errors::DomainError;

/// Longest character-string a TXT (or HINFO) payload can carry.
pub const MAX_CHARACTER_STRING_LEN: usize = 255;

/// Value of a single TXT property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    Bytes(Vec<u8>),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PropertyValue::Bytes(bytes) => bytes,
            PropertyValue::Bool(true) => b"true",
            PropertyValue::Bool(false) => b"false",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            PropertyValue::Bytes(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Bytes(value.as_bytes().to_vec())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Bytes(value.into_bytes())
    }
}

impl From<&[u8]> for PropertyValue {
    fn from(value: &[u8]) -> Self {
        PropertyValue::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Bytes(value)
    }
}

/// Ordered key/value properties of a DNS-SD TXT record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxtProperties {
    entries: Vec<(Vec<u8>, PropertyValue)>,
}

impl TxtProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property, keeping the original position on replace.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: impl Into<PropertyValue>) {
        let key = key.as_ref();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.as_slice() == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_vec(), value)),
        }
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&PropertyValue> {
        let key = key.as_ref();
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<PropertyValue> {
        let key = key.as_ref();
        let index = self.entries.iter().position(|(k, _)| k.as_slice() == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as a sequence of length-prefixed `key=value` strings.
    ///
    /// An empty set encodes as one empty string (RFC 6763 §6.1).
    pub fn encode(&self) -> Result<Vec<u8>, DomainError> {
        if self.entries.is_empty() {
            return Ok(vec![0]);
        }

        let mut text = Vec::new();
        for (key, value) in &self.entries {
            let value = value.as_bytes();
            let len = key.len() + 1 + value.len();
            if len > MAX_CHARACTER_STRING_LEN {
                return Err(DomainError::NamePartTooLong(format!(
                    "TXT property '{}' is {} bytes",
                    String::from_utf8_lossy(key),
                    len
                )));
            }
            text.push(len as u8);
            text.extend_from_slice(key);
            text.push(b'=');
            text.extend_from_slice(value);
        }
        Ok(text)
    }

    /// Decode TXT record data. Never fails: malformed tails are ignored and
    /// repeated keys keep their first value (RFC 6763 §6.4).
    pub fn decode(text: &[u8]) -> Self {
        let mut properties = Self::new();
        let mut offset = 0;

        while offset < text.len() {
            let len = text[offset] as usize;
            offset += 1;
            let Some(item) = text.get(offset..offset + len) else {
                break;
            };
            offset += len;

            if item.is_empty() {
                continue;
            }

            let (key, value) = match item.iter().position(|&b| b == b'=') {
                None => (item, PropertyValue::Bool(true)),
                Some(eq) => (&item[..eq], decode_value(&item[eq + 1..])),
            };

            if properties.get(key).is_none() {
                properties.entries.push((key.to_vec(), value));
            }
        }

        properties
    }
}

fn decode_value(raw: &[u8]) -> PropertyValue {
    match std::str::from_utf8(raw) {
        Err(_) => PropertyValue::Bool(false),
        Ok("true") => PropertyValue::Bool(true),
        Ok("false") | Ok("") => PropertyValue::Bool(false),
        Ok(_) => PropertyValue::Bytes(raw.to_vec()),
    }
}

impl<K, V> FromIterator<(K, V)> for TxtProperties
where
    K: AsRef<[u8]>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_string_is_ignored() {
        let properties = TxtProperties::decode(&[3, b'a', b'=', b'1', 9, b'b']);
        assert_eq!(properties.len(), 1);
        assert_eq!(properties.get("a"), Some(&PropertyValue::Bytes(b"1".to_vec())));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let properties = TxtProperties::decode(b"\x03a=1\x03a=2");
        assert_eq!(properties.get("a"), Some(&PropertyValue::Bytes(b"1".to_vec())));
    }

    #[test]
    fn test_invalid_utf8_value_is_false() {
        let properties = TxtProperties::decode(&[4, b'k', b'=', 0xff, 0xfe]);
        assert_eq!(properties.get("k"), Some(&PropertyValue::Bool(false)));
    }
}
