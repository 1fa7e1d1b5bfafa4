use super::{FLAGS_QR_MASK, FLAGS_QR_QUERY, FLAGS_QR_RESPONSE, FLAGS_TC, HEADER_LEN};
use ferrous_mdns_domain::clock::now_millis;
use ferrous_mdns_domain::service_name::MAX_NAME_LEN;
use ferrous_mdns_domain::{DnsQuestion, DnsRecord, RecordData, RecordType};
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Error)]
enum DecodeError {
    #[error("truncated at offset {offset}, {needed} more bytes needed")]
    Truncated { offset: usize, needed: usize },

    #[error("bad label type 0x{byte:02x} at offset {offset}")]
    BadLabel { offset: usize, byte: u8 },

    #[error("compression pointer at offset {offset} targets {target}, outside the message")]
    BadPointer { offset: usize, target: usize },

    #[error("compression loop through offset {target}")]
    PointerLoop { target: usize },

    #[error("name at offset {offset} is longer than 255 bytes")]
    NameTooLong { offset: usize },

    #[error("record data at offset {offset} overruns its length of {rdlength}")]
    RdataOverrun { offset: usize, rdlength: usize },
}

/// A received message, parsed eagerly.
///
/// Parsing never fails: any structural problem leaves an empty message with
/// `is_valid() == false` and the reason in `error()`.
#[derive(Debug, Clone, Default)]
pub struct DnsIncoming {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
    pub authorities: Vec<DnsRecord>,
    pub additionals: Vec<DnsRecord>,
    /// Records of types the engine does not interpret, from any section.
    pub unknown: Vec<DnsRecord>,
    valid: bool,
    error: Option<String>,
}

impl DnsIncoming {
    pub fn parse(data: &[u8]) -> Self {
        Self::parse_at(data, now_millis())
    }

    /// Parse with decoded records stamped as created at `now`.
    pub fn parse_at(data: &[u8], now: u64) -> Self {
        match WireReader::new(data).read_message(now) {
            Ok(message) => message,
            Err(e) => Self {
                error: Some(e.to_string()),
                ..Self::default()
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_query(&self) -> bool {
        self.flags & FLAGS_QR_MASK == FLAGS_QR_QUERY
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAGS_QR_MASK == FLAGS_QR_RESPONSE
    }

    pub fn is_truncated(&self) -> bool {
        self.flags & FLAGS_TC != 0
    }

    /// Typed records of the answer, authority and additional sections.
    pub fn records(&self) -> impl Iterator<Item = &DnsRecord> {
        self.answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additionals.iter())
    }
}

struct WireReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_message(&mut self, now: u64) -> Result<DnsIncoming, DecodeError> {
        self.ensure(HEADER_LEN)?;
        let id = self.read_u16()?;
        let flags = self.read_u16()?;
        let questions = self.read_u16()?;
        let answers = self.read_u16()?;
        let authorities = self.read_u16()?;
        let additionals = self.read_u16()?;

        let mut message = DnsIncoming {
            id,
            flags,
            valid: true,
            ..DnsIncoming::default()
        };

        for _ in 0..questions {
            let name = self.read_name()?;
            let record_type = RecordType::from_u16(self.read_u16()?);
            let class = self.read_u16()?;
            message
                .questions
                .push(DnsQuestion::new(name, record_type, class));
        }

        let sections = [
            (answers, &mut message.answers),
            (authorities, &mut message.authorities),
            (additionals, &mut message.additionals),
        ];
        for (count, section) in sections {
            for _ in 0..count {
                let record = self.read_record(now)?;
                if matches!(record.data, RecordData::Unknown(_)) {
                    message.unknown.push(record);
                } else {
                    section.push(record);
                }
            }
        }

        Ok(message)
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        let available = self.data.len().saturating_sub(self.offset);
        if available < needed {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed: needed - available,
            });
        }
        Ok(())
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(len)?;
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_character_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_bytes(1)?[0] as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a possibly compressed name at the cursor.
    ///
    /// Pointers are followed iteratively; each target may be visited once,
    /// so a cycle is rejected instead of looping.
    fn read_name(&mut self) -> Result<String, DecodeError> {
        let start = self.offset;
        let mut name = String::new();
        let mut pos = start;
        let mut resume_at = None;
        let mut visited: SmallVec<[usize; 8]> = SmallVec::new();
        let mut encoded_len = 1;

        loop {
            let byte = *self.data.get(pos).ok_or(DecodeError::Truncated {
                offset: pos,
                needed: 1,
            })?;

            match byte & 0xC0 {
                0x00 if byte == 0 => {
                    self.offset = resume_at.unwrap_or(pos + 1);
                    if name.is_empty() {
                        name.push('.');
                    }
                    return Ok(name);
                }
                0x00 => {
                    let len = byte as usize;
                    let label = self
                        .data
                        .get(pos + 1..pos + 1 + len)
                        .ok_or(DecodeError::Truncated {
                            offset: pos + 1,
                            needed: len,
                        })?;
                    encoded_len += len + 1;
                    if encoded_len > MAX_NAME_LEN {
                        return Err(DecodeError::NameTooLong { offset: start });
                    }
                    name.push_str(&String::from_utf8_lossy(label));
                    name.push('.');
                    pos += 1 + len;
                }
                0xC0 => {
                    let low = *self.data.get(pos + 1).ok_or(DecodeError::Truncated {
                        offset: pos + 1,
                        needed: 1,
                    })?;
                    let target = (usize::from(byte & 0x3F) << 8) | usize::from(low);
                    if target >= self.data.len() {
                        return Err(DecodeError::BadPointer {
                            offset: pos,
                            target,
                        });
                    }
                    if visited.contains(&target) {
                        return Err(DecodeError::PointerLoop { target });
                    }
                    visited.push(target);
                    resume_at.get_or_insert(pos + 2);
                    pos = target;
                }
                _ => return Err(DecodeError::BadLabel { offset: pos, byte }),
            }
        }
    }

    fn read_record(&mut self, now: u64) -> Result<DnsRecord, DecodeError> {
        let name = self.read_name()?;
        let record_type = RecordType::from_u16(self.read_u16()?);
        let class = self.read_u16()?;
        let ttl = self.read_u32()?;
        let rdlength = self.read_u16()? as usize;

        let start = self.offset;
        self.ensure(rdlength)?;
        let end = start + rdlength;

        let data = match record_type {
            RecordType::A | RecordType::AAAA => {
                RecordData::Address(SmallVec::from_slice(self.read_bytes(rdlength)?))
            }
            RecordType::PTR => RecordData::Pointer(self.read_name()?),
            RecordType::TXT => RecordData::Text(self.read_bytes(rdlength)?.to_vec()),
            RecordType::SRV => RecordData::Service {
                priority: self.read_u16()?,
                weight: self.read_u16()?,
                port: self.read_u16()?,
                target: self.read_name()?,
            },
            RecordType::HINFO => RecordData::HostInfo {
                cpu: self.read_character_string()?,
                os: self.read_character_string()?,
            },
            RecordType::ANY | RecordType::Other(_) => {
                RecordData::Unknown(self.read_bytes(rdlength)?.to_vec())
            }
        };

        if self.offset > end {
            return Err(DecodeError::RdataOverrun {
                offset: start,
                rdlength,
            });
        }
        self.offset = end;

        Ok(DnsRecord::new(name, record_type, class, ttl, data).with_created(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(questions: u16) -> Vec<u8> {
        let mut bytes = vec![0, 0, 0, 0];
        bytes.extend_from_slice(&questions.to_be_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_pointer_loop_is_invalid() {
        let mut bytes = header(1);
        // Name at offset 12 is a pointer to itself.
        bytes.extend_from_slice(&[0xC0, 12, 0, 1, 0, 1]);

        let message = DnsIncoming::parse_at(&bytes, 0);

        assert!(!message.is_valid());
        assert!(message.error().unwrap().contains("loop"));
    }

    #[test]
    fn test_two_pointer_cycle_is_invalid() {
        let mut bytes = header(1);
        // 12: label "a" then pointer to 17; 17: pointer back to 12.
        bytes.extend_from_slice(&[1, b'a', 0xC0, 17, 0, 0xC0, 12]);

        assert!(!DnsIncoming::parse_at(&bytes, 0).is_valid());
    }

    #[test]
    fn test_pointer_outside_message_is_invalid() {
        let mut bytes = header(1);
        bytes.extend_from_slice(&[0xC0, 0xFF, 0, 1, 0, 1]);

        let message = DnsIncoming::parse_at(&bytes, 0);

        assert!(!message.is_valid());
        assert!(message.questions.is_empty());
    }

    #[test]
    fn test_compressed_name_resolves() {
        let mut bytes = header(2);
        bytes.extend_from_slice(&[1, b'a', 5, b'l', b'o', b'c', b'a', b'l', 0, 0, 1, 0, 1]);
        bytes.extend_from_slice(&[1, b'b', 0xC0, 14, 0, 1, 0, 1]);

        let message = DnsIncoming::parse_at(&bytes, 0);

        assert!(message.is_valid());
        assert_eq!(message.questions[0].name, "a.local.");
        assert_eq!(message.questions[1].name, "b.local.");
    }

    #[test]
    fn test_short_header_is_invalid() {
        assert!(!DnsIncoming::parse_at(&[0, 0, 0], 0).is_valid());
    }
}
