use super::{
    DnsIncoming, FLAGS_AA, FLAGS_QR_MASK, FLAGS_QR_QUERY, FLAGS_QR_RESPONSE, FLAGS_TC,
    HEADER_LEN, MAX_MSG_ABSOLUTE,
};
use ferrous_mdns_domain::service_name::validate_domain_name;
use ferrous_mdns_domain::txt_properties::MAX_CHARACTER_STRING_LEN;
use ferrous_mdns_domain::{DnsQuestion, DnsRecord, DomainError, RecordData};
use rustc_hash::FxHashMap;

/// Highest offset a compression pointer can address.
const MAX_POINTER_OFFSET: usize = 0x3FFF;

/// How far into each section encoding has progressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionCursor {
    pub questions: usize,
    pub answers: usize,
    pub authorities: usize,
    pub additionals: usize,
}

/// One serialized datagram plus where the next one has to start.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    pub bytes: Vec<u8>,
    pub next: SectionCursor,
    pub complete: bool,
    /// Names of entries too large for even an empty packet; they were skipped.
    pub oversized: Vec<String>,
}

/// An outgoing message, built incrementally and serialized on demand.
#[derive(Debug, Clone)]
pub struct DnsOutgoing {
    id: u16,
    flags: u16,
    multicast: bool,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
    pub authorities: Vec<DnsRecord>,
    pub additionals: Vec<DnsRecord>,
}

impl DnsOutgoing {
    pub fn new(flags: u16) -> Self {
        Self {
            id: 0,
            flags,
            multicast: true,
            questions: Vec::new(),
            answers: Vec::new(),
            authorities: Vec::new(),
            additionals: Vec::new(),
        }
    }

    pub fn query() -> Self {
        Self::new(FLAGS_QR_QUERY)
    }

    pub fn response() -> Self {
        Self::new(FLAGS_QR_RESPONSE | FLAGS_AA)
    }

    pub fn with_id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    /// Unicast (legacy) responses never carry the cache-flush bit.
    pub fn with_multicast(mut self, multicast: bool) -> Self {
        self.multicast = multicast;
        self
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn is_multicast(&self) -> bool {
        self.multicast
    }

    pub fn is_query(&self) -> bool {
        self.flags & FLAGS_QR_MASK == FLAGS_QR_QUERY
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAGS_QR_MASK == FLAGS_QR_RESPONSE
    }

    pub fn record_count(&self) -> usize {
        self.answers.len() + self.authorities.len() + self.additionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.record_count() == 0
    }

    pub fn add_question(&mut self, question: DnsQuestion) {
        self.questions.push(question);
    }

    /// Add an answer unless `query` already lists it as a fresh known answer.
    pub fn add_answer(&mut self, query: &DnsIncoming, record: DnsRecord) -> bool {
        if query
            .answers
            .iter()
            .any(|known| record.suppressed_by_answer(known))
        {
            return false;
        }
        self.answers.push(record);
        true
    }

    /// Add an answer with its TTL rewritten to what is left of it at `now`.
    /// Expired records are not added.
    pub fn add_answer_at_time(&mut self, record: DnsRecord, now: Option<u64>) -> bool {
        let record = match now {
            None => record,
            Some(now) if record.is_expired(now) => return false,
            Some(now) => {
                let remaining = record.remaining_ttl(now);
                record.with_ttl(remaining)
            }
        };
        self.answers.push(record);
        true
    }

    pub fn add_authoritative_answer(&mut self, record: DnsRecord) {
        self.authorities.push(record);
    }

    pub fn add_additional_answer(&mut self, record: DnsRecord) {
        self.additionals.push(record);
    }

    /// The first datagram of this message at the absolute size limit.
    pub fn packet(&self) -> Result<Vec<u8>, DomainError> {
        Ok(self
            .encode_from(SectionCursor::default(), MAX_MSG_ABSOLUTE)?
            .bytes)
    }

    /// Every datagram needed to carry the whole message within `budget`.
    pub fn packets(&self, budget: usize) -> Result<Vec<EncodedPacket>, DomainError> {
        let mut packets = Vec::new();
        let mut cursor = SectionCursor::default();
        loop {
            let packet = self.encode_from(cursor, budget)?;
            let complete = packet.complete;
            cursor = packet.next;
            packets.push(packet);
            if complete {
                return Ok(packets);
            }
        }
    }

    /// Encode as much as fits in `budget` bytes starting at `start`.
    ///
    /// Sections are filled in order; once an entry does not fit, the packet
    /// is closed and `next` points at that entry. An entry that does not fit
    /// an otherwise empty packet is skipped and reported in `oversized`.
    /// Unfinished queries carry the TC bit (RFC 6762 §7.2).
    pub fn encode_from(
        &self,
        start: SectionCursor,
        budget: usize,
    ) -> Result<EncodedPacket, DomainError> {
        let mut writer = PacketWriter::new(budget);
        let mut next = start;
        let mut counts = [0u16; 4];
        let mut oversized = Vec::new();

        let mut open = true;
        while open && next.questions < self.questions.len() {
            let question = &self.questions[next.questions];
            match writer.write_question(question)? {
                true => {
                    counts[0] += 1;
                    next.questions += 1;
                }
                false if writer.is_empty() => {
                    oversized.push(question.name.clone());
                    next.questions += 1;
                }
                false => open = false,
            }
        }

        let sections = [
            (&self.answers, &mut next.answers, 1),
            (&self.authorities, &mut next.authorities, 2),
            (&self.additionals, &mut next.additionals, 3),
        ];
        for (records, cursor, slot) in sections {
            while open && *cursor < records.len() {
                let record = &records[*cursor];
                match writer.write_record(record, self.multicast)? {
                    true => {
                        counts[slot] += 1;
                        *cursor += 1;
                    }
                    false if writer.is_empty() => {
                        oversized.push(record.name().to_string());
                        *cursor += 1;
                    }
                    false => open = false,
                }
            }
        }

        let complete = next.questions == self.questions.len()
            && next.answers == self.answers.len()
            && next.authorities == self.authorities.len()
            && next.additionals == self.additionals.len();

        let mut flags = self.flags;
        if !complete && self.is_query() {
            flags |= FLAGS_TC;
        }

        Ok(EncodedPacket {
            bytes: writer.finish(self.id, flags, counts),
            next,
            complete,
            oversized,
        })
    }
}

struct Mark {
    len: usize,
    journal: usize,
}

/// Byte buffer with name compression that can roll back a partial entry.
struct PacketWriter {
    buf: Vec<u8>,
    budget: usize,
    names: FxHashMap<String, u16>,
    journal: Vec<String>,
}

impl PacketWriter {
    fn new(budget: usize) -> Self {
        Self {
            buf: vec![0; HEADER_LEN],
            budget,
            names: FxHashMap::default(),
            journal: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.buf.len() == HEADER_LEN
    }

    fn mark(&self) -> Mark {
        Mark {
            len: self.buf.len(),
            journal: self.journal.len(),
        }
    }

    fn rollback(&mut self, mark: Mark) {
        self.buf.truncate(mark.len);
        for name in self.journal.drain(mark.journal..) {
            self.names.remove(&name);
        }
    }

    /// Keep what was written since `mark` if it fits the budget.
    fn commit(&mut self, mark: Mark) -> bool {
        if self.buf.len() > self.budget {
            self.rollback(mark);
            false
        } else {
            true
        }
    }

    fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_character_string(&mut self, value: &[u8]) -> Result<(), DomainError> {
        if value.len() > MAX_CHARACTER_STRING_LEN {
            return Err(DomainError::NamePartTooLong(format!(
                "character string of {} bytes",
                value.len()
            )));
        }
        self.buf.push(value.len() as u8);
        self.buf.extend_from_slice(value);
        Ok(())
    }

    fn write_name(&mut self, name: &str) -> Result<(), DomainError> {
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        if trimmed.is_empty() {
            self.buf.push(0);
            return Ok(());
        }
        validate_domain_name(name)?;

        let labels: Vec<&str> = trimmed.split('.').collect();
        for index in 0..labels.len() {
            let suffix = labels[index..].join(".");
            if let Some(&offset) = self.names.get(&suffix) {
                self.write_u16(0xC000 | offset);
                return Ok(());
            }

            let offset = self.buf.len();
            if offset <= MAX_POINTER_OFFSET {
                self.names.insert(suffix.clone(), offset as u16);
                self.journal.push(suffix);
            }

            let label = labels[index].as_bytes();
            self.buf.push(label.len() as u8);
            self.buf.extend_from_slice(label);
        }
        self.buf.push(0);
        Ok(())
    }

    fn write_question(&mut self, question: &DnsQuestion) -> Result<bool, DomainError> {
        let mark = self.mark();
        self.write_name(&question.name)?;
        self.write_u16(question.record_type.to_u16());
        self.write_u16(question.class);
        Ok(self.commit(mark))
    }

    fn write_record(&mut self, record: &DnsRecord, multicast: bool) -> Result<bool, DomainError> {
        let mark = self.mark();
        self.write_name(record.name())?;
        self.write_u16(record.record_type().to_u16());
        self.write_u16(record.entry.wire_class(multicast));
        self.write_u32(record.ttl);

        let length_at = self.buf.len();
        self.write_u16(0);
        self.write_rdata(&record.data)?;

        let rdlength = self.buf.len() - length_at - 2;
        let rdlength = u16::try_from(rdlength).map_err(|_| {
            DomainError::InvalidDnsMessage(format!(
                "record data for {} is {} bytes",
                record.name(),
                rdlength
            ))
        })?;
        self.buf[length_at..length_at + 2].copy_from_slice(&rdlength.to_be_bytes());

        Ok(self.commit(mark))
    }

    fn write_rdata(&mut self, data: &RecordData) -> Result<(), DomainError> {
        match data {
            RecordData::Address(bytes) => self.buf.extend_from_slice(bytes),
            RecordData::Pointer(alias) => self.write_name(alias)?,
            RecordData::Text(text) => self.buf.extend_from_slice(text),
            RecordData::Service {
                priority,
                weight,
                port,
                target,
            } => {
                self.write_u16(*priority);
                self.write_u16(*weight);
                self.write_u16(*port);
                self.write_name(target)?;
            }
            RecordData::HostInfo { cpu, os } => {
                self.write_character_string(cpu.as_bytes())?;
                self.write_character_string(os.as_bytes())?;
            }
            RecordData::Unknown(raw) => self.buf.extend_from_slice(raw),
        }
        Ok(())
    }

    fn finish(mut self, id: u16, flags: u16, counts: [u16; 4]) -> Vec<u8> {
        self.buf[0..2].copy_from_slice(&id.to_be_bytes());
        self.buf[2..4].copy_from_slice(&flags.to_be_bytes());
        for (i, count) in counts.iter().enumerate() {
            let at = 4 + i * 2;
            self.buf[at..at + 2].copy_from_slice(&count.to_be_bytes());
        }
        self.buf
    }
}
