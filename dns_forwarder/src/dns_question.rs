use crate::{
    class::Class, constants, dns_name::DomainName, error::Result, read_u16,
    record_type::RecordType,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DNSQuestion {
    name: DomainName,
    type_: u16,
    class: u16,
}

impl DNSQuestion {
    pub fn new(name: DomainName, type_: impl Into<u16>, class: impl Into<u16>) -> Self {
        Self {
            name,
            type_: type_.into(),
            class: class.into(),
        }
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }
    pub fn type_(&self) -> u16 {
        self.type_
    }
    pub fn class(&self) -> u16 {
        self.class
    }
    pub fn record_type(&self) -> RecordType {
        self.type_.into()
    }
    pub fn record_class(&self) -> Class {
        self.class.into()
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.name.encode(buf);
        buf.extend_from_slice(&self.type_.to_be_bytes());
        buf.extend_from_slice(&self.class.to_be_bytes());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.name.encoded_len() + constants::DNS_QUESTION_SIZE);
        self.encode(&mut buf);
        buf
    }

    /// Returns the question and the offset of whatever follows it.
    pub fn parse(packet: &[u8], cursor: usize) -> Result<(Self, usize)> {
        let (name, current_pos) = DomainName::decode(packet, cursor)?;

        let question = DNSQuestion {
            name,
            type_: read_u16(packet, current_pos, "question type")?,
            class: read_u16(packet, current_pos + 2, "question class")?,
        };

        Ok((question, current_pos + constants::DNS_QUESTION_SIZE))
    }
}
