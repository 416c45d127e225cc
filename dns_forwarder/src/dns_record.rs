use crate::{
    class::Class,
    constants,
    dns_name::DomainName,
    error::{DnsError, Result},
    read_u16, read_u32,
    record_type::RecordType,
};

/// A resource record with opaque data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DNSRecord {
    name: DomainName,
    type_: u16,
    class: u16,
    ttl: u32,
    data: Vec<u8>,
}

impl DNSRecord {
    pub fn new(
        name: DomainName,
        type_: impl Into<u16>,
        class: impl Into<u16>,
        ttl: u32,
        data: Vec<u8>,
    ) -> Result<Self> {
        if data.len() > u16::MAX as usize {
            return Err(DnsError::InvalidField {
                field: "rdlength",
                value: data.len(),
                max: u16::MAX as usize,
            });
        }
        Ok(Self {
            name,
            type_: type_.into(),
            class: class.into(),
            ttl,
            data,
        })
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
    pub fn ttl(&self) -> u32 {
        self.ttl
    }
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    pub fn record_type(&self) -> RecordType {
        self.type_.into()
    }
    pub fn record_class(&self) -> Class {
        self.class.into()
    }

    /// Always matches `data().len()`; the constructor rejects longer data.
    pub fn rdlength(&self) -> u16 {
        self.data.len() as u16
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.name.encode(buf);
        buf.extend_from_slice(&self.type_.to_be_bytes());
        buf.extend_from_slice(&self.class.to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());
        buf.extend_from_slice(&self.rdlength().to_be_bytes());
        buf.extend_from_slice(&self.data);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    pub fn parse(packet: &[u8], cursor: usize) -> Result<(Self, usize)> {
        let (name, mut current_pos) = DomainName::decode(packet, cursor)?;

        let type_ = read_u16(packet, current_pos, "record type")?;
        let class = read_u16(packet, current_pos + 2, "record class")?;
        let ttl = read_u32(packet, current_pos + 4, "record ttl")?;
        let data_length = read_u16(packet, current_pos + 8, "rdlength")? as usize;
        current_pos += constants::DNS_RECORD_SIZE;

        let (start, end) = (current_pos, current_pos + data_length);
        let data = packet
            .get(start..end)
            .ok_or_else(|| DnsError::truncated("rdata", data_length, packet.len().saturating_sub(start)))?
            .to_vec();

        Ok((
            DNSRecord {
                name,
                type_,
                class,
                ttl,
                data,
            },
            end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_record() -> DNSRecord {
        DNSRecord::new(
            "example.com".parse().unwrap(),
            RecordType::A,
            Class::In,
            300,
            vec![93, 184, 216, 34],
        )
        .unwrap()
    }

    #[test]
    fn test_record_wire_format() {
        let record = a_record();
        let bytes = record.to_bytes();

        assert_eq!(
            &bytes[13..],
            &[
                0x00, 0x01, // type A
                0x00, 0x01, // class IN
                0x00, 0x00, 0x01, 0x2C, // ttl 300
                0x00, 0x04, // rdlength
                93, 184, 216, 34,
            ]
        );

        let (parsed, next) = DNSRecord::parse(&bytes, 0).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.rdlength(), 4);
        assert_eq!(next, bytes.len());
    }

    #[test]
    fn test_rdata_overrun_is_malformed() {
        let mut bytes = a_record().to_bytes();
        bytes.truncate(bytes.len() - 1);

        let err = DNSRecord::parse(&bytes, 0).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_truncated_fixed_fields() {
        let bytes = a_record().to_bytes();
        assert!(DNSRecord::parse(&bytes[..18], 0).unwrap_err().is_malformed());
    }

    #[test]
    fn test_rejects_oversized_data() {
        let result = DNSRecord::new(
            DomainName::root(),
            RecordType::TXT,
            Class::In,
            0,
            vec![0; u16::MAX as usize + 1],
        );
        assert!(matches!(
            result,
            Err(DnsError::InvalidField { field: "rdlength", .. })
        ));
    }
}
