use std::fmt;

/// Query and record types the forwarder knows by name.
///
/// Record data is always carried opaquely, so any other value survives a
/// round trip as `Unknown`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum RecordType {
    // Bunch more can be found here.. https://datatracker.ietf.org/doc/html/rfc1035#section-3.2.2
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            12 => RecordType::PTR,
            15 => RecordType::MX,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            other => RecordType::Unknown(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Unknown(value) => write!(f, "TYPE{}", value),
            known => write!(f, "{:?}", known),
        }
    }
}
