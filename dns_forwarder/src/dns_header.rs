use crate::{
    constants,
    error::{DnsError, Result},
    read_u16,
};

// https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
const QR_BIT: u16 = 1 << 15;
const OPCODE_SHIFT: u16 = 11;
const AA_BIT: u16 = 1 << 10;
const TC_BIT: u16 = 1 << 9;
const RD_BIT: u16 = 1 << 8;
const RA_BIT: u16 = 1 << 7;
const Z_SHIFT: u16 = 4;

const OPCODE_MAX: u8 = 0b1111;
const Z_MAX: u8 = 0b111;
const RCODE_MAX: u8 = 0b1111;

pub const OPCODE_QUERY: u8 = 0;
pub const RCODE_NO_ERROR: u8 = 0;
pub const RCODE_SERVER_FAILURE: u8 = 2;
pub const RCODE_NOT_IMPLEMENTED: u8 = 4;

/// The flags word of a DNS header.
///
/// Multi-bit fields are checked against their bit width when set, so a
/// `Flags` value always packs into 16 bits without truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    qr: bool,
    opcode: u8,
    aa: bool,
    tc: bool,
    rd: bool,
    ra: bool,
    z: u8,
    rcode: u8,
}

fn check_width(field: &'static str, value: u8, max: u8) -> Result<u8> {
    if value > max {
        return Err(DnsError::InvalidField {
            field,
            value: value as usize,
            max: max as usize,
        });
    }
    Ok(value)
}

impl Flags {
    pub fn from_bits(bits: u16) -> Self {
        Self {
            qr: bits & QR_BIT != 0,
            opcode: ((bits >> OPCODE_SHIFT) as u8) & OPCODE_MAX,
            aa: bits & AA_BIT != 0,
            tc: bits & TC_BIT != 0,
            rd: bits & RD_BIT != 0,
            ra: bits & RA_BIT != 0,
            z: ((bits >> Z_SHIFT) as u8) & Z_MAX,
            rcode: (bits as u8) & RCODE_MAX,
        }
    }

    pub fn bits(&self) -> u16 {
        let mut bits = 0;
        if self.qr {
            bits |= QR_BIT;
        }
        bits |= (self.opcode as u16) << OPCODE_SHIFT;
        if self.aa {
            bits |= AA_BIT;
        }
        if self.tc {
            bits |= TC_BIT;
        }
        if self.rd {
            bits |= RD_BIT;
        }
        if self.ra {
            bits |= RA_BIT;
        }
        bits |= (self.z as u16) << Z_SHIFT;
        bits | self.rcode as u16
    }

    pub fn qr(&self) -> bool {
        self.qr
    }
    pub fn opcode(&self) -> u8 {
        self.opcode
    }
    pub fn aa(&self) -> bool {
        self.aa
    }
    pub fn tc(&self) -> bool {
        self.tc
    }
    pub fn rd(&self) -> bool {
        self.rd
    }
    pub fn ra(&self) -> bool {
        self.ra
    }
    pub fn z(&self) -> u8 {
        self.z
    }
    pub fn rcode(&self) -> u8 {
        self.rcode
    }

    pub fn set_qr(&mut self, qr: bool) {
        self.qr = qr;
    }
    pub fn set_aa(&mut self, aa: bool) {
        self.aa = aa;
    }
    pub fn set_tc(&mut self, tc: bool) {
        self.tc = tc;
    }
    pub fn set_rd(&mut self, rd: bool) {
        self.rd = rd;
    }
    pub fn set_ra(&mut self, ra: bool) {
        self.ra = ra;
    }

    pub fn set_opcode(&mut self, opcode: u8) -> Result<()> {
        self.opcode = check_width("opcode", opcode, OPCODE_MAX)?;
        Ok(())
    }

    pub fn set_z(&mut self, z: u8) -> Result<()> {
        self.z = check_width("z", z, Z_MAX)?;
        Ok(())
    }

    pub fn set_rcode(&mut self, rcode: u8) -> Result<()> {
        self.rcode = check_width("rcode", rcode, RCODE_MAX)?;
        Ok(())
    }
}

/// Fixed 12 byte message header.
///
/// `qdcount` and `ancount` reflect what was read off the wire; when a packet
/// is serialized they are recomputed from the sections it actually holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DNSHeader {
    id: u16,
    flags: Flags,
    qdcount: u16,
    ancount: u16,
    nscount: u16,
    arcount: u16,
}

impl DNSHeader {
    pub fn new(id: u16, flags: Flags) -> Self {
        Self {
            id,
            flags,
            ..Default::default()
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }
    pub fn flags(&self) -> &Flags {
        &self.flags
    }
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }
    pub fn qdcount(&self) -> u16 {
        self.qdcount
    }
    pub fn ancount(&self) -> u16 {
        self.ancount
    }
    pub fn nscount(&self) -> u16 {
        self.nscount
    }
    pub fn arcount(&self) -> u16 {
        self.arcount
    }

    pub(crate) fn set_counts(&mut self, qdcount: u16, ancount: u16) {
        self.qdcount = qdcount;
        self.ancount = ancount;
        self.nscount = 0;
        self.arcount = 0;
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [
            self.id.to_be_bytes(),
            self.flags.bits().to_be_bytes(),
            self.qdcount.to_be_bytes(),
            self.ancount.to_be_bytes(),
            self.nscount.to_be_bytes(),
            self.arcount.to_be_bytes(),
        ]
        .concat()
    }
}

impl TryFrom<&[u8]> for DNSHeader {
    type Error = DnsError;

    fn try_from(value: &[u8]) -> Result<Self> {
        if value.len() < constants::DNS_HEADER_SIZE {
            return Err(DnsError::truncated(
                "header",
                constants::DNS_HEADER_SIZE,
                value.len(),
            ));
        }
        // Each of the 6 fields is a 2-byte integer, so there are 12 bytes in all to read.
        Ok(DNSHeader {
            id: read_u16(value, 0, "id")?,
            flags: Flags::from_bits(read_u16(value, 2, "flags")?),
            qdcount: read_u16(value, 4, "qdcount")?,
            ancount: read_u16(value, 6, "ancount")?,
            nscount: read_u16(value, 8, "nscount")?,
            arcount: read_u16(value, 10, "arcount")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_layout() {
        let mut flags = Flags::default();
        flags.set_qr(true);
        flags.set_opcode(2).unwrap();
        flags.set_aa(true);
        flags.set_rd(true);
        flags.set_z(0b101).unwrap();
        flags.set_rcode(3).unwrap();

        assert_eq!(flags.bits(), 0b1_0010_1_0_1_0_101_0011);
        assert_eq!(Flags::from_bits(flags.bits()), flags);
    }

    #[test]
    fn test_unsupported_opcode_has_no_extra_bits() {
        let mut flags = Flags::default();
        flags.set_opcode(1).unwrap();

        assert_eq!(flags.bits(), 0x0800);
        assert_eq!(flags.rcode(), RCODE_NO_ERROR);
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let mut flags = Flags::default();

        assert!(matches!(
            flags.set_opcode(16),
            Err(DnsError::InvalidField { field: "opcode", .. })
        ));
        assert!(flags.set_z(8).is_err());
        assert!(flags.set_rcode(0x10).is_err());
        assert_eq!(flags, Flags::default());
    }

    #[test]
    fn test_parse_header() {
        let data = [
            0x12, 0x34, // id
            0x81, 0x80, // response, recursion desired + available
            0x00, 0x01, // qdcount
            0x00, 0x02, // ancount
            0x00, 0x00, // nscount
            0x00, 0x01, // arcount
        ];
        let header = DNSHeader::try_from(&data[..]).unwrap();

        assert_eq!(header.id(), 0x1234);
        assert!(header.flags().qr());
        assert!(header.flags().rd());
        assert!(header.flags().ra());
        assert_eq!(header.flags().opcode(), OPCODE_QUERY);
        assert_eq!(header.qdcount(), 1);
        assert_eq!(header.ancount(), 2);
        assert_eq!(header.arcount(), 1);
        assert_eq!(header.to_bytes(), data);
    }

    #[test]
    fn test_short_header_is_malformed() {
        let err = DNSHeader::try_from(&[0x12, 0x34, 0x01, 0x00, 0x00][..]).unwrap_err();
        assert!(err.is_malformed());
    }
}
