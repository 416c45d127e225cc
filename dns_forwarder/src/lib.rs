//! DNS message codec and a forwarding resolver on top of it.
//!
//! Incoming queries are decoded into a [`DNSPacket`], answered either with a
//! placeholder record per question or by forwarding every question on its
//! own to an upstream resolver, and encoded back with the response flag set.

pub mod class;
pub mod constants;
pub mod dns_header;
pub mod dns_name;
pub mod dns_packet;
pub mod dns_question;
pub mod dns_record;
pub mod error;
pub mod record_type;
pub mod resolver;
pub mod server;
pub mod upstream;

pub use dns_header::{DNSHeader, Flags};
pub use dns_name::{DomainName, Label};
pub use dns_packet::DNSPacket;
pub use dns_question::DNSQuestion;
pub use dns_record::DNSRecord;
pub use error::{DnsError, Result};
pub use resolver::ForwardingResolver;
pub use server::{DnsServer, ServerConfig};
pub use upstream::{UdpUpstream, Upstream};

pub(crate) fn read_u16(data: &[u8], cursor: usize, what: &str) -> Result<u16> {
    let bytes = data
        .get(cursor..cursor + 2)
        .ok_or_else(|| DnsError::truncated(what, 2, data.len().saturating_sub(cursor)))?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(data: &[u8], cursor: usize, what: &str) -> Result<u32> {
    let bytes = data
        .get(cursor..cursor + 4)
        .ok_or_else(|| DnsError::truncated(what, 4, data.len().saturating_sub(cursor)))?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
