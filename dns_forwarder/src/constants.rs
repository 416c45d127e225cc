use std::time::Duration;

// https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.4
pub const UDP_DNS_MESSAGE_SIZE: usize = 512;
pub const MAX_LABEL_LENGTH: usize = 63;
pub const MAX_NAME_LENGTH: usize = 255;

pub const DNS_HEADER_SIZE: usize = 12;
pub const DNS_QUESTION_SIZE: usize = 4;
pub const DNS_RECORD_SIZE: usize = 10;

// Top two bits of a length byte.
pub const POINTER_MASK: u8 = 0b1100_0000;
// Compression pointers followed per name before it is rejected.
pub const MAX_POINTER_HOPS: usize = 16;

// Answer synthesised when no upstream resolver is configured.
pub const PLACEHOLDER_TTL: u32 = 60;
pub const PLACEHOLDER_DATA: [u8; 4] = [8, 8, 8, 8];

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:2053";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);
