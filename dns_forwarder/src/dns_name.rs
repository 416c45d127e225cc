use std::{fmt, str::FromStr};

use crate::{
    constants,
    error::{DnsError, Result},
    read_u16,
};

/// One length-prefixed component of a domain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(Vec<u8>);

impl Label {
    pub fn new(content: impl Into<Vec<u8>>) -> Result<Self> {
        let content = content.into();
        if content.len() > constants::MAX_LABEL_LENGTH {
            return Err(DnsError::InvalidField {
                field: "label length",
                value: content.len(),
                max: constants::MAX_LABEL_LENGTH,
            });
        }
        // A dot inside a label would print as a label boundary.
        if content.contains(&b'.') {
            return Err(DnsError::Malformed(format!(
                "label {:?} contains a dot",
                String::from_utf8_lossy(&content)
            )));
        }
        Ok(Self(content))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// An uncompressed sequence of labels. The root label is implied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DomainName {
    labels: Vec<Label>,
}

impl DomainName {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_labels(labels: Vec<Label>) -> Result<Self> {
        let name = Self { labels };
        let encoded_len = name.encoded_len();
        if encoded_len > constants::MAX_NAME_LENGTH {
            return Err(DnsError::InvalidField {
                field: "name length",
                value: encoded_len,
                max: constants::MAX_NAME_LENGTH,
            });
        }
        Ok(name)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Wire length including the terminating zero byte.
    pub fn encoded_len(&self) -> usize {
        self.labels.iter().map(|l| 1 + l.len()).sum::<usize>() + 1
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        // Add a 0 byte to terminate the name
        buf.push(0);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf
    }

    /// Reads a name starting at `cursor`, following compression pointers.
    ///
    /// Returns the name and the offset just past it in the original byte
    /// stream: past the zero terminator, or past the first pointer if the
    /// name was compressed. Every pointer must refer strictly before the
    /// previous jump target, so chains always shrink towards the start of
    /// the packet; `MAX_POINTER_HOPS` bounds them further.
    pub fn decode(packet: &[u8], cursor: usize) -> Result<(Self, usize)> {
        let mut labels = Vec::new();
        let mut encoded_len = 1;
        let mut current_pos = cursor;
        let mut floor = cursor;
        let mut next = None;
        let mut hops = 0;

        loop {
            let length = *packet
                .get(current_pos)
                .ok_or_else(|| DnsError::truncated("name", 1, 0))?;

            match length & constants::POINTER_MASK {
                0 if length == 0 => {
                    current_pos += 1;
                    break;
                }
                0 => {
                    let start = current_pos + 1;
                    let end = start + length as usize;
                    let content = packet.get(start..end).ok_or_else(|| {
                        let available = packet.len().saturating_sub(start);
                        DnsError::truncated("label", length as usize, available)
                    })?;

                    encoded_len += 1 + content.len();
                    if encoded_len > constants::MAX_NAME_LENGTH {
                        return Err(DnsError::Malformed(format!(
                            "name at offset {} exceeds {} octets",
                            cursor,
                            constants::MAX_NAME_LENGTH
                        )));
                    }
                    labels.push(Label::new(content)?);
                    current_pos = end;
                }
                constants::POINTER_MASK => {
                    // takes the bottom 6 bits of the length byte, plus the next byte
                    let pointer = read_u16(packet, current_pos, "compression pointer")?;
                    let target = (pointer & 0x3FFF) as usize;
                    if target >= floor {
                        return Err(DnsError::Malformed(format!(
                            "compression pointer at offset {} does not point backwards (target {})",
                            current_pos, target
                        )));
                    }
                    hops += 1;
                    if hops > constants::MAX_POINTER_HOPS {
                        return Err(DnsError::Malformed(format!(
                            "name at offset {} follows more than {} compression pointers",
                            cursor,
                            constants::MAX_POINTER_HOPS
                        )));
                    }
                    next.get_or_insert(current_pos + 2);
                    floor = target;
                    current_pos = target;
                }
                _ => {
                    return Err(DnsError::Malformed(format!(
                        "reserved label type {:#04x} at offset {}",
                        length, current_pos
                    )));
                }
            }
        }

        Ok((Self { labels }, next.unwrap_or(current_pos)))
    }
}

impl FromStr for DomainName {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let labels = trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    return Err(DnsError::Malformed(format!("empty label in {:?}", s)));
                }
                Label::new(part.as_bytes())
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_labels(labels)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&String::from_utf8_lossy(label.as_bytes()))?;
        }
        Ok(())
    }
}
