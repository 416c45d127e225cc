use std::net::SocketAddr;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DnsError>;

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Invalid {field}: {value} exceeds maximum of {max}")]
    InvalidField {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("Question index {index} out of range for {len} questions")]
    QuestionIndex { index: usize, len: usize },

    #[error("Forwarding to {upstream} failed: {reason}")]
    Forwarding { upstream: SocketAddr, reason: String },

    #[error("Timeout waiting for reply from {upstream}")]
    Timeout { upstream: SocketAddr },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DnsError {
    pub(crate) fn truncated(what: &str, needed: usize, available: usize) -> Self {
        DnsError::Malformed(format!(
            "{} needs {} bytes but only {} remain",
            what, needed, available
        ))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, DnsError::Malformed(_))
    }

    pub fn is_forwarding(&self) -> bool {
        matches!(
            self,
            DnsError::Forwarding { .. } | DnsError::Timeout { .. }
        )
    }
}
