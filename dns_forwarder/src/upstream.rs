use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::{
    constants,
    dns_packet::DNSPacket,
    error::{DnsError, Result},
};

/// Something that answers a single query: one round trip per call.
pub trait Upstream: Send + Sync {
    fn exchange(&self, query: &DNSPacket) -> Result<DNSPacket>;
}

impl<T: Upstream + ?Sized> Upstream for Arc<T> {
    fn exchange(&self, query: &DNSPacket) -> Result<DNSPacket> {
        (**self).exchange(query)
    }
}

/// Plain UDP upstream.
///
/// Every exchange binds its own ephemeral socket, so concurrent exchanges
/// never read each other's replies.
#[derive(Debug, Clone)]
pub struct UdpUpstream {
    server_addr: SocketAddr,
    bind_addr: SocketAddr,
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new(server_addr: SocketAddr, timeout: Duration) -> Self {
        // Bind to ephemeral port (0 = OS assigns)
        let bind_addr: SocketAddr = if server_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        Self::with_bind_addr(server_addr, bind_addr, timeout)
    }

    /// Sends from `bind_addr` instead of the unspecified address, e.g. to pin
    /// the source interface. A zero port still picks a fresh ephemeral port.
    pub fn with_bind_addr(
        server_addr: SocketAddr,
        bind_addr: SocketAddr,
        timeout: Duration,
    ) -> Self {
        Self {
            server_addr,
            bind_addr,
            timeout,
        }
    }

    fn failure(&self, reason: impl ToString) -> DnsError {
        DnsError::Forwarding {
            upstream: self.server_addr,
            reason: reason.to_string(),
        }
    }

    fn bind(&self) -> Result<UdpSocket> {
        UdpSocket::bind(self.bind_addr)
            .map_err(|e| self.failure(format!("bind {}: {}", self.bind_addr, e)))
    }
}

impl Upstream for UdpUpstream {
    fn exchange(&self, query: &DNSPacket) -> Result<DNSPacket> {
        let socket = self.bind()?;
        let bytes = query.to_bytes();

        let bytes_sent = socket
            .send_to(&bytes, self.server_addr)
            .map_err(|e| self.failure(e))?;
        debug!(
            upstream = %self.server_addr,
            id = query.id(),
            bytes_sent,
            "Forwarded query"
        );

        let deadline = Instant::now() + self.timeout;
        let mut response_buffer = [0; constants::UDP_DNS_MESSAGE_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(DnsError::Timeout {
                    upstream: self.server_addr,
                });
            }
            socket
                .set_read_timeout(Some(remaining))
                .map_err(|e| self.failure(e))?;

            let (size, from) = match socket.recv_from(&mut response_buffer) {
                Ok(received) => received,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(DnsError::Timeout {
                        upstream: self.server_addr,
                    });
                }
                Err(e) => return Err(self.failure(e)),
            };

            if from != self.server_addr {
                warn!(
                    expected = %self.server_addr,
                    received_from = %from,
                    "Reply from unexpected source"
                );
                continue;
            }

            let reply = DNSPacket::parse(&response_buffer[..size])
                .map_err(|e| self.failure(format!("unreadable reply: {}", e)))?;
            if reply.id() != query.id() {
                warn!(
                    upstream = %from,
                    expected = query.id(),
                    received = reply.id(),
                    "Reply id mismatch"
                );
                continue;
            }

            debug!(
                upstream = %from,
                id = reply.id(),
                bytes = size,
                answers = reply.answers().len(),
                "Upstream reply"
            );
            return Ok(reply);
        }
    }
}
