use std::{
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

use tracing::{debug, error, info, warn};

use crate::{
    constants,
    dns_header::RCODE_SERVER_FAILURE,
    dns_packet::DNSPacket,
    error::Result,
    resolver::ForwardingResolver,
    upstream::UdpUpstream,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub upstream: Option<SocketAddr>,
    pub upstream_timeout: Duration,
    pub max_in_flight: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 2053)),
            upstream: None,
            upstream_timeout: constants::DEFAULT_UPSTREAM_TIMEOUT,
            max_in_flight: 1,
        }
    }
}

impl ServerConfig {
    pub fn resolver(&self) -> ForwardingResolver {
        match self.upstream {
            Some(addr) => ForwardingResolver::forwarding(
                UdpUpstream::new(addr, self.upstream_timeout),
                self.max_in_flight,
            ),
            None => ForwardingResolver::placeholder(),
        }
    }
}

/// Receives queries on one UDP socket and answers each before reading the next.
pub struct DnsServer {
    socket: UdpSocket,
    resolver: ForwardingResolver,
}

impl DnsServer {
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        Self::with_resolver(config.bind, config.resolver())
    }

    pub fn with_resolver(bind: SocketAddr, resolver: ForwardingResolver) -> Result<Self> {
        let socket = UdpSocket::bind(bind)?;
        Ok(Self { socket, resolver })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Runs until the listening socket fails.
    pub fn serve(&self) -> Result<()> {
        let local_addr = self.local_addr()?;
        info!(
            bind_address = %local_addr,
            forwarding = self.resolver.is_forwarding(),
            "DNS server ready"
        );

        let mut buf = [0; constants::UDP_DNS_MESSAGE_SIZE];
        loop {
            let (size, source) = self.socket.recv_from(&mut buf).map_err(|e| {
                error!(error = %e, "Error receiving data");
                e
            })?;
            debug!(peer = %source, bytes = size, "Received datagram");

            let Some(reply) = self.handle_datagram(&buf[..size]) else {
                continue;
            };
            if let Err(e) = self.socket.send_to(&reply, source) {
                warn!(peer = %source, error = %e, "Failed to send response");
            }
        }
    }

    /// Decode, resolve, flip to a response and encode. `None` means the
    /// datagram is dropped without a reply.
    pub fn handle_datagram(&self, data: &[u8]) -> Option<Vec<u8>> {
        let mut query = match DNSPacket::parse(data) {
            Ok(query) => query,
            Err(e) => {
                warn!(bytes = data.len(), error = %e, "Dropping malformed datagram");
                return None;
            }
        };

        if let Err(e) = self.resolver.resolve(&mut query) {
            if !e.is_forwarding() {
                error!(id = query.id(), error = %e, "Failed to resolve query");
                return None;
            }
            error!(id = query.id(), error = %e, "Forwarding failed");
            query.fail_with(RCODE_SERVER_FAILURE).ok()?;
        }

        query.toggle_response_flag();
        debug!(
            id = query.id(),
            questions = query.questions().len(),
            answers = query.answers().len(),
            rcode = query.flags().rcode(),
            "Sending reply"
        );
        Some(query.to_bytes())
    }
}
