use std::{
    io,
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use dns_forwarder::{
    class::Class, record_type::RecordType, DNSHeader, DNSPacket, DNSQuestion, DnsServer,
    DomainName, Flags, Label, ServerConfig,
};
use rand::Rng;

const STUB_TTL: u32 = 1800;
const STUB_DATA: [u8; 4] = [192, 0, 2, 1];

/// Upstream that answers every single-question query with one fixed record.
fn spawn_stub_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = socket.local_addr().unwrap();
    let received = Arc::new(AtomicUsize::new(0));
    let counter = received.clone();

    thread::spawn(move || {
        let mut buf = [0; 512];
        loop {
            let Ok((size, peer)) = socket.recv_from(&mut buf) else {
                return;
            };
            let mut query = DNSPacket::parse(&buf[..size]).unwrap();
            assert_eq!(query.questions().len(), 1, "upstream got a multi-question query");
            counter.fetch_add(1, Ordering::SeqCst);

            query.toggle_response_flag();
            query.add_answer(0, STUB_TTL, STUB_DATA.to_vec()).unwrap();
            socket.send_to(&query.to_bytes(), peer).unwrap();
        }
    });

    (addr, received)
}

fn spawn_server(config: ServerConfig) -> SocketAddr {
    let server = DnsServer::bind(&config).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.serve());
    addr
}

fn client() -> UdpSocket {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    socket
}

fn ask(socket: &UdpSocket, server: SocketAddr, query: &DNSPacket) -> DNSPacket {
    socket.send_to(&query.to_bytes(), server).unwrap();
    let mut buf = [0; 512];
    let (size, _) = socket.recv_from(&mut buf).unwrap();
    DNSPacket::parse(&buf[..size]).unwrap()
}

fn config() -> ServerConfig {
    ServerConfig {
        bind: (Ipv4Addr::LOCALHOST, 0).into(),
        ..Default::default()
    }
}

fn query(id: u16, names: &[(&str, RecordType)]) -> DNSPacket {
    let mut flags = Flags::default();
    flags.set_rd(true);
    let mut packet = DNSPacket::new(DNSHeader::new(id, flags));
    for (name, record_type) in names {
        packet
            .push_question(DNSQuestion::new(name.parse().unwrap(), *record_type, Class::In))
            .unwrap();
    }
    packet
}

#[test]
fn test_placeholder_answer_over_udp() {
    let server = spawn_server(config());
    let client = client();

    let reply = ask(&client, server, &query(0x1234, &[("example.com", RecordType::A)]));

    assert_eq!(reply.id(), 0x1234);
    assert!(reply.flags().qr());
    assert!(reply.flags().rd());
    assert_eq!(reply.header().ancount(), 1);

    let answer = &reply.answers()[0];
    assert_eq!(answer.name().to_string(), "example.com");
    assert_eq!(answer.record_type(), RecordType::A);
    assert_eq!(answer.ttl(), 60);
    assert_eq!(answer.data().len(), 4);
}

#[test]
fn test_forwards_each_question_and_replies_once() {
    let (upstream, received) = spawn_stub_upstream();
    let server = spawn_server(ServerConfig {
        upstream: Some(upstream),
        ..config()
    });
    let client = client();

    let id = rand::thread_rng().gen();
    let sent = query(
        id,
        &[("abc.example.com", RecordType::A), ("def.example.org", RecordType::AAAA)],
    );
    let reply = ask(&client, server, &sent);

    assert_eq!(received.load(Ordering::SeqCst), 2);
    assert_eq!(reply.id(), id);
    assert!(reply.flags().qr());
    assert_eq!(reply.answers().len(), 2);
    for (answer, question) in reply.answers().iter().zip(sent.questions()) {
        assert_eq!(answer.name(), question.name());
        assert_eq!(answer.type_(), question.type_());
        assert_eq!(answer.class(), question.class());
        assert_eq!(answer.ttl(), STUB_TTL);
        assert_eq!(answer.data(), &STUB_DATA);
    }

    client
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut buf = [0; 512];
    let err = client.recv_from(&mut buf).unwrap_err();
    assert!(matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    ));
}

#[test]
fn test_concurrent_forwarding_over_udp() {
    let (upstream, received) = spawn_stub_upstream();
    let server = spawn_server(ServerConfig {
        upstream: Some(upstream),
        max_in_flight: 4,
        ..config()
    });
    let client = client();

    let names: Vec<String> = (0..6).map(|n| format!("host{}.example.net", n)).collect();
    let questions: Vec<(&str, RecordType)> =
        names.iter().map(|n| (n.as_str(), RecordType::A)).collect();
    let reply = ask(&client, server, &query(99, &questions));

    assert_eq!(received.load(Ordering::SeqCst), 6);
    let answered: Vec<String> = reply.answers().iter().map(|a| a.name().to_string()).collect();
    assert_eq!(answered, names);
}

#[test]
fn test_malformed_datagram_is_dropped_and_server_keeps_running() {
    let server = spawn_server(config());
    let client = client();

    client.send_to(&[0x12, 0x34, 0x01, 0x00, 0x00], server).unwrap();
    let reply = ask(&client, server, &query(0x0102, &[("ok.test", RecordType::A)]));

    assert_eq!(reply.id(), 0x0102);
    assert_eq!(reply.answers().len(), 1);
}

#[test]
fn test_random_messages_round_trip() {
    let mut rng = rand::thread_rng();

    for _ in 0..32 {
        let labels = (0..rng.gen_range(0..5))
            .map(|_| {
                let len = rng.gen_range(1..=20);
                let content: Vec<u8> = (0..len)
                    .map(|_| match rng.gen::<u8>() {
                        b'.' => b'-',
                        byte => byte,
                    })
                    .collect();
                Label::new(content).unwrap()
            })
            .collect();
        let name = DomainName::from_labels(labels).unwrap();

        let mut flags = Flags::default();
        flags.set_qr(rng.gen());
        flags.set_opcode(rng.gen_range(0..16)).unwrap();
        flags.set_tc(rng.gen());
        flags.set_z(rng.gen_range(0..8)).unwrap();
        flags.set_rcode(rng.gen_range(0..16)).unwrap();

        let question = DNSQuestion::new(name, rng.gen::<u16>(), rng.gen::<u16>());
        let mut packet = DNSPacket::query(rng.gen(), flags, question);
        packet
            .add_answer(0, rng.gen(), (0..rng.gen_range(0..32)).map(|_| rng.gen()).collect())
            .unwrap();

        assert_eq!(DNSPacket::parse(&packet.to_bytes()).unwrap(), packet);
    }
}
