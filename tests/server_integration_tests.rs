// Server integration tests
//
// These start the listeners on ephemeral loopback ports and talk to them
// over real UDP and TCP sockets.

mod common;

use common::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpStream, UdpSocket},
    sync::broadcast,
    task::JoinHandle,
    time::timeout,
};
use zonekeeper::{
    config::{Config, ZoneDescriptor},
    dns::{DNSPacket, DNSRcode, enums::DNSResourceType},
    error::DnsError,
    server::DnsServer,
    zone::ZoneRegistry,
};

struct TestServer {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<Result<(), DnsError>>,
}

async fn start_test_server(zones: Vec<ZoneDescriptor>) -> TestServer {
    let config = Config {
        addresses: vec!["127.0.0.1:0".parse().unwrap()],
        zones,
        tcp_idle_timeout_secs: 2,
        ..Default::default()
    };
    let registry = Arc::new(ZoneRegistry::from_config(&config));
    let server = DnsServer::bind(registry).await.unwrap();
    let addr = server.local_addrs()[0];

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(server.run(shutdown_rx));

    TestServer {
        addr,
        shutdown_tx,
        handle,
    }
}

async fn udp_exchange(addr: SocketAddr, query: &[u8]) -> Option<DNSPacket> {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sock.send_to(query, addr).await.unwrap();

    let mut buf = vec![0u8; 4096];
    let len = timeout(Duration::from_secs(2), sock.recv(&mut buf))
        .await
        .ok()?
        .unwrap();
    Some(DNSPacket::parse(&buf[..len]).unwrap())
}

async fn tcp_exchange(stream: &mut TcpStream, query: &[u8]) -> DNSPacket {
    stream
        .write_all(&(query.len() as u16).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(query).await.unwrap();

    let mut length_buf = [0u8; 2];
    stream.read_exact(&mut length_buf).await.unwrap();
    let mut response = vec![0u8; u16::from_be_bytes(length_buf) as usize];
    stream.read_exact(&mut response).await.unwrap();
    DNSPacket::parse(&response).unwrap()
}

fn query_bytes(id: u16, domain: &str, qtype: DNSResourceType) -> Vec<u8> {
    create_test_query_with_id(id, domain, qtype)
        .serialize()
        .unwrap()
}

#[tokio::test]
async fn test_udp_query() {
    let files = ZoneFiles::new();
    let path = files.write("example.com.zone", EXAMPLE_COM_ZONE);
    let server = start_test_server(vec![ZoneDescriptor::new("example.com", path)]).await;

    let response = udp_exchange(
        server.addr,
        &query_bytes(0x1234, "www.example.com.", DNSResourceType::A),
    )
    .await
    .expect("no UDP response");
    assert_eq!(response.header.id, 0x1234);
    assert!(response.header.aa);
    assert_eq!(response.header.rcode, DNSRcode::NOERROR);
    assert_eq!(response.answers[0].ttl, 60);
    assert_eq!(
        response.answers[0].parsed_rdata.as_deref(),
        Some("93.184.216.34")
    );

    let response = udp_exchange(
        server.addr,
        &query_bytes(0x1235, "www.example.org.", DNSResourceType::A),
    )
    .await
    .expect("no UDP response");
    assert_eq!(response.header.rcode, DNSRcode::NXDOMAIN);
    assert!(response.header.aa);

    server.shutdown_tx.send(()).unwrap();
    assert!(server.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_tcp_query() {
    let files = ZoneFiles::new();
    let path = files.write("example.com.zone", EXAMPLE_COM_ZONE);
    let server = start_test_server(vec![ZoneDescriptor::new("example.com", path)]).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    // Several messages over one connection
    let response = tcp_exchange(
        &mut stream,
        &query_bytes(1, "example.com.", DNSResourceType::MX),
    )
    .await;
    assert_eq!(response.header.id, 1);
    assert!(response.header.aa);
    assert_eq!(
        response.answers[0].parsed_rdata.as_deref(),
        Some("10 mail.example.com.")
    );

    let response = tcp_exchange(
        &mut stream,
        &query_bytes(2, "missing.example.com.", DNSResourceType::A),
    )
    .await;
    assert_eq!(response.header.id, 2);
    assert_eq!(response.header.rcode, DNSRcode::NXDOMAIN);

    server.shutdown_tx.send(()).unwrap();
    assert!(server.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_malformed_udp_packet_is_dropped() {
    let files = ZoneFiles::new();
    let path = files.write("example.com.zone", EXAMPLE_COM_ZONE);
    let server = start_test_server(vec![ZoneDescriptor::new("example.com", path)]).await;

    assert!(udp_exchange(server.addr, &[0x12, 0x34, 0x01]).await.is_none());

    // Server keeps answering afterwards
    let response = udp_exchange(
        server.addr,
        &query_bytes(7, "www.example.com.", DNSResourceType::AAAA),
    )
    .await
    .expect("no UDP response");
    assert_eq!(response.answers[0].parsed_rdata.as_deref(), Some("2001:db8::34"));

    server.shutdown_tx.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_missing_zone_file_stops_server() {
    let server = start_test_server(vec![ZoneDescriptor::new(
        "example.com",
        PathBuf::from("/nonexistent/example.com.zone"),
    )])
    .await;

    assert!(
        udp_exchange(
            server.addr,
            &query_bytes(9, "www.example.com.", DNSResourceType::A)
        )
        .await
        .is_none()
    );

    let result = timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    let err = result.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, DnsError::Zone(_)));
}
