//! Shared helpers for the integration tests

#![allow(dead_code)] // Not every test binary uses every helper

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use zonekeeper::{
    config::{SuffixMatch, ZoneDescriptor},
    dns::{DNSPacket, enums::DNSResourceType, question::DNSQuestion},
    zone::{AuthoritativeResponder, ZoneLoader, ZoneRegistry},
};

/// Zone `www.example.com. A 93.184.216.34` plus a few extra records
pub const EXAMPLE_COM_ZONE: &str = r#"
$ORIGIN example.com.
$TTL 86400
@       IN  SOA ns1.example.com. hostmaster.example.com. 2024010101 3600 900 604800 86400
@       IN  NS  ns1.example.com.
www     IN  A   93.184.216.34
www     IN  AAAA 2001:db8::34
@       IN  MX  10 mail.example.com.
@       IN  TXT "v=spf1 -all"
"#;

pub const EXAMPLE_ORG_ZONE: &str = r#"
$ORIGIN example.org.
www     300 IN  A   198.51.100.7
"#;

/// Directory of zone files that lives as long as the test holds it
pub struct ZoneFiles {
    dir: TempDir,
}

impl ZoneFiles {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write(&self, file_name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

pub fn registry(zones: &[(&str, PathBuf)], mode: SuffixMatch) -> ZoneRegistry {
    ZoneRegistry::new(
        zones
            .iter()
            .map(|(name, path)| ZoneDescriptor::new(*name, path.clone()))
            .collect(),
    )
    .with_suffix_match(mode)
}

pub fn responder(zones: &[(&str, PathBuf)]) -> AuthoritativeResponder {
    responder_with_mode(zones, SuffixMatch::Legacy)
}

pub fn responder_with_mode(zones: &[(&str, PathBuf)], mode: SuffixMatch) -> AuthoritativeResponder {
    let loader = ZoneLoader::new(Arc::new(registry(zones, mode)));
    AuthoritativeResponder::new(Arc::new(loader))
}

pub fn create_test_query(domain: &str, qtype: DNSResourceType) -> DNSPacket {
    create_test_query_with_id(1234, domain, qtype)
}

pub fn create_test_query_with_id(id: u16, domain: &str, qtype: DNSResourceType) -> DNSPacket {
    DNSPacket::query(id, DNSQuestion::new(domain, qtype))
}

/// Send a response through the wire codec and back, as a client would see it
pub fn on_the_wire(response: &DNSPacket) -> DNSPacket {
    DNSPacket::parse(&response.serialize().unwrap()).unwrap()
}
