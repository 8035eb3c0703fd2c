use crate::config::{Config, SuffixMatch, ZoneDescriptor};
use std::net::SocketAddr;
use std::time::Duration;

/// Zones and listen addresses the server was started with.
///
/// Built once from a validated [`Config`] and never changed afterwards.
#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    zones: Vec<ZoneDescriptor>,
    addresses: Vec<SocketAddr>,
    udp_payload_size: usize,
    tcp_idle_timeout: Duration,
    suffix_match: SuffixMatch,
}

impl ZoneRegistry {
    /// Registry serving `zones` with no listen addresses, for embedding
    pub fn new(zones: Vec<ZoneDescriptor>) -> Self {
        let defaults = Config::default();
        Self {
            zones,
            addresses: vec![],
            udp_payload_size: defaults.udp_payload_size as usize,
            tcp_idle_timeout: Duration::from_secs(defaults.tcp_idle_timeout_secs),
            suffix_match: defaults.suffix_match,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            zones: config.zones.clone(),
            addresses: config.addresses.clone(),
            udp_payload_size: config.udp_payload_size as usize,
            tcp_idle_timeout: Duration::from_secs(config.tcp_idle_timeout_secs),
            suffix_match: config.suffix_match,
        }
    }

    pub fn with_suffix_match(mut self, mode: SuffixMatch) -> Self {
        self.suffix_match = mode;
        self
    }

    pub fn zones(&self) -> &[ZoneDescriptor] {
        &self.zones
    }

    pub fn addresses(&self) -> &[SocketAddr] {
        &self.addresses
    }

    pub fn udp_payload_size(&self) -> usize {
        self.udp_payload_size
    }

    pub fn tcp_idle_timeout(&self) -> Duration {
        self.tcp_idle_timeout
    }

    pub fn suffix_match(&self) -> SuffixMatch {
        self.suffix_match
    }

    /// Zone owning `name`, with its position in the configured list.
    ///
    /// Every zone is tested and the last one that matches is returned, so a
    /// later entry shadows an earlier one even when the earlier entry is the
    /// longer suffix.
    pub fn find_owner(&self, name: &str) -> Option<(usize, &ZoneDescriptor)> {
        self.zones
            .iter()
            .enumerate()
            .filter(|(_, zone)| zone_matches(self.suffix_match, &zone.name, name))
            .last()
    }
}

/// Whether `zone` is a suffix of `name`.
///
/// In legacy mode the test is a plain byte suffix, so `example.com` owns
/// `notexample.com.` as well as `www.example.com.`.
pub fn zone_matches(mode: SuffixMatch, zone: &str, name: &str) -> bool {
    let zone = zone.trim_end_matches('.').as_bytes();
    let name = name.trim_end_matches('.').as_bytes();

    if zone.len() > name.len() {
        return false;
    }

    let split = name.len() - zone.len();
    if !name[split..].eq_ignore_ascii_case(zone) {
        return false;
    }

    match mode {
        SuffixMatch::Legacy => true,
        SuffixMatch::LabelAligned => zone.is_empty() || split == 0 || name[split - 1] == b'.',
    }
}
