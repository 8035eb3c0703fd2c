use crate::dns::constants::DEFAULT_UDP_PAYLOAD;
use crate::error::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One configured zone: the name it answers for and the file holding it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl ZoneDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// How a zone name is matched against the tail of a query name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SuffixMatch {
    /// Plain character suffix: `example.com` also owns `notexample.com.`
    ///
    /// Unlike a strict byte-wise "ends with and is longer" test, the
    /// comparison ignores ASCII case and a name equal to the zone (its
    /// apex) also matches.
    #[default]
    #[serde(rename = "legacy")]
    Legacy,
    /// The suffix must start at a label boundary
    #[serde(rename = "label")]
    LabelAligned,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Addresses to serve on; each gets a UDP socket and a TCP listener
    pub addresses: Vec<SocketAddr>,

    /// Zones in configuration order; later entries win ties
    #[serde(default)]
    pub zones: Vec<ZoneDescriptor>,

    /// Receive buffer for UDP queries
    #[serde(default = "default_udp_payload_size")]
    pub udp_payload_size: u16,

    #[serde(default)]
    pub suffix_match: SuffixMatch,

    /// Idle TCP connections are closed after this many seconds
    #[serde(default = "default_tcp_idle_timeout")]
    pub tcp_idle_timeout_secs: u64,
}

fn default_udp_payload_size() -> u16 {
    u16::MAX
}

fn default_tcp_idle_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addresses: vec![SocketAddr::from(([127, 0, 0, 1], 1053))],
            zones: vec![],
            udp_payload_size: default_udp_payload_size(),
            suffix_match: SuffixMatch::default(),
            tcp_idle_timeout_secs: default_tcp_idle_timeout(),
        }
    }
}

impl Config {
    /// Read, override from the environment and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `ZONEKEEPER_*` environment variable overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addresses) = lookup("ZONEKEEPER_ADDRESSES") {
            let parsed: Result<Vec<SocketAddr>, _> = addresses
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<SocketAddr>()
                        .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
                })
                .collect();
            self.addresses = parsed?;
            debug!("Listen addresses overridden: {:?}", self.addresses);
        }

        if let Some(size) = lookup("ZONEKEEPER_UDP_PAYLOAD_SIZE") {
            self.udp_payload_size = size
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPayloadSize(size.clone()))?;
            debug!("UDP payload size overridden: {}", self.udp_payload_size);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addresses.is_empty() {
            return Err(ConfigError::NoAddresses);
        }

        if (self.udp_payload_size as usize) < DEFAULT_UDP_PAYLOAD {
            return Err(ConfigError::InvalidPayloadSize(format!(
                "{} is below the {} byte minimum",
                self.udp_payload_size, DEFAULT_UDP_PAYLOAD
            )));
        }

        for (i, zone) in self.zones.iter().enumerate() {
            if zone.name.trim_end_matches('.').is_empty() {
                return Err(ConfigError::InvalidZone(format!("zone #{} has an empty name", i)));
            }
            if zone.path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidZone(format!(
                    "zone {} has an empty path",
                    zone.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
addresses = ["127.0.0.1:1053", "[::1]:1053"]

[[zones]]
name = "example.com"
path = "zones/example.com.zone"

[[zones]]
name = "example.org."
path = "zones/example.org.zone"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.addresses.len(), 2);
        assert_eq!(config.zones.len(), 2);
        assert_eq!(config.zones[0], ZoneDescriptor::new("example.com", "zones/example.com.zone"));
        assert_eq!(config.udp_payload_size, 65535);
        assert_eq!(config.suffix_match, SuffixMatch::Legacy);
        assert_eq!(config.tcp_idle_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_label_suffix_mode() {
        let config = Config::from_toml_str(
            "addresses = [\"127.0.0.1:53\"]\nsuffix_match = \"label\"\n",
        )
        .unwrap();
        assert_eq!(config.suffix_match, SuffixMatch::LabelAligned);
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            Config::from_toml_str("addresses = [\"not an address\"]"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("zones = []"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.udp_payload_size = 100;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPayloadSize(_))));

        config.udp_payload_size = 4096;
        config.zones.push(ZoneDescriptor::new(".", "x.zone"));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidZone(_))));

        config.zones.clear();
        config.addresses.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoAddresses));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "ZONEKEEPER_ADDRESSES" => Some("0.0.0.0:53, 127.0.0.1:5353".to_string()),
                "ZONEKEEPER_UDP_PAYLOAD_SIZE" => Some("1232".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.addresses.len(), 2);
        assert_eq!(config.udp_payload_size, 1232);

        let err = config
            .apply_overrides(|key| (key == "ZONEKEEPER_ADDRESSES").then(|| "nope".to_string()))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidAddress("nope".to_string()));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/zonekeeper.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
