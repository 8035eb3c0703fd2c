use crate::dns::common::fqdn_to_labels;
use crate::dns::constants::MAX_LABEL_LEN;
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use crate::dns::resource::DNSResource;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{Result, ZoneError};

/// Lookup key into a record store: owner name exactly as it appears in the
/// zone (fully qualified) plus record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub owner: String,
    pub rtype: DNSResourceType,
}

impl RecordKey {
    pub fn new(owner: impl Into<String>, rtype: DNSResourceType) -> Self {
        Self {
            owner: owner.into(),
            rtype,
        }
    }
}

/// Type-specific value of a record the responder serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    MX { preference: u16, exchange: String },
    NS(String),
    /// Raw payload octets, concatenated from the zone file's strings
    TXT(Vec<u8>),
}

impl RecordData {
    pub fn record_type(&self) -> DNSResourceType {
        match self {
            RecordData::A(_) => DNSResourceType::A,
            RecordData::AAAA(_) => DNSResourceType::AAAA,
            RecordData::MX { .. } => DNSResourceType::MX,
            RecordData::NS(_) => DNSResourceType::NS,
            RecordData::TXT(_) => DNSResourceType::TXT,
        }
    }

    /// Encoded rdata size of a TXT payload: 255-octet character-strings,
    /// each behind a length byte, and one empty string for no data
    pub fn txt_wire_len(text: &[u8]) -> usize {
        text.len() + text.len().div_ceil(255).max(1)
    }

    /// Wire rdata plus its presentation form
    fn encode(&self) -> Result<(Vec<u8>, String)> {
        match self {
            RecordData::A(addr) => Ok((addr.octets().to_vec(), addr.to_string())),
            RecordData::AAAA(addr) => Ok((addr.octets().to_vec(), addr.to_string())),
            RecordData::MX {
                preference,
                exchange,
            } => {
                let mut rdata = preference.to_be_bytes().to_vec();
                rdata.extend(encode_domain_name(exchange)?);
                Ok((rdata, format!("{} {}", preference, exchange)))
            }
            RecordData::NS(nameserver) => Ok((encode_domain_name(nameserver)?, nameserver.clone())),
            RecordData::TXT(text) => {
                let mut rdata = Vec::with_capacity(Self::txt_wire_len(text));
                if text.is_empty() {
                    rdata.push(0);
                }
                for chunk in text.chunks(255) {
                    rdata.push(chunk.len() as u8);
                    rdata.extend_from_slice(chunk);
                }
                Ok((rdata, String::from_utf8_lossy(text).into_owned()))
            }
        }
    }
}

/// A parsed zone entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Fully qualified owner name, case as written in the zone file
    pub owner: String,
    pub class: DNSResourceClass,
    /// TTL from the zone file; not used when answering
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    pub fn record_type(&self) -> DNSResourceType {
        self.data.record_type()
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.owner.clone(), self.record_type())
    }

    /// Build the answer-section record with the given TTL
    pub fn to_answer(&self, ttl: u32) -> Result<DNSResource> {
        let (rdata, parsed) = self.data.encode()?;
        let rdlength = u16::try_from(rdata.len()).map_err(|_| {
            ZoneError::InvalidRecord(format!(
                "{} rdata of {} bytes for {} exceeds 65535",
                self.record_type(),
                rdata.len(),
                self.owner
            ))
        })?;
        Ok(DNSResource {
            labels: fqdn_to_labels(&self.owner),
            rtype: self.record_type(),
            rclass: DNSResourceClass::IN,
            ttl,
            rdlength,
            rdata,
            parsed_rdata: Some(parsed),
        })
    }
}

/// Encode a domain name to uncompressed wire format
fn encode_domain_name(name: &str) -> Result<Vec<u8>> {
    let mut encoded = Vec::with_capacity(name.len() + 2);

    for label in name.trim_end_matches('.').split('.') {
        if label.is_empty() {
            continue;
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(ZoneError::InvalidRecord(format!("Label too long: {}", label)));
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }

    encoded.push(0); // Root label

    Ok(encoded)
}
