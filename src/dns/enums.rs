use std::fmt;

/// Resource record types the responder knows by name.
///
/// Codes without a named variant are carried as `Unknown` so that a
/// question for an exotic type can still be echoed back unchanged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    CAA,
    ANY,
    Unknown(u16),
}

impl DNSResourceType {
    /// Parse a presentation mnemonic (`"A"`, `"aaaa"`, `"TYPE65"`)
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        let upper = s.to_ascii_uppercase();
        let rtype = match upper.as_str() {
            "A" => DNSResourceType::A,
            "NS" => DNSResourceType::NS,
            "CNAME" => DNSResourceType::CNAME,
            "SOA" => DNSResourceType::SOA,
            "PTR" => DNSResourceType::PTR,
            "MX" => DNSResourceType::MX,
            "TXT" => DNSResourceType::TXT,
            "AAAA" => DNSResourceType::AAAA,
            "SRV" => DNSResourceType::SRV,
            "OPT" => DNSResourceType::OPT,
            "CAA" => DNSResourceType::CAA,
            "ANY" => DNSResourceType::ANY,
            _ => {
                let code = upper.strip_prefix("TYPE")?.parse::<u16>().ok()?;
                DNSResourceType::from(code)
            }
        };
        Some(rtype)
    }
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            33 => DNSResourceType::SRV,
            41 => DNSResourceType::OPT,
            255 => DNSResourceType::ANY,
            257 => DNSResourceType::CAA,
            x => DNSResourceType::Unknown(x),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(rtype: DNSResourceType) -> Self {
        match rtype {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::SRV => 33,
            DNSResourceType::OPT => 41,
            DNSResourceType::ANY => 255,
            DNSResourceType::CAA => 257,
            DNSResourceType::Unknown(x) => x,
        }
    }
}

impl fmt::Display for DNSResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceType::Unknown(code) => write!(f, "TYPE{}", code),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CS,
    CH,
    HS,
    Unknown(u16),
}

impl DNSResourceClass {
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Some(DNSResourceClass::IN),
            "CS" => Some(DNSResourceClass::CS),
            "CH" => Some(DNSResourceClass::CH),
            "HS" => Some(DNSResourceClass::HS),
            _ => None,
        }
    }
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            2 => DNSResourceClass::CS,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            x => DNSResourceClass::Unknown(x),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(class: DNSResourceClass) -> Self {
        match class {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CS => 2,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Unknown(x) => x,
        }
    }
}
