/// DNS Response Code constants from RFC 1035
pub struct DNSRcode;

impl DNSRcode {
    pub const NOERROR: u8 = 0; // No error
    pub const FORMERR: u8 = 1; // Format error
    pub const SERVFAIL: u8 = 2; // Server failure
    pub const NXDOMAIN: u8 = 3; // Name error
    pub const NOTIMP: u8 = 4; // Not implemented
    pub const REFUSED: u8 = 5; // Query refused
}

/// Longest label allowed on the wire
pub const MAX_LABEL_LEN: usize = 63;

/// Longest encoded domain name, including length octets and the root
pub const MAX_NAME_LEN: usize = 255;

/// Compression pointers followed before a name is rejected as looping
pub const MAX_POINTER_HOPS: usize = 32;

/// Payload size assumed for plain (non-EDNS) UDP
pub const DEFAULT_UDP_PAYLOAD: usize = 512;
