pub mod config;
pub mod dns;
pub mod error;
pub mod server;
pub mod zone;

pub use dns::DNSPacket;
