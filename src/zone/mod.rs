pub mod authoritative;
pub mod errors;
pub mod loader;
pub mod parser;
pub mod record;
pub mod registry;
pub mod store;

pub use crate::config::{SuffixMatch, ZoneDescriptor};
pub use authoritative::AuthoritativeResponder;
pub use errors::{Result, ZoneError};
pub use loader::{ActiveZone, ZoneLoader};
pub use parser::ZoneParser;
pub use record::{RecordData, RecordKey, ResourceRecord};
pub use registry::ZoneRegistry;
pub use store::RecordStore;

/// Zone constants
pub mod constants {
    /// Default TTL if not specified (1 hour)
    pub const DEFAULT_TTL: u32 = 3600;

    /// TTL carried by every answer, whatever the zone file declares
    pub const ANSWER_TTL: u32 = 60;
}
