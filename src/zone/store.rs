use super::record::{RecordKey, ResourceRecord};
use crate::dns::enums::DNSResourceType;
use std::collections::HashMap;
use tracing::trace;

/// The records of one loaded zone, keyed by exact owner name and type.
///
/// A store is built once from a zone file and never mutated afterwards;
/// switching zones replaces the whole store.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: HashMap<RecordKey, ResourceRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any earlier record with the same key
    pub fn insert(&mut self, record: ResourceRecord) {
        let key = record.key();
        if let Some(previous) = self.records.insert(key, record) {
            trace!(
                "Replaced earlier {} record for {}",
                previous.record_type(),
                previous.owner
            );
        }
    }

    /// Exact-match lookup; owner names are compared as written
    pub fn lookup(&self, name: &str, rtype: DNSResourceType) -> Option<&ResourceRecord> {
        self.records.get(&RecordKey::new(name, rtype))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all stored records
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.records.values()
    }
}

impl FromIterator<ResourceRecord> for RecordStore {
    fn from_iter<I: IntoIterator<Item = ResourceRecord>>(iter: I) -> Self {
        let mut store = RecordStore::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::ZoneParser;
    use crate::zone::record::RecordData;

    #[test]
    fn test_later_duplicate_overwrites_earlier() {
        let store: RecordStore = ZoneParser::new(
            "www.example.com. A 192.0.2.1\nwww.example.com. A 192.0.2.2\nwww.example.com. AAAA ::1\n",
        )
        .collect();

        assert_eq!(store.len(), 2);
        let a = store.lookup("www.example.com.", DNSResourceType::A).unwrap();
        assert_eq!(a.data, RecordData::A("192.0.2.2".parse().unwrap()));
    }

    #[test]
    fn test_lookup_is_exact() {
        let store: RecordStore = ZoneParser::new("www.example.com. A 192.0.2.1\n").collect();

        assert!(store.lookup("www.example.com.", DNSResourceType::A).is_some());
        assert!(store.lookup("www.example.com", DNSResourceType::A).is_none());
        assert!(store.lookup("WWW.example.com.", DNSResourceType::A).is_none());
        assert!(store.lookup("www.example.com.", DNSResourceType::TXT).is_none());
    }

    #[test]
    fn test_empty_store() {
        let store = RecordStore::new();
        assert!(store.is_empty());
        assert_eq!(store.records().count(), 0);
        assert!(store.lookup("anything.", DNSResourceType::A).is_none());
    }
}
