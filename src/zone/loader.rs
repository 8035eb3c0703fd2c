//! Lazy zone switching.
//!
//! Only one zone is held in memory at a time. A query for a name owned by a
//! different zone parses that zone's file and replaces the active snapshot
//! as a whole, so a reader sees either the old zone or the new one.

use super::registry::ZoneRegistry;
use super::store::RecordStore;
use super::{Result, ZoneError, ZoneParser};
use crate::config::ZoneDescriptor;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace};

/// The currently loaded zone and its records
#[derive(Debug)]
pub struct ActiveZone {
    /// Position of the zone in the registry
    pub index: usize,
    pub descriptor: ZoneDescriptor,
    pub records: RecordStore,
}

pub struct ZoneLoader {
    registry: Arc<ZoneRegistry>,
    active: ArcSwapOption<ActiveZone>,
    /// Serializes zone switches; readers never take it
    switch_lock: Mutex<()>,
    loads: AtomicU64,
}

impl ZoneLoader {
    pub fn new(registry: Arc<ZoneRegistry>) -> Self {
        Self {
            registry,
            active: ArcSwapOption::empty(),
            switch_lock: Mutex::new(()),
            loads: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Make the zone owning `name` the active one and return it.
    ///
    /// `Ok(None)` means no configured zone owns the name. A zone file that
    /// cannot be opened or read yields a fatal error.
    pub fn resolve_zone_for(&self, name: &str) -> Result<Option<Arc<ActiveZone>>> {
        let Some((index, descriptor)) = self.registry.find_owner(name) else {
            trace!("No zone owns {}", name);
            return Ok(None);
        };

        if let Some(zone) = self.active_for(index) {
            trace!("Zone {} already active for {}", descriptor.name, name);
            return Ok(Some(zone));
        }

        let _guard = self.switch_lock.lock();

        // Another query may have loaded it while we waited
        if let Some(zone) = self.active_for(index) {
            return Ok(Some(zone));
        }

        let zone = Arc::new(self.load(index, descriptor)?);
        self.active.store(Some(Arc::clone(&zone)));
        Ok(Some(zone))
    }

    /// Snapshot of the active zone, if any
    pub fn active(&self) -> Option<Arc<ActiveZone>> {
        self.active.load_full()
    }

    /// Number of zone files parsed so far
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Forget the active zone so the next query re-reads its file
    pub fn invalidate(&self) {
        if let Some(previous) = self.active.swap(None) {
            info!("Dropped active zone {}", previous.descriptor.name);
        }
    }

    fn active_for(&self, index: usize) -> Option<Arc<ActiveZone>> {
        self.active.load_full().filter(|zone| zone.index == index)
    }

    fn load(&self, index: usize, descriptor: &ZoneDescriptor) -> Result<ActiveZone> {
        let path = &descriptor.path;
        debug!("Loading zone {} from {}", descriptor.name, path.display());

        let mut file = std::fs::File::open(path).map_err(|e| ZoneError::ZoneFileOpen {
            path: path.clone(),
            source: Arc::new(e),
        })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ZoneError::ZoneFileRead {
                path: path.clone(),
                source: Arc::new(e),
            })?;

        let records: RecordStore = ZoneParser::with_origin(&contents, &descriptor.name).collect();
        self.loads.fetch_add(1, Ordering::Relaxed);

        info!(
            "Loaded zone {} with {} records",
            descriptor.name,
            records.len()
        );

        Ok(ActiveZone {
            index,
            descriptor: descriptor.clone(),
            records,
        })
    }
}
