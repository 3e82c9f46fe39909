//! Access validation against the region map.

use emu430_core::{BusAccess, Error, Result};
use log::{debug, warn};

use crate::map::{MemoryMap, MemoryRegion};

/// Validates that an access is mapped and permitted.
#[derive(Debug, Clone)]
pub struct AccessValidator {
    map: MemoryMap,
}

impl AccessValidator {
    #[must_use]
    pub fn new(map: MemoryMap) -> Self {
        Self { map }
    }

    /// The region map being validated against.
    #[must_use]
    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    /// Check that the access is mapped and the region grants it.
    pub fn validate(&self, access: BusAccess) -> Result<&MemoryRegion> {
        let Some(region) = self.map.lookup(access.address) else {
            warn!("{access} rejected: unmapped address");
            return Err(Error::MemoryAccess {
                address: access.address,
                kind: access.kind,
                permissions: None,
            });
        };
        if !region.perms.contains(access.kind.required_permission()) {
            warn!(
                "{access} rejected: {} grants {}",
                region.description, region.perms
            );
            return Err(Error::MemoryAccess {
                address: access.address,
                kind: access.kind,
                permissions: Some(region.perms),
            });
        }
        debug!("{access} -> {}", region.description);
        Ok(region)
    }
}
