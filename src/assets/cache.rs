use std::collections::HashMap;

use crate::assets::decode::{PreparedImage, decode_ref};
use crate::assets::image_ref::ImageRef;
use crate::foundation::error::ForgeResult;

/// Decoded images kept across compose calls.
///
/// Entries are keyed by a hash of the full reference string, so a changed reference can never
/// hit a stale entry. When the cache reaches capacity it is cleared wholesale.
#[derive(Debug)]
pub(crate) struct DecodedImageCache {
    capacity: usize,
    entries: HashMap<u64, PreparedImage>,
    decodes: u64,
}

impl DecodedImageCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            decodes: 0,
        }
    }

    pub(crate) fn get_or_decode(&mut self, image: &ImageRef) -> ForgeResult<PreparedImage> {
        let key = image.cache_key();
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.clone());
        }

        let prepared = decode_ref(image)?;
        self.decodes += 1;
        if self.entries.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "decoded image cache full, clearing");
            self.entries.clear();
        }
        self.entries.insert(key, prepared.clone());
        Ok(prepared)
    }

    /// Number of actual decodes performed.
    pub(crate) fn decode_count(&self) -> u64 {
        self.decodes
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
