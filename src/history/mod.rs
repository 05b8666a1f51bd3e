//! Branch-on-write version history.
//!
//! Content edits go through [`VersionHistory::append`], which drops any versions after the
//! current position before pushing. Layout tweaks rewrite the current slot in place and never
//! create a version.

use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::ids::LayerId;
use crate::scene::layout::{Layout, LayoutField};
use crate::scene::model::{LayoutTarget, Version};

/// Ordered versions plus a current position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VersionHistory {
    versions: Vec<Version>,
    current: Option<usize>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an existing stack, positioned at its last version.
    pub fn from_versions(versions: Vec<Version>) -> Self {
        let current = versions.len().checked_sub(1);
        Self { versions, current }
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Current position, `None` when there is no active version.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Version> {
        self.current.and_then(|i| self.versions.get(i))
    }

    /// Push a content edit, discarding everything after the current position.
    pub fn append(&mut self, version: Version) -> ForgeResult<usize> {
        version.validate()?;
        let keep = self.current.map_or(0, |i| i + 1);
        let dropped = self.versions.len().saturating_sub(keep);
        if dropped > 0 {
            tracing::debug!(dropped, "branching history, forward versions discarded");
        }
        self.versions.truncate(keep);
        self.versions.push(version);
        let idx = self.versions.len() - 1;
        self.current = Some(idx);
        Ok(idx)
    }

    /// Move the current position without touching the stored versions.
    ///
    /// Out-of-range indices are ignored; returns whether the position changed.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.versions.len() {
            tracing::debug!(index, len = self.versions.len(), "ignoring out-of-range version");
            return false;
        }
        self.current = Some(index);
        true
    }

    /// Rewrite one layout field of the current version in place.
    ///
    /// Returns `false` when there is no current version or the target layer does not exist.
    pub fn update_current_layout(
        &mut self,
        target: LayoutTarget,
        field: LayoutField,
        value: f64,
    ) -> bool {
        let Some(layout) = self.current_layout_mut(target) else {
            return false;
        };
        layout.set(field, value);
        true
    }

    /// Reset a layout of the current version to defaults, in place.
    pub fn reset_current_layout(&mut self, target: LayoutTarget) -> bool {
        let Some(layout) = self.current_layout_mut(target) else {
            return false;
        };
        *layout = Layout::default();
        true
    }

    /// Append a version equal to the current one minus `layer`.
    ///
    /// Returns `Ok(None)` when there is no current version or it has no such layer.
    pub fn remove_layer(&mut self, layer: LayerId) -> ForgeResult<Option<usize>> {
        let Some(current) = self.current() else {
            return Ok(None);
        };
        if current.layer(layer).is_none() {
            return Ok(None);
        }
        let layers = current
            .layers
            .iter()
            .filter(|l| l.id != layer)
            .cloned()
            .collect();
        let next = current.derive_with_layers(layers);
        self.append(next).map(Some)
    }

    /// Version at `index`.
    pub fn get(&self, index: usize) -> ForgeResult<&Version> {
        self.versions.get(index).ok_or_else(|| {
            ForgeError::validation(format!(
                "version index {index} out of range (len {})",
                self.versions.len()
            ))
        })
    }

    pub fn clear(&mut self) {
        self.versions.clear();
        self.current = None;
    }

    fn current_layout_mut(&mut self, target: LayoutTarget) -> Option<&mut Layout> {
        let idx = self.current?;
        self.versions.get_mut(idx)?.layout_mut(target)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/history.rs"]
mod tests;
