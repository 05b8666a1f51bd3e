use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::assets::image_ref::ImageRef;
use crate::foundation::core::{Timestamp, now};
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::ids::{LayerId, ProjectId, VersionId};
use crate::scene::layout::Layout;

/// Which layout inside a version an edit addresses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum LayoutTarget {
    /// The version's base image.
    #[default]
    Base,
    /// One layer, by id.
    Layer(LayerId),
}

/// A positionable image drawn above the base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub url: ImageRef,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub name: String,
}

impl Layer {
    pub fn new(url: ImageRef, name: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(),
            url,
            layout: Layout::default(),
            name: name.into(),
        }
    }

    /// Copy of this layer under a fresh id, for carrying into a new version.
    pub fn duplicate(&self) -> Self {
        Self {
            id: LayerId::new(),
            ..self.clone()
        }
    }
}

/// One composed state in a project's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: VersionId,
    /// Base image.
    pub url: ImageRef,
    /// Paint order: later layers cover earlier ones.
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub base_layout: Layout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub timestamp: Timestamp,
}

impl Version {
    /// A version holding only a base image.
    pub fn from_base(url: ImageRef) -> Self {
        Self {
            id: VersionId::new(),
            url,
            layers: Vec::new(),
            base_layout: Layout::default(),
            prompt: None,
            timestamp: now(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Derive a new version sharing this base and base layout, with `layers` as its layer list.
    pub fn derive_with_layers(&self, layers: Vec<Layer>) -> Self {
        Self {
            id: VersionId::new(),
            url: self.url.clone(),
            layers,
            base_layout: self.base_layout,
            prompt: None,
            timestamp: now(),
        }
    }

    /// Copies of this version's layers under fresh ids.
    pub fn duplicated_layers(&self) -> Vec<Layer> {
        self.layers.iter().map(Layer::duplicate).collect()
    }

    /// Copy under a fresh id and timestamp, layers duplicated.
    pub fn duplicate(&self) -> Self {
        Self {
            id: VersionId::new(),
            layers: self.duplicated_layers(),
            timestamp: now(),
            ..self.clone()
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layout(&self, target: LayoutTarget) -> Option<&Layout> {
        match target {
            LayoutTarget::Base => Some(&self.base_layout),
            LayoutTarget::Layer(id) => self.layer(id).map(|l| &l.layout),
        }
    }

    pub fn layout_mut(&mut self, target: LayoutTarget) -> Option<&mut Layout> {
        match target {
            LayoutTarget::Base => Some(&mut self.base_layout),
            LayoutTarget::Layer(id) => self
                .layers
                .iter_mut()
                .find(|l| l.id == id)
                .map(|l| &mut l.layout),
        }
    }

    /// Check that layer ids are unique within the version.
    pub fn validate(&self) -> ForgeResult<()> {
        let mut seen = HashSet::with_capacity(self.layers.len());
        for layer in &self.layers {
            if !seen.insert(layer.id) {
                return Err(ForgeError::validation(format!(
                    "version {} has duplicate layer id {}",
                    self.id, layer.id
                )));
            }
        }
        Ok(())
    }
}

/// Unit of persistence: a named history plus pinned snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Preview of the current version.
    pub thumbnail_url: ImageRef,
    /// Last save time.
    pub timestamp: Timestamp,
    pub revision_stack: Vec<Version>,
    /// Most recent first.
    #[serde(default)]
    pub snapshots: Vec<Version>,
}

impl Project {
    pub fn validate(&self, max_snapshots: usize) -> ForgeResult<()> {
        if self.revision_stack.is_empty() {
            return Err(ForgeError::validation(format!(
                "project {} has an empty revision stack",
                self.id
            )));
        }
        if self.snapshots.len() > max_snapshots {
            return Err(ForgeError::validation(format!(
                "project {} holds {} snapshots (max {max_snapshots})",
                self.id,
                self.snapshots.len()
            )));
        }
        for v in self.revision_stack.iter().chain(&self.snapshots) {
            v.validate()?;
        }
        Ok(())
    }

    /// Pin a copy of `version` as the newest snapshot, dropping the oldest beyond `max`.
    pub fn push_snapshot(&mut self, version: &Version, max: usize) {
        let mut snap = version.clone();
        snap.timestamp = now();
        self.snapshots.insert(0, snap);
        self.snapshots.truncate(max);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
