use std::sync::Arc;

use crate::assets::decode::decode_ref;
use crate::assets::image_ref::ImageRef;
use crate::foundation::config::EditorConfig;
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::ids::{LayerId, ProjectId};
use crate::history::VersionHistory;
use crate::project::library::ProjectLibrary;
use crate::project::store::ProjectStore;
use crate::render::compositor::{ComposedImage, Compositor};
use crate::scene::layout::LayoutField;
use crate::scene::model::{Layer, LayoutTarget, Version};
use crate::session::busy::BusyFlag;

/// A flattened thumbnail ready to be written out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub png: Vec<u8>,
    /// Suggested download name.
    pub file_name: String,
}

/// One interactive editing session.
///
/// Owns the working history, the project list and the compositor. Not meant to be shared
/// between threads; the busy flag is the only state observable from outside.
pub struct EditorSession {
    pub(crate) cfg: EditorConfig,
    pub(crate) history: VersionHistory,
    pub(crate) library: ProjectLibrary,
    pub(crate) compositor: Compositor,
    pub(crate) store: Arc<dyn ProjectStore>,
    pub(crate) busy: BusyFlag,
    selection: LayoutTarget,
}

impl EditorSession {
    /// Empty session with no versions and no projects loaded.
    pub fn new(cfg: EditorConfig, store: Arc<dyn ProjectStore>) -> ForgeResult<Self> {
        let compositor = Compositor::from_config(&cfg)?;
        let library = ProjectLibrary::new(&cfg);
        Ok(Self {
            cfg,
            history: VersionHistory::new(),
            library,
            compositor,
            store,
            busy: BusyFlag::new(),
            selection: LayoutTarget::Base,
        })
    }

    /// Session with the stored project list loaded.
    pub async fn open(cfg: EditorConfig, store: Arc<dyn ProjectStore>) -> ForgeResult<Self> {
        let mut session = Self::new(cfg, store)?;
        session.reload_projects().await?;
        Ok(session)
    }

    /// Replace the in-memory project list with the stored one.
    pub async fn reload_projects(&mut self) -> ForgeResult<usize> {
        self.ensure_idle()?;
        let library = ProjectLibrary::load(self.store.as_ref(), &self.cfg).await?;
        let active = self.library.active_id();
        self.library = library;
        self.library.set_active(active);
        Ok(self.library.projects().len())
    }

    pub fn config(&self) -> &EditorConfig {
        &self.cfg
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub fn library(&self) -> &ProjectLibrary {
        &self.library
    }

    pub fn current(&self) -> Option<&Version> {
        self.history.current()
    }

    /// Handle for observing the in-flight flag.
    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Layout currently targeted by interactive controls.
    pub fn selection(&self) -> LayoutTarget {
        self.selection
    }

    pub(crate) fn ensure_idle(&self) -> ForgeResult<()> {
        if self.busy.is_busy() {
            return Err(ForgeError::Busy);
        }
        Ok(())
    }

    /// Append a content edit and keep the selection pointing at something that exists.
    pub(crate) fn push_version(&mut self, version: Version) -> ForgeResult<usize> {
        let idx = self.history.append(version)?;
        self.fix_selection();
        tracing::debug!(index = idx, len = self.history.len(), "version appended");
        Ok(idx)
    }

    /// Start from a new base image (import or capture).
    pub fn import_base(&mut self, bytes: &[u8]) -> ForgeResult<usize> {
        let url = ImageRef::from_bytes(bytes)?;
        self.import_base_ref(url)
    }

    pub fn import_base_ref(&mut self, url: ImageRef) -> ForgeResult<usize> {
        self.ensure_idle()?;
        decode_ref(&url)?;
        self.push_version(Version::from_base(url))
    }

    /// Add an image layer on top of the current version.
    ///
    /// Returns `Ok(None)` when there is no current version.
    pub fn add_layer(&mut self, bytes: &[u8], name: &str) -> ForgeResult<Option<LayerId>> {
        let url = ImageRef::from_bytes(bytes)?;
        self.add_layer_ref(url, name)
    }

    pub fn add_layer_ref(&mut self, url: ImageRef, name: &str) -> ForgeResult<Option<LayerId>> {
        self.ensure_idle()?;
        let Some(current) = self.history.current() else {
            return Ok(None);
        };
        decode_ref(&url)?;

        let name = match name.trim() {
            "" => format!("Layer {}", current.layers.len() + 1),
            n => n.to_string(),
        };
        let layer = Layer::new(url, name);
        let id = layer.id;
        let mut layers = current.layers.clone();
        layers.push(layer);
        let next = current.derive_with_layers(layers);
        self.push_version(next)?;
        self.selection = LayoutTarget::Layer(id);
        Ok(Some(id))
    }

    /// Remove a layer from the current version as a new version.
    ///
    /// Returns `Ok(None)` when the layer does not exist.
    pub fn remove_layer(&mut self, layer: LayerId) -> ForgeResult<Option<usize>> {
        self.ensure_idle()?;
        let idx = self.history.remove_layer(layer)?;
        if idx.is_some() {
            self.fix_selection();
        }
        Ok(idx)
    }

    /// Point interactive controls at a layout of the current version.
    pub fn select_target(&mut self, target: LayoutTarget) -> bool {
        let exists = self
            .history
            .current()
            .is_some_and(|v| v.layout(target).is_some());
        if exists {
            self.selection = target;
        }
        exists
    }

    /// Tweak one layout field of the current version in place, clamped to the control range.
    pub fn update_layout(&mut self, target: LayoutTarget, field: LayoutField, value: f64) -> bool {
        if self.busy.is_busy() {
            return false;
        }
        self.history
            .update_current_layout(target, field, field.clamp_ui(value))
    }

    /// Tweak the currently selected layout.
    pub fn update_selected_layout(&mut self, field: LayoutField, value: f64) -> bool {
        self.update_layout(self.selection, field, value)
    }

    pub fn reset_layout(&mut self, target: LayoutTarget) -> bool {
        if self.busy.is_busy() {
            return false;
        }
        self.history.reset_current_layout(target)
    }

    /// Browse to another version; out-of-range indices are ignored.
    pub fn select_version(&mut self, index: usize) -> bool {
        if self.busy.is_busy() {
            return false;
        }
        let moved = self.history.select(index);
        if moved {
            self.fix_selection();
        }
        moved
    }

    /// Pin the current version on the active project and save.
    ///
    /// Returns `Ok(false)` when there is no current version or no active project.
    pub async fn create_snapshot(&mut self) -> ForgeResult<bool> {
        self.ensure_idle()?;
        if !self.library.create_snapshot(self.history.current()) {
            return Ok(false);
        }
        self.library.persist(self.store.as_ref()).await?;
        Ok(true)
    }

    /// Append a copy of one of the active project's snapshots as a new version.
    pub fn restore_snapshot(&mut self, index: usize) -> ForgeResult<Option<usize>> {
        self.ensure_idle()?;
        let Some(snap) = self
            .library
            .active()
            .and_then(|p| p.snapshots.get(index))
            .map(Version::duplicate)
        else {
            return Ok(None);
        };
        self.push_version(snap).map(Some)
    }

    /// Save the working history into the active project (or a new one) and persist the list.
    ///
    /// A storage failure leaves the in-memory project list updated so the save can be retried.
    /// Returns `Ok(None)` when there is nothing to save.
    pub async fn save_project(&mut self) -> ForgeResult<Option<ProjectId>> {
        self.ensure_idle()?;
        let Some(current) = self.history.current() else {
            return Ok(None);
        };
        let id = self.library.upsert(current, self.history.versions());
        tracing::info!(project = %id, versions = self.history.len(), "saving project");
        self.library.persist(self.store.as_ref()).await?;
        Ok(Some(id))
    }

    /// Make a stored project the working history, positioned at its last version.
    pub fn load_project(&mut self, id: ProjectId) -> ForgeResult<bool> {
        self.ensure_idle()?;
        let Some(project) = self.library.get(id) else {
            return Ok(false);
        };
        self.history = VersionHistory::from_versions(project.revision_stack.clone());
        self.library.set_active(Some(id));
        self.selection = LayoutTarget::Base;
        tracing::info!(project = %id, versions = self.history.len(), "project loaded");
        Ok(true)
    }

    /// Delete a stored project; deleting the active one resets the session.
    pub async fn delete_project(&mut self, id: ProjectId) -> ForgeResult<bool> {
        self.ensure_idle()?;
        let Some(was_active) = self.library.delete(id) else {
            return Ok(false);
        };
        if was_active {
            self.reset_working_state();
        }
        self.library.persist(self.store.as_ref()).await?;
        Ok(true)
    }

    pub async fn rename_project(&mut self, id: ProjectId, name: &str) -> ForgeResult<bool> {
        self.ensure_idle()?;
        if !self.library.rename(id, name) {
            return Ok(false);
        }
        self.library.persist(self.store.as_ref()).await?;
        Ok(true)
    }

    /// Drop the working history and detach from the active project. Unsaved versions are lost.
    pub fn new_project(&mut self) -> ForgeResult<()> {
        self.ensure_idle()?;
        self.reset_working_state();
        Ok(())
    }

    /// Flatten the current version.
    pub fn compose_current(&mut self) -> ForgeResult<Option<ComposedImage>> {
        let Some(current) = self.history.current() else {
            return Ok(None);
        };
        self.compositor.compose_version(current).map(Some)
    }

    /// Flatten the current version into a PNG for download.
    pub fn export(&mut self) -> ForgeResult<Option<Export>> {
        let _guard = self.busy.try_acquire().ok_or(ForgeError::Busy)?;
        let Some(composed) = self.compose_current()? else {
            return Ok(None);
        };
        Ok(Some(Export {
            png: composed.encode_png()?,
            file_name: format!("thumbnail-{}.png", chrono::Utc::now().timestamp_millis()),
        }))
    }

    fn reset_working_state(&mut self) {
        self.history.clear();
        self.library.set_active(None);
        self.selection = LayoutTarget::Base;
    }

    fn fix_selection(&mut self) {
        let valid = self
            .history
            .current()
            .is_some_and(|v| v.layout(self.selection).is_some());
        if !valid {
            self.selection = LayoutTarget::Base;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/editor.rs"]
mod tests;
