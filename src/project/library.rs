use crate::foundation::config::EditorConfig;
use crate::foundation::core::now;
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::ids::ProjectId;
use crate::project::store::ProjectStore;
use crate::scene::model::{Project, Version};

/// The in-session project list plus the active project pointer.
///
/// The list is the unit of persistence: [`ProjectLibrary::persist`] writes all of it.
#[derive(Clone, Debug)]
pub struct ProjectLibrary {
    projects: Vec<Project>,
    active: Option<ProjectId>,
    max_snapshots: usize,
    name_prefix: String,
}

impl ProjectLibrary {
    pub fn new(cfg: &EditorConfig) -> Self {
        Self {
            projects: Vec::new(),
            active: None,
            max_snapshots: cfg.max_snapshots,
            name_prefix: cfg.project_name_prefix.clone(),
        }
    }

    /// Adopt a loaded project list. Projects with an empty revision stack are dropped and
    /// snapshot lists longer than the cap are truncated.
    pub fn from_projects(projects: Vec<Project>, cfg: &EditorConfig) -> Self {
        let mut lib = Self::new(cfg);
        for mut p in projects {
            if p.revision_stack.is_empty() {
                tracing::warn!(project = %p.id, "dropping stored project without versions");
                continue;
            }
            p.snapshots.truncate(lib.max_snapshots);
            lib.projects.push(p);
        }
        lib
    }

    /// Load the full project list from `store`.
    #[tracing::instrument(skip_all)]
    pub async fn load(store: &dyn ProjectStore, cfg: &EditorConfig) -> ForgeResult<Self> {
        let projects = store.get_all().await.map_err(|e| {
            tracing::warn!(error = %format!("{e:#}"), "loading projects failed");
            ForgeError::storage("could not load saved projects")
        })?;
        tracing::debug!(count = projects.len(), "projects loaded");
        Ok(Self::from_projects(projects, cfg))
    }

    /// Write the full project list to `store`.
    #[tracing::instrument(skip_all, fields(count = self.projects.len()))]
    pub async fn persist(&self, store: &dyn ProjectStore) -> ForgeResult<()> {
        store
            .clear_and_replace_all(&self.projects)
            .await
            .map_err(|e| {
                tracing::warn!(error = %format!("{e:#}"), "saving projects failed");
                ForgeError::storage("could not save projects")
            })
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn active_id(&self) -> Option<ProjectId> {
        self.active
    }

    pub fn active(&self) -> Option<&Project> {
        self.active.and_then(|id| self.get(id))
    }

    /// Point at `id`; unknown ids clear the active project.
    pub fn set_active(&mut self, id: Option<ProjectId>) {
        self.active = id.filter(|id| self.get(*id).is_some());
    }

    pub fn max_snapshots(&self) -> usize {
        self.max_snapshots
    }

    /// Pin a copy of `current` on the active project.
    ///
    /// Returns `false` without changes when there is no current version or no active project.
    pub fn create_snapshot(&mut self, current: Option<&Version>) -> bool {
        let max = self.max_snapshots();
        let (Some(version), Some(project)) = (current, self.active_mut()) else {
            return false;
        };
        project.push_snapshot(version, max);
        true
    }

    /// Save `history` into the active project, or create a new one at the front of the list.
    ///
    /// Histories are replaced, never merged.
    pub fn upsert(&mut self, current: &Version, history: &[Version]) -> ProjectId {
        let stamp = now();
        if let Some(project) = self.active_mut() {
            project.thumbnail_url = current.url.clone();
            project.revision_stack = history.to_vec();
            project.timestamp = stamp;
            return project.id;
        }

        let project = Project {
            id: ProjectId::new(),
            name: self.next_default_name(),
            thumbnail_url: current.url.clone(),
            timestamp: stamp,
            revision_stack: history.to_vec(),
            snapshots: Vec::new(),
        };
        let id = project.id;
        self.projects.insert(0, project);
        self.active = Some(id);
        id
    }

    /// `"<prefix> N"` with N one past the highest number already in use.
    fn next_default_name(&self) -> String {
        let highest = self
            .projects
            .iter()
            .filter_map(|p| {
                p.name
                    .strip_prefix(self.name_prefix.as_str())?
                    .strip_prefix(' ')?
                    .parse::<u64>()
                    .ok()
            })
            .max()
            .unwrap_or(0);
        format!("{} {}", self.name_prefix, highest + 1)
    }

    /// Remove a project. Returns `None` if it did not exist, otherwise whether it was active.
    pub fn delete(&mut self, id: ProjectId) -> Option<bool> {
        let pos = self.projects.iter().position(|p| p.id == id)?;
        self.projects.remove(pos);
        let was_active = self.active == Some(id);
        if was_active {
            self.active = None;
        }
        Some(was_active)
    }

    /// Rename a project; blank names are ignored.
    pub fn rename(&mut self, id: ProjectId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.projects.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.name = name.to_string();
                true
            }
            None => false,
        }
    }

    fn active_mut(&mut self) -> Option<&mut Project> {
        let id = self.active?;
        self.projects.iter_mut().find(|p| p.id == id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/library.rs"]
mod tests;
