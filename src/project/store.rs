use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::foundation::ids::ProjectId;
use crate::scene::model::Project;

/// Key-value persistence for the project list.
///
/// A save replaces the whole list; a load returns the whole list in saved order.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Replace all stored projects with `projects`.
    async fn clear_and_replace_all(&self, projects: &[Project]) -> anyhow::Result<()>;
    /// Every stored project, in saved order.
    async fn get_all(&self) -> anyhow::Result<Vec<Project>>;
}

/// In-memory store keeping one serialized JSON blob per project id.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    blobs: Mutex<Vec<(ProjectId, Vec<u8>)>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored projects.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn clear_and_replace_all(&self, projects: &[Project]) -> anyhow::Result<()> {
        let mut next = Vec::with_capacity(projects.len());
        for p in projects {
            let blob = serde_json::to_vec(p).with_context(|| format!("serialize project {}", p.id))?;
            next.push((p.id, blob));
        }
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow::anyhow!("project store lock poisoned"))?;
        *blobs = next;
        Ok(())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<Project>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow::anyhow!("project store lock poisoned"))?;
        blobs
            .iter()
            .map(|(id, blob)| {
                serde_json::from_slice(blob).with_context(|| format!("parse project {id}"))
            })
            .collect()
    }
}

/// Directory-backed store: `projects/<id>.json` plus an ordered `projects/index.json`.
///
/// A save writes a complete staging directory first and then swaps it in, so readers see either
/// the old list or the new one.
#[derive(Clone, Debug)]
pub struct FsProjectStore {
    root: PathBuf,
}

const LIVE_DIR: &str = "projects";
const INDEX_FILE: &str = "index.json";
const RETIRED_TAG: &str = "old";

impl FsProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn live_dir(&self) -> PathBuf {
        self.root.join(LIVE_DIR)
    }

    /// Retired copies of the live directory, newest first.
    async fn retired_dirs(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("list '{}'", self.root.display()));
            }
        };
        let prefix = format!("{LIVE_DIR}.{RETIRED_TAG}-");
        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("list '{}'", self.root.display()))?
        {
            if !entry.file_name().to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let modified = entry.metadata().await.and_then(|m| m.modified()).ok();
            found.push((modified, entry.path()));
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }
}

#[async_trait]
impl ProjectStore for FsProjectStore {
    async fn clear_and_replace_all(&self, projects: &[Project]) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create store root '{}'", self.root.display()))?;

        let tag = uuid::Uuid::new_v4();
        let staging = self.root.join(format!("{LIVE_DIR}.staging-{tag}"));
        tokio::fs::create_dir(&staging)
            .await
            .with_context(|| format!("create staging dir '{}'", staging.display()))?;

        let written = write_projects(&staging, projects).await;
        if let Err(e) = written {
            tokio::fs::remove_dir_all(&staging).await.ok();
            return Err(e);
        }

        let live = self.live_dir();
        let retired = self.root.join(format!("{LIVE_DIR}.{RETIRED_TAG}-{tag}"));
        let had_live = tokio::fs::try_exists(&live).await.unwrap_or(false);
        if had_live {
            tokio::fs::rename(&live, &retired)
                .await
                .with_context(|| format!("retire '{}'", live.display()))?;
        }
        if let Err(e) = tokio::fs::rename(&staging, &live).await {
            if had_live {
                tokio::fs::rename(&retired, &live).await.ok();
            }
            tokio::fs::remove_dir_all(&staging).await.ok();
            return Err(e).with_context(|| format!("swap in '{}'", live.display()));
        }
        // Includes copies left behind by earlier interrupted saves.
        let retired_dirs = self.retired_dirs().await.unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{e:#}"), "failed to list retired project dirs");
            Vec::new()
        });
        for dir in retired_dirs {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to remove retired project dir");
            }
        }
        Ok(())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<Project>> {
        if let Some(projects) = read_projects(&self.live_dir()).await? {
            return Ok(projects);
        }
        // A save stopped between its two renames leaves only the retired copy.
        for dir in self.retired_dirs().await? {
            if let Some(projects) = read_projects(&dir).await? {
                tracing::warn!(dir = %dir.display(), "live project dir missing, loading retired copy");
                return Ok(projects);
            }
        }
        Ok(Vec::new())
    }
}

/// Projects listed in `dir`'s index, or `None` when the directory has no index.
async fn read_projects(dir: &Path) -> anyhow::Result<Option<Vec<Project>>> {
    let index_path = dir.join(INDEX_FILE);
    let index = match tokio::fs::read(&index_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("read '{}'", index_path.display()));
        }
    };
    let ids: Vec<ProjectId> = serde_json::from_slice(&index)
        .with_context(|| format!("parse '{}'", index_path.display()))?;

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let path = dir.join(format!("{id}.json"));
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read '{}'", path.display()))?;
        let project: Project = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse '{}'", path.display()))?;
        out.push(project);
    }
    Ok(Some(out))
}

async fn write_projects(dir: &Path, projects: &[Project]) -> anyhow::Result<()> {
    let mut ids = Vec::with_capacity(projects.len());
    for p in projects {
        let path = dir.join(format!("{}.json", p.id));
        let bytes = serde_json::to_vec(p).with_context(|| format!("serialize project {}", p.id))?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write '{}'", path.display()))?;
        ids.push(p.id);
    }
    let index = serde_json::to_vec(&ids).context("serialize project index")?;
    let path = dir.join(INDEX_FILE);
    tokio::fs::write(&path, index)
        .await
        .with_context(|| format!("write '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/project/store.rs"]
mod tests;
