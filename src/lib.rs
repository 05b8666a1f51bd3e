//! Thumbforge is the composition and versioning core of an AI-assisted thumbnail editor.
//!
//! - Place a base image and image layers with independent [`Layout`]s
//! - Flatten them into one opaque 16:9 raster with the [`Compositor`]
//! - Keep a branch-on-write [`VersionHistory`] and pinned snapshots per [`Project`]
//! - Drive remote restyling through an [`EditorSession`] and an [`ImageService`]
#![forbid(unsafe_code)]

mod assets;
mod foundation;
mod history;
mod project;
mod render;
mod scene;
mod service;
mod session;

pub use crate::assets::decode::{PreparedImage, decode_ref};
pub use crate::assets::image_ref::{DataUri, ImageRef};
pub use crate::foundation::config::{EditorConfig, MAX_SNAPSHOTS};
pub use crate::foundation::core::{Affine, Canvas, Rect, Timestamp, Vec2};
pub use crate::foundation::error::{ForgeError, ForgeResult, RemoteOp};
pub use crate::foundation::ids::{LayerId, ProjectId, VersionId};
pub use crate::history::VersionHistory;
pub use crate::project::library::ProjectLibrary;
pub use crate::project::store::{FsProjectStore, InMemoryProjectStore, ProjectStore};
pub use crate::render::compositor::{ComposedImage, Compositor};
pub use crate::render::frame::FrameRGBA;
pub use crate::scene::layout::{Layout, LayoutDef, LayoutField, Placement};
pub use crate::scene::model::{Layer, LayoutTarget, Project, Version};
pub use crate::service::prompt::StylePreset;
pub use crate::service::{
    AspectRatio, ChatRequest, EditRequest, GenerateRequest, ImageService,
};
pub use crate::session::busy::{BusyFlag, BusyGuard};
pub use crate::session::editor::{EditorSession, Export};
pub use crate::session::orchestrator::EditMode;
