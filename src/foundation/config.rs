use crate::foundation::core::Canvas;
use crate::foundation::error::{ForgeError, ForgeResult};

/// Default cap on milestone snapshots kept per project.
pub const MAX_SNAPSHOTS: usize = 10;

/// Editor-wide options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorConfig {
    /// Output canvas used for both export and edit submission.
    pub canvas: Canvas,
    /// Snapshots retained per project, most recent first.
    pub max_snapshots: usize,
    /// Keep decoded images between compose calls.
    pub cache_decoded: bool,
    /// Decoded images kept before the cache is cleared.
    pub cache_capacity: usize,
    /// Prefix for sequential default project names ("Project 1", "Project 2", ...).
    pub project_name_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::REFERENCE,
            max_snapshots: MAX_SNAPSHOTS,
            cache_decoded: true,
            cache_capacity: 32,
            project_name_prefix: "Project".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> ForgeResult<()> {
        self.canvas.validate()?;
        if self.max_snapshots == 0 {
            return Err(ForgeError::validation("max_snapshots must be > 0"));
        }
        if self.cache_decoded && self.cache_capacity == 0 {
            return Err(ForgeError::validation(
                "cache_capacity must be > 0 when caching is enabled",
            ));
        }
        Ok(())
    }
}
