use crate::foundation::error::{ForgeError, ForgeResult};

pub use kurbo::{Affine, Rect, Vec2};

/// Wall-clock timestamp attached to versions and projects.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current wall-clock time.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Reference 16:9 output size shared by export and edit submission.
    pub const REFERENCE: Canvas = Canvas {
        width: 1280,
        height: 720,
    };

    /// Create a validated 16:9 canvas.
    pub fn new(width: u32, height: u32) -> ForgeResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    pub fn validate(self) -> ForgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ForgeError::validation("canvas must be non-empty"));
        }
        if u64::from(self.width) * 9 != u64::from(self.height) * 16 {
            return Err(ForgeError::validation(format!(
                "canvas {}x{} is not 16:9",
                self.width, self.height
            )));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(ForgeError::validation("canvas dimensions exceed u16"));
        }
        Ok(())
    }

    pub fn width_f64(self) -> f64 {
        f64::from(self.width)
    }

    pub fn height_f64(self) -> f64 {
        f64::from(self.height)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::REFERENCE
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
