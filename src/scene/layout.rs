use serde::{Deserialize, Serialize};

use crate::foundation::core::{Affine, Canvas, Rect};

/// One of the five numeric knobs of a [`Layout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutField {
    Scale,
    StretchX,
    StretchY,
    TranslateX,
    TranslateY,
}

impl LayoutField {
    pub const ALL: [LayoutField; 5] = [
        Self::Scale,
        Self::StretchX,
        Self::StretchY,
        Self::TranslateX,
        Self::TranslateY,
    ];

    /// Value used when the field is missing or invalid.
    pub fn default_value(self) -> f64 {
        match self {
            Self::Scale | Self::StretchX | Self::StretchY => 1.0,
            Self::TranslateX | Self::TranslateY => 0.0,
        }
    }

    /// Inclusive range exposed to interactive controls.
    pub fn ui_range(self) -> (f64, f64) {
        match self {
            Self::Scale => (0.1, 3.0),
            Self::StretchX | Self::StretchY => (0.1, 2.0),
            Self::TranslateX | Self::TranslateY => (-100.0, 100.0),
        }
    }

    /// Normalize a raw value into the field's domain.
    ///
    /// Multipliers must be finite and > 0; offsets must be finite and are clamped to
    /// `[-100, 100]`. Anything else falls back to [`LayoutField::default_value`].
    pub fn normalize(self, value: Option<f64>) -> f64 {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return self.default_value();
        };
        match self {
            Self::Scale | Self::StretchX | Self::StretchY => {
                if v > 0.0 {
                    v
                } else {
                    self.default_value()
                }
            }
            Self::TranslateX | Self::TranslateY => v.clamp(-100.0, 100.0),
        }
    }

    /// Normalize, then clamp into [`LayoutField::ui_range`].
    pub fn clamp_ui(self, value: f64) -> f64 {
        let (lo, hi) = self.ui_range();
        self.normalize(Some(value)).clamp(lo, hi)
    }
}

/// Five-parameter placement of an image inside the output canvas.
///
/// Fields are only reachable through normalizing constructors and setters, so every `Layout`
/// value holds defined, in-domain numbers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "LayoutDef")]
pub struct Layout {
    scale: f64,
    stretch_x: f64,
    stretch_y: f64,
    translate_x: f64,
    translate_y: f64,
}

/// Wire form of a [`Layout`]; every field may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutDef {
    pub scale: Option<f64>,
    pub stretch_x: Option<f64>,
    pub stretch_y: Option<f64>,
    pub translate_x: Option<f64>,
    pub translate_y: Option<f64>,
}

impl From<LayoutDef> for Layout {
    fn from(def: LayoutDef) -> Self {
        Self {
            scale: LayoutField::Scale.normalize(def.scale),
            stretch_x: LayoutField::StretchX.normalize(def.stretch_x),
            stretch_y: LayoutField::StretchY.normalize(def.stretch_y),
            translate_x: LayoutField::TranslateX.normalize(def.translate_x),
            translate_y: LayoutField::TranslateY.normalize(def.translate_y),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::from(LayoutDef::default())
    }
}

impl Layout {
    pub fn new(scale: f64, stretch_x: f64, stretch_y: f64, translate_x: f64, translate_y: f64) -> Self {
        Self::from(LayoutDef {
            scale: Some(scale),
            stretch_x: Some(stretch_x),
            stretch_y: Some(stretch_y),
            translate_x: Some(translate_x),
            translate_y: Some(translate_y),
        })
    }

    pub fn get(&self, field: LayoutField) -> f64 {
        match field {
            LayoutField::Scale => self.scale,
            LayoutField::StretchX => self.stretch_x,
            LayoutField::StretchY => self.stretch_y,
            LayoutField::TranslateX => self.translate_x,
            LayoutField::TranslateY => self.translate_y,
        }
    }

    /// Replace one field, normalizing the value.
    pub fn set(&mut self, field: LayoutField, value: f64) {
        let v = field.normalize(Some(value));
        match field {
            LayoutField::Scale => self.scale = v,
            LayoutField::StretchX => self.stretch_x = v,
            LayoutField::StretchY => self.stretch_y = v,
            LayoutField::TranslateX => self.translate_x = v,
            LayoutField::TranslateY => self.translate_y = v,
        }
    }

    pub fn with(mut self, field: LayoutField, value: f64) -> Self {
        self.set(field, value);
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn stretch_x(&self) -> f64 {
        self.stretch_x
    }

    pub fn stretch_y(&self) -> f64 {
        self.stretch_y
    }

    pub fn translate_x(&self) -> f64 {
        self.translate_x
    }

    pub fn translate_y(&self) -> f64 {
        self.translate_y
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Upper bound of the per-axis factor `scale * stretch` used for placement.
    pub const MAX_AXIS_SCALE: f64 = 10_000.0;

    /// Place an image of `natural_width` x `natural_height` pixels on `canvas`.
    ///
    /// The image is scaled by `scale * stretch` per axis (at most [`Self::MAX_AXIS_SCALE`]),
    /// centered, then offset by the translate percentages of the canvas size.
    pub fn place(&self, natural_width: u32, natural_height: u32, canvas: Canvas) -> Placement {
        let sx = (self.scale * self.stretch_x).min(Self::MAX_AXIS_SCALE);
        let sy = (self.scale * self.stretch_y).min(Self::MAX_AXIS_SCALE);
        let width = f64::from(natural_width) * sx;
        let height = f64::from(natural_height) * sy;

        let cw = canvas.width_f64();
        let ch = canvas.height_f64();
        let x = (cw - width) / 2.0 + self.translate_x / 100.0 * cw;
        let y = (ch - height) / 2.0 + self.translate_y / 100.0 * ch;

        Placement {
            x,
            y,
            width,
            height,
            scale_x: sx,
            scale_y: sy,
        }
    }
}

/// Where an image lands on the canvas, in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
    /// Horizontal scale applied to natural pixels.
    pub scale_x: f64,
    /// Vertical scale applied to natural pixels.
    pub scale_y: f64,
}

impl Placement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Affine mapping natural image pixels onto canvas pixels.
    pub fn transform(&self) -> Affine {
        Affine::translate((self.x, self.y)) * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/layout.rs"]
mod tests;
