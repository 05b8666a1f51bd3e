use std::io::Cursor;

use crate::assets::image_ref::ImageRef;
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::render::composite::unpremultiply_in_place;

/// A flattened raster as RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// RGBA8 at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Encode as PNG (lossless, straight alpha).
    pub fn encode_png(&self) -> ForgeResult<Vec<u8>> {
        let mut data = self.data.clone();
        if self.premultiplied {
            unpremultiply_in_place(&mut data);
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| ForgeError::render("frame byte length does not match dimensions"))?;

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| ForgeError::render(format!("encode png: {e}")))?;
        Ok(buf)
    }

    /// Encode as PNG wrapped in a `data:` URI.
    pub fn to_image_ref(&self) -> ForgeResult<ImageRef> {
        Ok(ImageRef::from_png(&self.encode_png()?))
    }
}
