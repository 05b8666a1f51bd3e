use std::sync::Arc;

use crate::assets::image_ref::{ImageRef, SVG_MIME};
use crate::foundation::error::{ForgeError, ForgeResult};

/// Largest natural dimension accepted for a decoded image.
const MAX_DIM: u32 = 16_384;

/// Decoded image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Resolve and decode an image reference.
pub fn decode_ref(image: &ImageRef) -> ForgeResult<PreparedImage> {
    let data = image.resolve()?;
    if data.mime == SVG_MIME {
        rasterize_svg(&data.payload)
    } else {
        decode_image(&data.payload)
    }
}

pub fn decode_image(bytes: &[u8]) -> ForgeResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ForgeError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    check_dims(width, height)?;

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse an SVG and rasterize it at its natural size.
pub fn rasterize_svg(bytes: &[u8]) -> ForgeResult<PreparedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| ForgeError::decode(format!("parse svg tree: {e}")))?;

    let size = tree.size();
    let to_px = |v: f32| -> ForgeResult<u32> {
        if !v.is_finite() || v <= 0.0 {
            return Err(ForgeError::decode("svg has invalid width/height"));
        }
        Ok((v.ceil() as u32).max(1))
    };
    let width = to_px(size.width())?;
    let height = to_px(size.height())?;
    check_dims(width, height)?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ForgeError::decode("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny-skia pixmaps are already premultiplied.
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

fn check_dims(width: u32, height: u32) -> ForgeResult<()> {
    if width == 0 || height == 0 {
        return Err(ForgeError::decode("image has zero size"));
    }
    if width > MAX_DIM || height > MAX_DIM {
        return Err(ForgeError::decode(format!(
            "image too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }
    Ok(())
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
