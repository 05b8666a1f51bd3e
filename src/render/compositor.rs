use std::sync::Arc;

use crate::assets::cache::DecodedImageCache;
use crate::assets::decode::{PreparedImage, decode_ref};
use crate::assets::image_ref::ImageRef;
use crate::foundation::config::EditorConfig;
use crate::foundation::core::{Affine, Canvas};
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::ids::LayerId;
use crate::render::composite::{BACKDROP, flatten_onto_backdrop};
use crate::render::frame::FrameRGBA;
use crate::scene::layout::Layout;
use crate::scene::model::{Layer, Version};

/// Result of flattening a base image and its layers.
#[derive(Clone, Debug)]
pub struct ComposedImage {
    /// Opaque pixels at the compositor's canvas size.
    pub frame: FrameRGBA,
    /// Layers that could not be decoded and were left out.
    pub skipped: Vec<LayerId>,
}

impl ComposedImage {
    pub fn encode_png(&self) -> ForgeResult<Vec<u8>> {
        self.frame.encode_png()
    }

    pub fn to_image_ref(&self) -> ForgeResult<ImageRef> {
        self.frame.to_image_ref()
    }
}

/// Flattens a base image plus ordered layers into one opaque 16:9 raster.
///
/// The backdrop is opaque black. The base image must decode; a layer that fails to decode is
/// skipped and reported in [`ComposedImage::skipped`]. Output is reproducible for identical
/// inputs.
#[derive(Debug)]
pub struct Compositor {
    canvas: Canvas,
    cache: Option<DecodedImageCache>,
}

impl Compositor {
    /// Compositor without a decoded-image cache.
    pub fn new(canvas: Canvas) -> ForgeResult<Self> {
        canvas.validate()?;
        Ok(Self {
            canvas,
            cache: None,
        })
    }

    pub fn from_config(cfg: &EditorConfig) -> ForgeResult<Self> {
        cfg.validate()?;
        Ok(Self {
            canvas: cfg.canvas,
            cache: cfg
                .cache_decoded
                .then(|| DecodedImageCache::new(cfg.cache_capacity)),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Flatten a version's base and layers.
    pub fn compose_version(&mut self, version: &Version) -> ForgeResult<ComposedImage> {
        self.compose_frame(&version.url, &version.base_layout, &version.layers)
    }

    /// Flatten and encode as a PNG `data:` URI.
    pub fn compose(
        &mut self,
        base: &ImageRef,
        base_layout: &Layout,
        layers: &[Layer],
    ) -> ForgeResult<ImageRef> {
        self.compose_frame(base, base_layout, layers)?
            .to_image_ref()
    }

    #[tracing::instrument(skip_all, fields(layers = layers.len(), width = self.canvas.width, height = self.canvas.height))]
    pub fn compose_frame(
        &mut self,
        base: &ImageRef,
        base_layout: &Layout,
        layers: &[Layer],
    ) -> ForgeResult<ComposedImage> {
        let base_img = self.decode(base).map_err(|e| {
            tracing::warn!(error = %e, "base image failed to decode");
            ForgeError::decode(format!("base image: {e}"))
        })?;

        let (w, h) = self.canvas_u16()?;
        let mut ctx = vello_cpu::RenderContext::new(w, h);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            BACKDROP[0],
            BACKDROP[1],
            BACKDROP[2],
            BACKDROP[3],
        ));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            self.canvas.width_f64(),
            self.canvas.height_f64(),
        ));

        draw_image(&mut ctx, &base_img, base_layout, self.canvas)?;

        let mut skipped = Vec::new();
        for layer in layers {
            match self.decode(&layer.url) {
                Ok(img) => draw_image(&mut ctx, &img, &layer.layout, self.canvas)?,
                Err(e) => {
                    tracing::warn!(layer = %layer.id, name = %layer.name, error = %e, "skipping layer that failed to decode");
                    skipped.push(layer.id);
                }
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);

        let mut data = pixmap.data_as_u8_slice().to_vec();
        flatten_onto_backdrop(&mut data);

        Ok(ComposedImage {
            frame: FrameRGBA {
                width: self.canvas.width,
                height: self.canvas.height,
                data,
                premultiplied: true,
            },
            skipped,
        })
    }

    /// Number of decodes performed through the cache, if caching is enabled.
    pub fn cached_decode_count(&self) -> Option<u64> {
        self.cache.as_ref().map(DecodedImageCache::decode_count)
    }

    fn decode(&mut self, image: &ImageRef) -> ForgeResult<PreparedImage> {
        match self.cache.as_mut() {
            Some(cache) => cache.get_or_decode(image),
            None => decode_ref(image),
        }
    }

    fn canvas_u16(&self) -> ForgeResult<(u16, u16)> {
        let w: u16 = self
            .canvas
            .width
            .try_into()
            .map_err(|_| ForgeError::render("canvas width exceeds u16"))?;
        let h: u16 = self
            .canvas
            .height
            .try_into()
            .map_err(|_| ForgeError::render("canvas height exceeds u16"))?;
        Ok((w, h))
    }
}

fn draw_image(
    ctx: &mut vello_cpu::RenderContext,
    img: &PreparedImage,
    layout: &Layout,
    canvas: Canvas,
) -> ForgeResult<()> {
    let placement = layout.place(img.width, img.height, canvas);
    if placement.width <= 0.0 || placement.height <= 0.0 {
        return Ok(());
    }

    let paint = vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(image_premul_bytes_to_pixmap(
            img.rgba8_premul.as_slice(),
            img.width,
            img.height,
        )?)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    };

    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(placement.transform()));
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(img.width),
        f64::from(img.height),
    ));
    Ok(())
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> ForgeResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ForgeError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ForgeError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(ForgeError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
