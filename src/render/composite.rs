pub type PremulRgba8 = [u8; 4];

/// Opaque black, the canonical empty backdrop.
pub const BACKDROP: PremulRgba8 = [0, 0, 0, 255];

/// Source-over for premultiplied RGBA8.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Composite every pixel of `rgba` over [`BACKDROP`], leaving no transparency behind.
pub fn flatten_onto_backdrop(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let out = over(BACKDROP, [px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

/// Convert premultiplied RGBA8 to straight alpha in place.
pub fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
