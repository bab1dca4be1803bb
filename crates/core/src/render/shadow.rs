//! Canvas-style drop shadow: the path's coverage, blurred and tinted, laid
//! under the shape with the shape's own blend mode.

use tiny_skia::{
    BlendMode, FillRule, FilterQuality, Mask, Path, Pixmap, PixmapPaint, PremultipliedColorU8,
    Transform,
};

use crate::palette::Color;

/// Parameters of one shadow pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowStyle {
    pub color: Color,
    /// Canvas `shadowBlur`; the Gaussian deviation is half of it.
    pub blur: f32,
    pub alpha: f32,
    pub blend_mode: BlendMode,
}

/// Draws the shadow of `path` onto `target`. Invisible shadows are skipped.
pub fn draw_shadow(target: &mut Pixmap, path: &Path, transform: Transform, style: ShadowStyle) {
    let opacity = style.color.a * style.alpha;
    if opacity <= 0.0 {
        return;
    }

    let Some(mut mask) = Mask::new(target.width(), target.height()) else {
        return;
    };
    mask.fill_path(path, FillRule::Winding, true, transform);
    if style.blur > 0.0 {
        blur_mask(&mut mask, style.blur / 2.0);
    }

    let Some(layer) = tint(&mask, style.color, opacity) else {
        return;
    };
    target.draw_pixmap(
        0,
        0,
        layer.as_ref(),
        &PixmapPaint {
            opacity: 1.0,
            blend_mode: style.blend_mode,
            quality: FilterQuality::Nearest,
        },
        Transform::identity(),
        None,
    );
}

fn tint(mask: &Mask, color: Color, opacity: f32) -> Option<Pixmap> {
    let mut layer = Pixmap::new(mask.width(), mask.height())?;
    for (pixel, coverage) in layer.pixels_mut().iter_mut().zip(mask.data()) {
        let alpha = f32::from(*coverage) / 255.0 * opacity;
        let premultiply = |channel: u8| (f32::from(channel) * alpha).round() as u8;
        *pixel = PremultipliedColorU8::from_rgba(
            premultiply(color.r),
            premultiply(color.g),
            premultiply(color.b),
            (alpha * 255.0).round() as u8,
        )
        .unwrap_or(PremultipliedColorU8::TRANSPARENT);
    }
    Some(layer)
}

/// Approximates a Gaussian blur with three successive box blurs.
pub fn blur_mask(mask: &mut Mask, sigma: f32) {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let mut front: Vec<f32> = mask.data().iter().map(|v| f32::from(*v)).collect();
    let mut back = vec![0.0; front.len()];

    for size in box_sizes(sigma) {
        let radius = (size - 1) / 2;
        box_blur(&front, &mut back, height, width, 1, width, radius);
        box_blur(&back, &mut front, width, height, width, 1, radius);
    }

    for (out, value) in mask.data_mut().iter_mut().zip(&front) {
        *out = value.round().clamp(0.0, 255.0) as u8;
    }
}

/// Widths of three box filters whose composition has deviation `sigma`.
fn box_sizes(sigma: f32) -> [usize; 3] {
    const PASSES: f32 = 3.0;
    let variance = 12.0 * sigma * sigma;
    let ideal = (variance / PASSES + 1.0).sqrt();
    let mut lower = ideal.floor().max(1.0);
    if lower % 2.0 == 0.0 {
        lower -= 1.0;
    }
    let upper = lower + 2.0;
    let lower_count = ((variance
        - PASSES * lower * lower
        - 4.0 * PASSES * lower
        - 3.0 * PASSES)
        / (-4.0 * lower - 4.0))
        .round();

    let mut sizes = [0usize; 3];
    for (i, size) in sizes.iter_mut().enumerate() {
        *size = (if (i as f32) < lower_count { lower } else { upper }) as usize;
    }
    sizes
}

/// Running-sum box blur along one axis. Samples outside the buffer count as
/// transparent.
fn box_blur(
    src: &[f32],
    dst: &mut [f32],
    lines: usize,
    len: usize,
    step: usize,
    line_step: usize,
    radius: usize,
) {
    let scale = 1.0 / (2 * radius + 1) as f32;
    for line in 0..lines {
        let at = |i: usize| line * line_step + i * step;
        let mut sum: f32 = (0..=radius.min(len - 1)).map(|i| src[at(i)]).sum();
        for i in 0..len {
            dst[at(i)] = sum * scale;
            if i + radius + 1 < len {
                sum += src[at(i + radius + 1)];
            }
            if i >= radius {
                sum -= src[at(i - radius)];
            }
        }
    }
}
