//! Consumer side of the pipeline: turns a [`ChannelSnapshot`] into pixels.

pub mod geometry;
pub mod shadow;
mod surface;

use std::collections::HashMap;

pub use surface::{PaintSize, Surface};
use tiny_skia::{
    BlendMode, FillRule, GradientStop, LinearGradient, Paint, Point, Rect, Shader, SpreadMode,
    Transform,
};

use crate::{
    channel::{decode_samples, Channel, Sentinel, FREQUENCY_COLOR},
    config::AppConfig,
    palette::{Color, Palette},
    state::{ChannelSnapshot, StateReader},
    timeline::{FixedRateLoop, LoopHandle},
    Result, SoundPainterError,
};

use self::shadow::ShadowStyle;

/// Name the sound painter registers under.
pub const SOUND_PAINTER: &str = "sound";

/// Edge mask stops as `(offset, opacity)`.
const MASK_STOPS: [(f32, f32); 4] = [(0.2, 0.0), (0.4, 1.0), (0.7, 1.0), (0.8, 0.0)];

/// Something a [`PaintHost`] can dispatch paint cycles to.
pub trait Painter: Send {
    /// Slots the painter reads from each snapshot.
    fn input_properties(&self) -> Vec<&'static str>;

    fn paint(&self, surface: &mut Surface, snapshot: &ChannelSnapshot) -> Result<()>;
}

/// How one lane is filled and composited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneStyle {
    pub palette: Palette,
    pub blend_mode: BlendMode,
    pub shadow_blur: f32,
    pub alpha: f32,
}

/// Draws the three waveform lanes with a shared glow and fades the edges.
#[derive(Debug, Clone)]
pub struct SoundPainter {
    sentinel: Sentinel,
    fallback_color: Color,
    lane_offset: f32,
    gradient_step: f32,
    alpha: f32,
}

impl SoundPainter {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            sentinel: config.sentinel,
            fallback_color: config.sampler.initial_color.parse()?,
            lane_offset: config.render.lane_offset,
            gradient_step: config.render.gradient_step,
            alpha: config.render.alpha,
        })
    }

    pub fn lane_palette(channel: Channel) -> Palette {
        match channel {
            Channel::Left | Channel::Right => Palette::Rainbow,
            Channel::Center => Palette::Plasma,
        }
    }

    fn lane_style(&self, channel: Channel, size: PaintSize) -> LaneStyle {
        LaneStyle {
            palette: Self::lane_palette(channel),
            blend_mode: BlendMode::Plus,
            shadow_blur: size.height / 2.0,
            alpha: self.alpha,
        }
    }

    fn shadow_color(&self, snapshot: &ChannelSnapshot) -> Color {
        snapshot
            .dominant_color
            .as_deref()
            .and_then(|text| text.parse().ok())
            .unwrap_or(self.fallback_color)
    }

    /// Draws one lane; returns whether anything was drawn.
    fn draw_lane(
        &self,
        surface: &mut Surface,
        lane: usize,
        style: LaneStyle,
        samples: &[f32],
        shadow_color: Color,
    ) -> Result<bool> {
        let size = surface.size();
        let points = geometry::ribbon_points(samples, size);
        let Some(path) = geometry::to_path(&geometry::area_commands(&points)) else {
            return Ok(false);
        };
        let transform = Transform::from_translate((lane as f32 - 1.0) * self.lane_offset, 0.0);

        shadow::draw_shadow(
            surface.pixmap_mut(),
            &path,
            transform,
            ShadowStyle {
                color: shadow_color,
                blur: style.shadow_blur,
                alpha: style.alpha,
                blend_mode: style.blend_mode,
            },
        );

        let mut shader = palette_gradient(size, style.palette, self.gradient_step)?;
        shader.apply_opacity(style.alpha);
        let paint = Paint {
            shader,
            blend_mode: style.blend_mode,
            anti_alias: true,
            ..Paint::default()
        };
        surface
            .pixmap_mut()
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
        Ok(true)
    }

    fn draw_edge_mask(&self, surface: &mut Surface) -> Result<()> {
        let size = surface.size();
        let stops = MASK_STOPS
            .iter()
            .map(|(offset, opacity)| {
                GradientStop::new(*offset, Color::BLACK.with_alpha(*opacity).to_skia())
            })
            .collect();
        let shader = LinearGradient::new(
            Point::from_xy(0.0, 0.0),
            Point::from_xy(size.width, 0.0),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        )
        .ok_or(SoundPainterError::InvalidInput("edge mask needs a non-empty surface"))?;
        let rect = Rect::from_xywh(0.0, 0.0, size.width, size.height)
            .ok_or(SoundPainterError::InvalidInput("edge mask needs a non-empty surface"))?;

        let paint = Paint {
            shader,
            blend_mode: BlendMode::DestinationIn,
            ..Paint::default()
        };
        surface
            .pixmap_mut()
            .fill_rect(rect, &paint, Transform::identity(), None);
        Ok(())
    }
}

impl Painter for SoundPainter {
    fn input_properties(&self) -> Vec<&'static str> {
        let mut properties = vec![FREQUENCY_COLOR];
        properties.extend(Channel::ALL.iter().map(|channel| channel.slot_key()));
        properties
    }

    /// Each lane is decoded and drawn on its own, so slots from different
    /// producer ticks mix freely. Absent slots draw nothing.
    fn paint(&self, surface: &mut Surface, snapshot: &ChannelSnapshot) -> Result<()> {
        surface.clear();
        let size = surface.size();
        let shadow_color = self.shadow_color(snapshot);

        for (lane, channel) in Channel::DRAW_ORDER.into_iter().enumerate() {
            let Some(text) = snapshot.amplitudes[channel].as_deref() else {
                continue;
            };
            let samples = decode_samples(text, self.sentinel);
            let style = self.lane_style(channel, size);
            if !self.draw_lane(surface, lane, style, &samples, shadow_color)? {
                tracing::trace!(%channel, "lane has no outline");
            }
        }

        self.draw_edge_mask(surface)
    }
}

/// Stop offsets `0, step, 2 * step ...` up to and including 1 when `step`
/// divides it.
fn gradient_offsets(step: f32) -> Result<Vec<f32>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(SoundPainterError::InvalidInput("gradient step must be positive"));
    }
    let step = f64::from(step);
    let count = (1.0 / step + 1e-6).floor() as usize;
    Ok((0..=count)
        .map(|i| (i as f64 * step).min(1.0) as f32)
        .collect())
}

/// Diagonal gradient sampling `palette` every `step` across the surface.
fn palette_gradient(size: PaintSize, palette: Palette, step: f32) -> Result<Shader<'static>> {
    let stops = gradient_offsets(step)?
        .into_iter()
        .map(|at| GradientStop::new(at, palette.sample(at).to_skia()))
        .collect();

    LinearGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(size.width, size.height),
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    )
    .ok_or(SoundPainterError::InvalidInput("lane gradient needs a non-empty surface"))
}

/// Painters by name; the host looks painters up here on every cycle.
#[derive(Default)]
pub struct PaintRegistry {
    painters: HashMap<String, Box<dyn Painter>>,
}

impl PaintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `painter` under `name`. Every input property must already be
    /// declared on the channel `reader` belongs to.
    pub fn register(
        &mut self,
        name: &str,
        painter: Box<dyn Painter>,
        reader: &StateReader,
    ) -> Result<()> {
        if self.painters.contains_key(name) {
            return Err(SoundPainterError::msg(format!(
                "painter `{name}` is already registered"
            )));
        }
        if let Some(missing) = painter
            .input_properties()
            .into_iter()
            .find(|key| !reader.is_declared(key))
        {
            return Err(SoundPainterError::UnknownSlot(missing.to_string()));
        }

        tracing::debug!(name, "registered painter");
        self.painters.insert(name.to_string(), painter);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.painters.contains_key(name)
    }

    pub fn dispatch(
        &self,
        name: &str,
        surface: &mut Surface,
        snapshot: &ChannelSnapshot,
    ) -> Result<()> {
        let painter = self
            .painters
            .get(name)
            .ok_or_else(|| SoundPainterError::msg(format!("no painter named `{name}`")))?;
        painter.paint(surface, snapshot)
    }
}

impl std::fmt::Debug for PaintRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaintRegistry")
            .field("painters", &self.painters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Consumer loop: reads a fresh snapshot and repaints on every cycle. Keeps
/// no state between cycles besides the surface itself and counters.
#[derive(Debug)]
pub struct PaintHost {
    registry: PaintRegistry,
    painter: String,
    reader: StateReader,
    surface: Surface,
    frames: u64,
    torn_frames: u64,
}

impl PaintHost {
    pub fn new(
        registry: PaintRegistry,
        painter: &str,
        reader: StateReader,
        surface: Surface,
    ) -> Result<Self> {
        if !registry.contains(painter) {
            return Err(SoundPainterError::msg(format!(
                "no painter named `{painter}`"
            )));
        }
        Ok(Self {
            registry,
            painter: painter.to_string(),
            reader,
            surface,
            frames: 0,
            torn_frames: 0,
        })
    }

    pub fn paint_once(&mut self) -> Result<()> {
        let snapshot = self.reader.channel_snapshot();
        if snapshot.is_torn() {
            self.torn_frames += 1;
        }
        self.registry
            .dispatch(&self.painter, &mut self.surface, &snapshot)?;
        self.frames += 1;
        Ok(())
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn into_surface(self) -> Surface {
        self.surface
    }

    /// Successfully painted cycles.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Cycles whose snapshot mixed slots from different producer ticks.
    pub fn torn_frames(&self) -> u64 {
        self.torn_frames
    }

    pub fn spawn(self, rate_hz: f32) -> Result<LoopHandle<PaintHost>> {
        FixedRateLoop::new("paint-host", rate_hz)?.spawn(self, PaintHost::paint_once)
    }
}
