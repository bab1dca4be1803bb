//! Core library for the Sound Painter visualiser.
//!
//! Audio from a capture stream is routed through an [`AudioGraph`] whose taps
//! a [`FrameSampler`] reads on a fixed cadence. The sampler publishes text
//! values into a lock-free state channel, and a [`PaintHost`] running on its
//! own cadence reads snapshots from that channel and paints them with the
//! [`SoundPainter`]. The two loops share nothing but the channel.

pub mod analysis;
pub mod audio;
pub mod channel;
pub mod config;
pub mod error;
pub mod palette;
pub mod render;
pub mod sampler;
pub mod state;
pub mod timeline;

pub use analysis::SpectrumAnalyser;
pub use audio::{AudioGraph, StreamFormat, Tap};
pub use channel::{Channel, ChannelMap, Sentinel, FREQUENCY_COLOR};
pub use config::{AppConfig, AudioConfig, RenderConfig, SamplerConfig};
pub use error::{Result, SoundPainterError};
pub use palette::{Color, Palette};
pub use render::{PaintHost, PaintRegistry, PaintSize, Painter, SoundPainter, Surface, SOUND_PAINTER};
pub use sampler::{declare_sound_slots, FrameSample, FrameSampler};
pub use state::{ChannelSnapshot, StateChannelBuilder, StateReader, StateWriter, ValueSyntax};
pub use timeline::{FixedRateLoop, LoopHandle, LoopReport};
