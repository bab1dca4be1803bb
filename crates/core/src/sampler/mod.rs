use crate::{
    audio::Tap,
    channel::{encode_samples, Channel, ChannelMap, Sentinel, FREQUENCY_COLOR},
    palette::{Color, Palette},
    state::{StateChannelBuilder, StateWriter, ValueSyntax},
    timeline::{FixedRateLoop, LoopHandle},
    Result,
};

/// Descriptors pulled from the taps in one producer tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    pub amplitudes: ChannelMap<Vec<f32>>,
    pub color: Color,
}

/// Declares every slot the sampler writes and the painter reads.
pub fn declare_sound_slots(builder: &mut StateChannelBuilder, initial_color: &str) -> Result<()> {
    builder.declare(FREQUENCY_COLOR, ValueSyntax::Color, false, Some(initial_color))?;
    for channel in Channel::ALL {
        builder.declare(channel.slot_key(), ValueSyntax::Universal, false, None)?;
    }
    Ok(())
}

/// Index of the loudest bin; ties go to the lowest index.
pub fn dominant_index(magnitudes: &[f32]) -> usize {
    let mut best = 0;
    for (index, value) in magnitudes.iter().enumerate() {
        if *value > magnitudes[best] {
            best = index;
        }
    }
    best
}

/// Maps the loudest bin's position in `[0, len)` onto `palette`.
pub fn dominant_color(magnitudes: &[f32], palette: Palette) -> Color {
    if magnitudes.is_empty() {
        return palette.sample(0.0);
    }
    let position = dominant_index(magnitudes) as f32 / magnitudes.len() as f32;
    palette.sample(position)
}

/// Derives the color from the raw decibels, then normalizes them. Silent
/// bins read -inf and must not outrank real ones through the sentinel.
fn spectrum_color(magnitudes: &mut [f32], palette: Palette, sentinel: Sentinel) -> Color {
    let color = dominant_color(magnitudes, palette);
    sentinel.normalize_slice(magnitudes);
    color
}

/// Producer side of the pipeline: samples the taps and publishes the result.
#[derive(Debug)]
pub struct FrameSampler {
    taps: ChannelMap<Tap>,
    palette: Palette,
    sentinel: Sentinel,
    amplitudes: ChannelMap<Vec<f32>>,
    magnitudes: Vec<f32>,
}

impl FrameSampler {
    pub fn new(taps: ChannelMap<Tap>, sentinel: Sentinel) -> Self {
        let window = taps[Channel::Center].window_size();
        let amplitudes = ChannelMap::from_fn(|channel| vec![0.0; taps[channel].window_size()]);
        Self {
            taps,
            palette: Palette::Rainbow,
            sentinel,
            amplitudes,
            magnitudes: vec![0.0; window / 2],
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Reads every tap once. All arrays come back sentinel-normalized.
    pub fn sample(&mut self) -> Result<FrameSample> {
        self.taps[Channel::Center].frequency_domain(&mut self.magnitudes)?;
        let color = spectrum_color(&mut self.magnitudes, self.palette, self.sentinel);

        for channel in Channel::ALL {
            let buffer = &mut self.amplitudes[channel];
            self.taps[channel].time_domain(buffer)?;
            self.sentinel.normalize_slice(buffer);
        }

        Ok(FrameSample {
            amplitudes: self.amplitudes.clone(),
            color,
        })
    }

    /// One sample-and-publish cycle.
    pub fn tick(&mut self, writer: &StateWriter) -> Result<FrameSample> {
        let sample = self.sample()?;
        writer.write(FREQUENCY_COLOR, sample.color.to_string())?;
        for (channel, amplitudes) in sample.amplitudes.iter() {
            writer.write(channel.slot_key(), encode_samples(amplitudes))?;
        }
        Ok(sample)
    }

    /// Runs [`FrameSampler::tick`] at `rate_hz` until the handle is stopped.
    pub fn spawn(self, writer: StateWriter, rate_hz: f32) -> Result<LoopHandle<SamplerState>> {
        FixedRateLoop::new("frame-sampler", rate_hz)?.spawn(
            SamplerState {
                sampler: self,
                writer,
            },
            |state| state.sampler.tick(&state.writer).map(|_| ()),
        )
    }
}

/// What the producer loop owns while running.
#[derive(Debug)]
pub struct SamplerState {
    pub sampler: FrameSampler,
    pub writer: StateWriter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{AudioGraph, StreamFormat},
        channel::decode_samples,
        config::AudioConfig,
    };

    fn graph(channels: u16) -> AudioGraph {
        AudioGraph::build(
            StreamFormat::new(channels, 48_000),
            &AudioConfig {
                window_size: 32,
                smoothing: 0.0,
            },
        )
        .unwrap()
    }

    fn sound_channel() -> (StateWriter, crate::state::StateReader) {
        let mut builder = StateChannelBuilder::new();
        declare_sound_slots(&mut builder, "#000").unwrap();
        builder.build()
    }

    #[test]
    fn dominant_color_of_reference_spectrum() {
        let magnitudes = [-80.0, -20.0, -80.0, -80.0];
        assert_eq!(dominant_index(&magnitudes), 1);
        assert_eq!(
            dominant_color(&magnitudes, Palette::Rainbow),
            Palette::Rainbow.sample(0.25)
        );
    }

    #[test]
    fn silent_bins_never_outrank_the_loudest() {
        for sentinel in [Sentinel::Zero, Sentinel::NegativeOne] {
            let mut magnitudes = [f32::NEG_INFINITY, -20.0, -80.0, -80.0];
            let color = spectrum_color(&mut magnitudes, Palette::Rainbow, sentinel);

            assert_eq!(color, Palette::Rainbow.sample(0.25));
            assert_eq!(magnitudes, [sentinel.value(), -20.0, -80.0, -80.0]);
        }
    }

    #[test]
    fn ties_resolve_to_the_first_bin() {
        assert_eq!(dominant_index(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(dominant_index(&[0.0; 8]), 0);
        assert_eq!(dominant_index(&[]), 0);
    }

    #[test]
    fn silent_graph_samples_as_sentinel() {
        let graph = graph(2);
        let mut sampler = FrameSampler::new(graph.taps(), Sentinel::NegativeOne);

        let sample = sampler.sample().unwrap();
        for (_, amplitudes) in sample.amplitudes.iter() {
            assert_eq!(amplitudes.len(), 32);
            assert!(amplitudes.iter().all(|v| v.is_finite()));
        }
        // Every bin reads -inf, so the first one wins.
        assert_eq!(sample.color, Palette::Rainbow.sample(0.0));
    }

    #[test]
    fn tick_publishes_every_slot() {
        let graph = graph(2);
        let block: Vec<f32> = (0..32).flat_map(|_| [0.5, -0.5]).collect();
        graph.push_interleaved(&block).unwrap();

        let (writer, reader) = sound_channel();
        assert_eq!(reader.read(FREQUENCY_COLOR).as_deref(), Some("#000"));

        let mut sampler = FrameSampler::new(graph.taps(), Sentinel::Zero);
        let sample = sampler.tick(&writer).unwrap();

        let left = reader.read(Channel::Left.slot_key()).unwrap();
        assert_eq!(decode_samples(&left, Sentinel::Zero), vec![0.5; 32]);
        let right = reader.read(Channel::Right.slot_key()).unwrap();
        assert_eq!(decode_samples(&right, Sentinel::Zero), vec![-0.5; 32]);
        assert_eq!(
            reader.read(FREQUENCY_COLOR).unwrap(),
            sample.color.to_string()
        );
        assert!(!reader.channel_snapshot().is_torn());
    }

    #[test]
    fn spawned_sampler_keeps_publishing_until_stopped() {
        let graph = graph(1);
        let (writer, reader) = sound_channel();
        let handle = FrameSampler::new(graph.taps(), Sentinel::Zero)
            .spawn(writer, 200.0)
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(60));
        let report = handle.stop().unwrap();

        assert!(report.ticks > 0);
        assert_eq!(report.failures, 0);
        assert!(reader.read(Channel::Center.slot_key()).is_some());
    }
}
