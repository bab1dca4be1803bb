use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    analysis::SpectrumAnalyser,
    channel::{Channel, ChannelMap},
    config::AudioConfig,
    Result, SoundPainterError,
};

/// Shape of the incoming capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Interleaved channel count. Zero describes a stream without an audio
    /// track; its taps read as silence.
    pub channels: u16,
    pub sample_rate: u32,
}

impl StreamFormat {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }
}

/// Balance-law stereo panner. A hard pan silences the opposite side.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StereoPanner {
    pan: f32,
}

impl StereoPanner {
    const HARD_LEFT: StereoPanner = StereoPanner { pan: -1.0 };
    const HARD_RIGHT: StereoPanner = StereoPanner { pan: 1.0 };

    fn process(self, [left, right]: [f32; 2]) -> [f32; 2] {
        let pan = self.pan.clamp(-1.0, 1.0);
        let (gain_l, gain_r) = if pan <= 0.0 {
            (1.0, 1.0 + pan)
        } else {
            (1.0 - pan, 1.0)
        };
        [left * gain_l, right * gain_r]
    }
}

/// How a tap derives its mono signal from a stereo frame.
#[derive(Debug, Clone, Copy)]
enum Route {
    /// Pan, then sum both sides; with a hard pan only one side survives.
    Panned(StereoPanner),
    /// Unmodified mix, averaged down to mono.
    Direct,
}

impl Route {
    fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Left => Route::Panned(StereoPanner::HARD_LEFT),
            Channel::Right => Route::Panned(StereoPanner::HARD_RIGHT),
            Channel::Center => Route::Direct,
        }
    }

    fn downmix(self, frame: [f32; 2]) -> f32 {
        match self {
            Route::Panned(panner) => {
                let [left, right] = panner.process(frame);
                left + right
            }
            Route::Direct => (frame[0] + frame[1]) * 0.5,
        }
    }
}

/// Ring buffer of the most recent window plus an optional spectrum reader.
#[derive(Debug)]
struct TapBuffer {
    route: Route,
    ring: Vec<f32>,
    head: usize,
    analyser: Option<SpectrumAnalyser>,
}

impl TapBuffer {
    fn push(&mut self, frame: [f32; 2]) {
        self.ring[self.head] = self.route.downmix(frame);
        self.head = (self.head + 1) % self.ring.len();
    }

    fn copy_ordered(&self, out: &mut [f32]) {
        let (newest, oldest) = self.ring.split_at(self.head);
        out[..oldest.len()].copy_from_slice(oldest);
        out[oldest.len()..].copy_from_slice(newest);
    }

    fn silence(&mut self) {
        self.ring.fill(0.0);
        self.head = 0;
        if let Some(analyser) = self.analyser.as_mut() {
            analyser.reset();
        }
    }
}

#[derive(Debug)]
struct GraphState {
    taps: ChannelMap<TapBuffer>,
    ended: bool,
    frames: u64,
}

/// Analysis routing over one live capture stream.
///
/// The capture side pushes interleaved blocks; the [`Tap`]s handed out by
/// [`AudioGraph::taps`] read the latest window of each route.
#[derive(Debug, Clone)]
pub struct AudioGraph {
    format: StreamFormat,
    window: usize,
    shared: Arc<Mutex<GraphState>>,
}

impl AudioGraph {
    /// Builds the left, right and full-mix routes for `format`.
    pub fn build(format: StreamFormat, config: &AudioConfig) -> Result<Self> {
        config.validate()?;
        let window = config.window_size;

        let taps = ChannelMap::try_from_fn(|channel| {
            let analyser = match channel {
                Channel::Center => Some(SpectrumAnalyser::new(config)?),
                Channel::Left | Channel::Right => None,
            };
            Ok::<_, SoundPainterError>(TapBuffer {
                route: Route::for_channel(channel),
                ring: vec![0.0; window],
                head: 0,
                analyser,
            })
        })?;

        if format.channels == 0 {
            tracing::warn!("capture stream has no audio track, taps will read silence");
        }
        tracing::debug!(?format, window, "built audio graph");

        Ok(Self {
            format,
            window,
            shared: Arc::new(Mutex::new(GraphState {
                taps,
                ended: false,
                frames: 0,
            })),
        })
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Read handles for every route.
    pub fn taps(&self) -> ChannelMap<Tap> {
        ChannelMap::from_fn(|channel| Tap {
            channel,
            window: self.window,
            shared: self.shared.clone(),
        })
    }

    /// Feeds an interleaved block from the capture device.
    ///
    /// Mono input feeds both sides; channels beyond the second are ignored.
    /// Trailing partial frames are dropped.
    pub fn push_interleaved(&self, samples: &[f32]) -> Result<()> {
        let channels = usize::from(self.format.channels);
        if channels == 0 || samples.is_empty() {
            return Ok(());
        }

        let mut state = self.lock()?;
        if state.ended {
            return Ok(());
        }

        let mut pushed = 0u64;
        for frame in samples.chunks_exact(channels) {
            let stereo = match frame {
                [mono] => [*mono, *mono],
                [left, right, ..] => [*left, *right],
                [] => continue,
            };
            for channel in Channel::ALL {
                state.taps[channel].push(stereo);
            }
            pushed += 1;
        }
        state.frames += pushed;

        Ok(())
    }

    /// Number of frames routed so far.
    pub fn frames_processed(&self) -> Result<u64> {
        Ok(self.lock()?.frames)
    }

    /// Tears the graph down once the stream ends. Taps keep working and read
    /// silence from here on.
    pub fn end(&self) -> Result<()> {
        let mut state = self.lock()?;
        if !state.ended {
            state.ended = true;
            for channel in Channel::ALL {
                state.taps[channel].silence();
            }
            tracing::info!(frames = state.frames, "audio graph ended");
        }
        Ok(())
    }

    pub fn is_ended(&self) -> Result<bool> {
        Ok(self.lock()?.ended)
    }

    fn lock(&self) -> Result<MutexGuard<'_, GraphState>> {
        lock_state(&self.shared)
    }
}

fn lock_state(shared: &Mutex<GraphState>) -> Result<MutexGuard<'_, GraphState>> {
    shared
        .lock()
        .map_err(|_| SoundPainterError::Poisoned("audio graph"))
}

/// Read-only view over one route of an [`AudioGraph`].
#[derive(Clone)]
pub struct Tap {
    channel: Channel,
    window: usize,
    shared: Arc<Mutex<GraphState>>,
}

impl Tap {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Window length W; fixed at creation.
    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Whether [`Tap::frequency_domain`] is available on this route.
    pub fn has_spectrum(&self) -> bool {
        self.channel == Channel::Center
    }

    /// Copies the latest W amplitudes, oldest first.
    pub fn time_domain(&self, out: &mut [f32]) -> Result<()> {
        if out.len() != self.window {
            return Err(SoundPainterError::InvalidInput(
                "time-domain buffer must match the window size",
            ));
        }
        let state = lock_state(&self.shared)?;
        state.taps[self.channel].copy_ordered(out);
        Ok(())
    }

    /// Writes W / 2 decibel magnitudes of the latest window.
    pub fn frequency_domain(&self, out: &mut [f32]) -> Result<()> {
        let mut samples = vec![0.0; self.window];
        let mut state = lock_state(&self.shared)?;
        let buffer = &mut state.taps[self.channel];
        buffer.copy_ordered(&mut samples);

        let analyser = buffer.analyser.as_mut().ok_or(SoundPainterError::InvalidInput(
            "only the full-mix tap carries a spectrum",
        ))?;
        analyser.analyse(&samples, out)
    }
}

impl std::fmt::Debug for Tap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tap")
            .field("channel", &self.channel)
            .field("window", &self.window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_graph(channels: u16, window_size: usize) -> AudioGraph {
        let config = AudioConfig {
            window_size,
            ..AudioConfig::default()
        };
        AudioGraph::build(StreamFormat::new(channels, 48_000), &config).unwrap()
    }

    fn read(tap: &Tap) -> Vec<f32> {
        let mut out = vec![0.0; tap.window_size()];
        tap.time_domain(&mut out).unwrap();
        out
    }

    #[test]
    fn hard_panning_isolates_each_side() {
        let graph = build_graph(2, 32);
        let block: Vec<f32> = (0..32).flat_map(|_| [0.5, -0.25]).collect();
        graph.push_interleaved(&block).unwrap();

        let taps = graph.taps();
        assert!(read(&taps[Channel::Left]).iter().all(|s| *s == 0.5));
        assert!(read(&taps[Channel::Right]).iter().all(|s| *s == -0.25));
        assert!(read(&taps[Channel::Center]).iter().all(|s| *s == 0.125));
    }

    #[test]
    fn mono_input_feeds_every_route() {
        let graph = build_graph(1, 32);
        graph.push_interleaved(&[0.75; 32]).unwrap();

        for (_, tap) in graph.taps().iter() {
            assert!(read(tap).iter().all(|s| *s == 0.75));
        }
    }

    #[test]
    fn time_domain_returns_latest_window_oldest_first() {
        let graph = build_graph(1, 32);
        let ramp: Vec<f32> = (0..40).map(|i| i as f32).collect();
        graph.push_interleaved(&ramp).unwrap();

        let expected: Vec<f32> = (8..40).map(|i| i as f32).collect();
        assert_eq!(read(&graph.taps()[Channel::Center]), expected);
        assert_eq!(graph.frames_processed().unwrap(), 40);
    }

    #[test]
    fn trackless_stream_reads_as_silence() {
        let graph = build_graph(0, 64);
        graph.push_interleaved(&[1.0; 64]).unwrap();
        let taps = graph.taps();

        assert!(read(&taps[Channel::Left]).iter().all(|s| *s == 0.0));

        let mut spectrum = vec![0.0; 32];
        taps[Channel::Center].frequency_domain(&mut spectrum).unwrap();
        assert!(spectrum.iter().all(|db| !db.is_finite()));
    }

    #[test]
    fn only_center_exposes_a_spectrum() {
        let graph = build_graph(2, 32);
        let taps = graph.taps();
        let mut spectrum = vec![0.0; 16];

        assert!(taps[Channel::Center].has_spectrum());
        assert!(!taps[Channel::Left].has_spectrum());
        assert!(taps[Channel::Left].frequency_domain(&mut spectrum).is_err());
    }

    #[test]
    fn ended_graph_goes_quiet() {
        let graph = build_graph(1, 32);
        graph.push_interleaved(&[0.5; 32]).unwrap();
        graph.end().unwrap();
        graph.push_interleaved(&[0.5; 32]).unwrap();

        assert!(graph.is_ended().unwrap());
        assert!(read(&graph.taps()[Channel::Right]).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn rejects_wrong_buffer_length() {
        let graph = build_graph(1, 32);
        let mut out = vec![0.0; 31];
        assert!(graph.taps()[Channel::Left].time_domain(&mut out).is_err());
    }
}
