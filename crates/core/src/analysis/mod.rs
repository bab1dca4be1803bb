use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{config::AudioConfig, Result, SoundPainterError};

const BLACKMAN_A0: f32 = 0.42;
const BLACKMAN_A1: f32 = 0.5;
const BLACKMAN_A2: f32 = 0.08;

/// Frequency-domain reader for one analysis window.
///
/// Each call to [`SpectrumAnalyser::analyse`] windows the input, runs a real
/// FFT and blends the magnitudes with those of the previous call before
/// converting them to decibels. Silent bins read as negative infinity.
pub struct SpectrumAnalyser {
    size: usize,
    smoothing: f32,
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    pub fn new(config: &AudioConfig) -> Result<Self> {
        config.validate()?;

        let size = config.window_size;
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        let scratch = plan.make_scratch_vec();
        let spectrum = plan.make_output_vec();
        let input = plan.make_input_vec();

        Ok(Self {
            size,
            smoothing: config.smoothing,
            plan,
            window: (0..size).map(|n| blackman_value(n, size)).collect(),
            input,
            spectrum,
            scratch,
            smoothed: vec![0.0; size / 2],
        })
    }

    /// Window length W.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of exposed bins, W / 2.
    pub fn bin_count(&self) -> usize {
        self.size / 2
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Writes decibel magnitudes for `samples` into `out`.
    pub fn analyse(&mut self, samples: &[f32], out: &mut [f32]) -> Result<()> {
        if samples.len() != self.size {
            return Err(SoundPainterError::InvalidInput(
                "spectrum input must span exactly one window",
            ));
        }
        if out.len() != self.bin_count() {
            return Err(SoundPainterError::InvalidInput(
                "spectrum output must hold half a window of bins",
            ));
        }

        for ((slot, sample), weight) in self.input.iter_mut().zip(samples).zip(&self.window) {
            *slot = sample * weight;
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        let scale = 1.0 / self.size as f32;
        let tau = self.smoothing;
        for ((smoothed, bin), db) in self.smoothed.iter_mut().zip(&self.spectrum).zip(out) {
            let magnitude = bin.norm() * scale;
            let blended = tau * *smoothed + (1.0 - tau) * magnitude;
            // Keep the history finite so one bad block cannot poison later reads.
            *smoothed = if blended.is_finite() { blended } else { 0.0 };
            *db = 20.0 * smoothed.log10();
        }

        Ok(())
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("size", &self.size)
            .field("smoothing", &self.smoothing)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    let phase = 2.0 * PI * index as f32 / len as f32;
    BLACKMAN_A0 - BLACKMAN_A1 * phase.cos() + BLACKMAN_A2 * (2.0 * phase).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_analyser(window_size: usize, smoothing: f32) -> SpectrumAnalyser {
        SpectrumAnalyser::new(&AudioConfig {
            window_size,
            smoothing,
        })
        .unwrap()
    }

    fn sine(bin: usize, size: usize) -> Vec<f32> {
        (0..size)
            .map(|n| (2.0 * PI * bin as f32 * n as f32 / size as f32).sin())
            .collect()
    }

    #[test]
    fn silence_reads_as_negative_infinity() {
        let mut analyser = build_analyser(128, 0.8);
        let mut out = vec![0.0; analyser.bin_count()];
        analyser.analyse(&[0.0; 128], &mut out).unwrap();

        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|db| *db == f32::NEG_INFINITY));
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let mut analyser = build_analyser(128, 0.0);
        let mut out = vec![0.0; 64];
        analyser.analyse(&sine(10, 128), &mut out).unwrap();

        let peak = out
            .iter()
            .enumerate()
            .fold(0, |best, (i, db)| if *db > out[best] { i } else { best });
        assert_eq!(peak, 10);
    }

    #[test]
    fn smoothing_decays_instead_of_dropping_to_silence() {
        let mut analyser = build_analyser(64, 0.8);
        let mut out = vec![0.0; 32];
        analyser.analyse(&sine(4, 64), &mut out).unwrap();
        let loud = out[4];

        analyser.analyse(&[0.0; 64], &mut out).unwrap();
        assert!(out[4].is_finite());
        assert!(out[4] < loud);

        analyser.reset();
        analyser.analyse(&[0.0; 64], &mut out).unwrap();
        assert_eq!(out[4], f32::NEG_INFINITY);
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let mut analyser = build_analyser(32, 0.8);
        let mut out = vec![0.0; 16];
        assert!(analyser.analyse(&[0.0; 31], &mut out).is_err());
        assert!(analyser.analyse(&[0.0; 32], &mut out[..8]).is_err());
    }
}
