use std::f32::consts::TAU;

use sound_painter_core::{AudioGraph, FixedRateLoop, LoopHandle, StreamFormat};

pub const FORMAT: StreamFormat = StreamFormat {
    channels: 2,
    sample_rate: 48_000,
};

const BLOCKS_PER_SECOND: u32 = 100;

/// Two detuned sines with a slow sweep and tremolo, one per side.
#[derive(Debug, Default)]
pub struct DemoSignal {
    frame: u64,
    phase_left: f32,
    phase_right: f32,
    block: Vec<f32>,
}

impl DemoSignal {
    pub fn next_block(&mut self, frames: usize) -> &[f32] {
        let rate = FORMAT.sample_rate as f32;
        self.block.clear();
        for _ in 0..frames {
            let t = self.frame as f32 / rate;
            let sweep = 220.0 + 180.0 * (TAU * 0.1 * t).sin();
            let tremolo = 0.6 + 0.4 * (TAU * 0.5 * t).sin();

            self.phase_left = (self.phase_left + TAU * sweep / rate) % TAU;
            self.phase_right = (self.phase_right + TAU * sweep * 1.5 / rate) % TAU;
            self.block.push(0.8 * tremolo * self.phase_left.sin());
            self.block.push(0.5 * self.phase_right.sin());
            self.frame += 1;
        }
        &self.block
    }
}

/// Feeds `graph` in real time until the handle is stopped.
pub fn spawn(graph: AudioGraph) -> sound_painter_core::Result<LoopHandle<(DemoSignal, AudioGraph)>> {
    let frames = (FORMAT.sample_rate / BLOCKS_PER_SECOND) as usize;
    FixedRateLoop::new("demo-source", BLOCKS_PER_SECOND as f32)?.spawn(
        (DemoSignal::default(), graph),
        move |(signal, graph)| graph.push_interleaved(signal.next_block(frames)),
    )
}
