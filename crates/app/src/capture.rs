use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, SampleFormat, SizedSample,
};
use sound_painter_core::{AudioConfig, AudioGraph, SoundPainterError, StreamFormat};

/// Running microphone stream feeding an [`AudioGraph`]. Dropping it closes
/// the device.
pub struct Capture {
    graph: AudioGraph,
    _stream: cpal::Stream,
}

impl Capture {
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }
}

fn capture_error(err: impl std::fmt::Display) -> SoundPainterError {
    SoundPainterError::Capture(err.to_string())
}

/// Opens the default input device. Missing devices and refused access are
/// startup failures; nothing is retried.
pub fn open(config: &AudioConfig) -> sound_painter_core::Result<Capture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| capture_error("no audio input device found"))?;
    let supported = device.default_input_config().map_err(capture_error)?;

    let format = StreamFormat::new(supported.channels(), supported.sample_rate().0);
    tracing::info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        channels = format.channels,
        sample_rate = format.sample_rate,
        "opening capture device"
    );

    let graph = AudioGraph::build(format, config)?;
    let stream_config = supported.config();
    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, &graph)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, &graph)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, &graph)?,
        other => {
            return Err(capture_error(format!(
                "unsupported sample format {other:?}"
            )))
        }
    };
    stream.play().map_err(capture_error)?;

    Ok(Capture {
        graph,
        _stream: stream,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: &AudioGraph,
) -> sound_painter_core::Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let data_graph = graph.clone();
    let error_graph = graph.clone();
    let mut block = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                block.clear();
                block.extend(data.iter().map(|sample| sample.to_sample::<f32>()));
                if let Err(err) = data_graph.push_interleaved(&block) {
                    tracing::warn!(%err, "dropping captured block");
                }
            },
            move |err| {
                tracing::error!(%err, "capture stream failed");
                if let Err(err) = error_graph.end() {
                    tracing::error!(%err, "could not end audio graph");
                }
            },
            None,
        )
        .map_err(capture_error)
}
