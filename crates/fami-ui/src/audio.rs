use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fami_core::audio_queue::AudioConsumer;
use log::warn;

/// Start audio playback with `cpal`, draining the core's sample queue.
///
/// The queue carries mono samples at the device's channel count times its
/// frame rate, so each output slot pops its own sample: a stereo device
/// consumes two queue samples per frame, matching the emitter's pacing.
/// Underruns play silence.
///
/// Returns the active [`cpal::Stream`] if successful.
pub fn start_stream(queue: AudioConsumer) -> Option<cpal::Stream> {
    let host = cpal::default_host();
    let device = host.default_output_device()?;
    let supported = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            warn!("no supported output config: {e}");
            return None;
        }
    };
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let err_fn = |err| warn!("audio stream error: {err}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _| {
                for slot in data.iter_mut() {
                    *slot = queue.pop().unwrap_or(0.0);
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _| {
                for slot in data.iter_mut() {
                    let sample = queue.pop().unwrap_or(0.0);
                    *slot = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_output_stream(
            &config,
            move |data: &mut [u16], _| {
                for slot in data.iter_mut() {
                    let sample = queue.pop().unwrap_or(0.0);
                    *slot = ((sample.clamp(-1.0, 1.0) * 0.5 + 0.5) * u16::MAX as f32) as u16;
                }
            },
            err_fn,
            None,
        ),
        other => {
            warn!("unsupported sample format {other:?}");
            return None;
        }
    };

    match stream {
        Ok(stream) => {
            if let Err(e) = stream.play() {
                warn!("failed to start audio stream: {e}");
                return None;
            }
            Some(stream)
        }
        Err(e) => {
            warn!("failed to build audio stream: {e}");
            None
        }
    }
}
