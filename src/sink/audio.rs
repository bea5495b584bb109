//! PCM audio device output.

use super::AudioSink;
use crate::config::{AudioFormat, ByteOrder, SampleWidth};
use crate::pipeline::types::MediaUnit;
use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Maximum samples buffered toward the device (~170ms at 48kHz stereo).
/// This prevents unbounded memory growth and limits audio latency.
const MAX_BUFFER_SAMPLES: usize = 16384;
const I16_TO_F32: f32 = 1.0 / 32768.0;

/// Plays raw PCM sample buffers on the default output device.
///
/// Incoming units are converted to `f32` and pushed into a ring buffer that
/// the cpal output callback drains: underruns are padded with silence,
/// overruns drop the oldest samples so latency stays bounded.
pub struct DeviceAudioSink {
    format: AudioFormat,
    sample_buffer: Arc<Mutex<SampleRingBuffer>>,
    _stream: cpal::Stream, // kept alive
    buffers_played: u64,
}

/// Ring buffer for device samples with overflow protection.
struct SampleRingBuffer {
    buffer: Vec<f32>,
    write_pos: usize,
    read_pos: usize,
    len: usize,
    capacity: usize,
    samples_dropped: u64,
}

impl SampleRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0f32; capacity],
            write_pos: 0,
            read_pos: 0,
            len: 0,
            capacity,
            samples_dropped: 0,
        }
    }

    /// Push samples to the buffer, dropping oldest if full
    fn push(&mut self, samples: &[f32]) {
        for &sample in samples {
            if self.len >= self.capacity {
                self.read_pos = (self.read_pos + 1) % self.capacity;
                self.samples_dropped += 1;
            } else {
                self.len += 1;
            }
            self.buffer[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.capacity;
        }
    }

    /// Read samples from the buffer, padding with silence when empty
    fn read(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            if self.len > 0 {
                *sample = self.buffer[self.read_pos];
                self.read_pos = (self.read_pos + 1) % self.capacity;
                self.len -= 1;
            } else {
                *sample = 0.0;
            }
        }
    }
}

unsafe impl Send for DeviceAudioSink {}

impl DeviceAudioSink {
    pub fn new(format: &AudioFormat) -> Result<Self> {
        format.validate()?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output audio device"))?;
        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: format.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let sample_buffer = Arc::new(Mutex::new(SampleRingBuffer::new(MAX_BUFFER_SAMPLES)));
        let buffer_clone = Arc::clone(&sample_buffer);

        let stream = device.build_output_stream(
            &config,
            move |output: &mut [f32], _| {
                if let Ok(mut buf) = buffer_clone.lock() {
                    buf.read(output);
                } else {
                    output.fill(0.0);
                }
            },
            |err| log::error!("Audio output error: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            format: format.clone(),
            sample_buffer,
            _stream: stream,
            buffers_played: 0,
        })
    }

    pub fn buffers_played(&self) -> u64 {
        self.buffers_played
    }
}

impl AudioSink for DeviceAudioSink {
    fn play(&mut self, unit: &MediaUnit) -> Result<()> {
        let samples = pcm_to_f32(&self.format, &unit.data);
        if let Ok(mut buf) = self.sample_buffer.lock() {
            buf.push(&samples);
        }
        self.buffers_played += 1;
        Ok(())
    }
}

/// Convert a raw PCM payload into interleaved `f32` device samples.
fn pcm_to_f32(format: &AudioFormat, data: &[u8]) -> Vec<f32> {
    match (format.sample_width, format.byte_order) {
        (SampleWidth::S16, ByteOrder::Little) => data
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 * I16_TO_F32)
            .collect(),
        (SampleWidth::S16, ByteOrder::Big) => data
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]) as f32 * I16_TO_F32)
            .collect(),
        (SampleWidth::F32, ByteOrder::Little) => data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        (SampleWidth::F32, ByteOrder::Big) => data
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_push_read() {
        let mut buf = SampleRingBuffer::new(1024);

        buf.push(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.len, 4);

        let mut output = [0.0f32; 4];
        buf.read(&mut output);
        assert_eq!(output, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.len, 0);
    }

    #[test]
    fn test_underrun_silence() {
        let mut buf = SampleRingBuffer::new(1024);

        buf.push(&[1.0, 2.0]);

        let mut output = [9.0f32; 4];
        buf.read(&mut output);
        assert_eq!(output, [1.0, 2.0, 0.0, 0.0]); // Last two are silence
    }

    #[test]
    fn test_overrun_drops_oldest() {
        let mut buf = SampleRingBuffer::new(4);

        buf.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buf.samples_dropped, 2);

        let mut output = [0.0f32; 4];
        buf.read(&mut output);
        // The two oldest samples were dropped to bound latency.
        assert_eq!(output, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_pcm_s16le_conversion() {
        let format = AudioFormat::default();
        // 0, max, min
        let data = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80];
        let samples = pcm_to_f32(&format, &data);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 32767.0 * I16_TO_F32).abs() < f32::EPSILON);
        assert_eq!(samples[2], -1.0);
    }

    #[test]
    fn test_pcm_s16be_conversion() {
        let format = AudioFormat {
            byte_order: ByteOrder::Big,
            ..AudioFormat::default()
        };
        let data = [0x7f, 0xff, 0x80, 0x00];
        let samples = pcm_to_f32(&format, &data);
        assert!((samples[0] - 32767.0 * I16_TO_F32).abs() < f32::EPSILON);
        assert_eq!(samples[1], -1.0);
    }

    #[test]
    fn test_pcm_f32_passthrough() {
        let format = AudioFormat {
            sample_width: SampleWidth::F32,
            ..AudioFormat::default()
        };
        let mut data = Vec::new();
        data.extend_from_slice(&0.5f32.to_le_bytes());
        data.extend_from_slice(&(-0.25f32).to_le_bytes());
        let samples = pcm_to_f32(&format, &data);
        assert_eq!(samples, vec![0.5, -0.25]);
    }
}
