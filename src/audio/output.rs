// Audio output using cpal
// One-shot playback of the probe clip through the default output device

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};

// Plenty of headroom for any probe clip; the embedded asset is one sample.
const RING_BUFFER_SIZE: usize = 4096;

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// A live output stream fed from a ring buffer. Dropping it stops the
/// stream and releases the device.
pub struct AudioOutput {
    _stream: Stream,
    producer: Arc<Mutex<RingProducer>>,
}

impl AudioOutput {
    /// Whether the host reports a default output device at all.
    pub fn device_available() -> bool {
        cpal::default_host().default_output_device().is_some()
    }

    /// Open the default output device and start a stream fed from the
    /// ring buffer.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no output device available"))?;

        let config = device
            .default_output_config()
            .context("failed to get default output config")?;

        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();
        let producer = Arc::new(Mutex::new(producer));
        let consumer = Arc::new(Mutex::new(consumer));

        // Build the output stream based on sample format
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), consumer)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), consumer)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), consumer)?
            }
            format => return Err(anyhow!("unsupported sample format: {:?}", format)),
        };

        stream.play().context("failed to start stream")?;

        Ok(Self {
            _stream: stream,
            producer,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        consumer: Arc<Mutex<RingConsumer>>,
    ) -> Result<Stream> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut consumer = consumer.lock();

                    for sample in data.iter_mut() {
                        // Underrun means silence, which is all this stream
                        // plays anyway.
                        let value = consumer.try_pop().unwrap_or(0.0);
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    tracing::warn!("audio output error: {}", err);
                },
                None,
            )
            .context("failed to build output stream")?;

        Ok(stream)
    }

    /// Push the whole clip into the ring buffer, waiting when it fills.
    pub fn write_all(&self, samples: &[f32]) {
        let mut remaining = samples;

        while !remaining.is_empty() {
            let written = self.write(remaining);
            if written > 0 {
                remaining = &remaining[written..];
            } else {
                // Buffer full, wait a bit
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    fn write(&self, samples: &[f32]) -> usize {
        let mut producer = self.producer.lock();
        let mut written = 0;

        for &sample in samples {
            if producer.try_push(sample).is_ok() {
                written += 1;
            } else {
                break;
            }
        }

        written
    }

    /// Samples still waiting in the ring buffer.
    pub fn pending(&self) -> usize {
        self.producer.lock().occupied_len()
    }

    /// Wait, bounded, until the device has consumed the clip.
    pub fn drain(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;

        while self.pending() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}
