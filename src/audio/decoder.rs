// Probe clip decoding using Symphonia
// Decodes an in-memory audio blob to raw PCM samples

use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use symphonia::core::audio::{AudioBufferRef, AudioPlanes, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// A fully decoded clip, held in memory for the lifetime of one playback
/// attempt.
pub struct SilenceClip {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl SilenceClip {
    /// Decode an audio blob to interleaved f32 samples.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("wav");

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("unrecognized audio data")?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("no audio track found"))?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1) as u16;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("failed to create decoder")?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break; // End of stream
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(anyhow!("failed to read packet: {}", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => append_interleaved(&mut samples, &decoded)?,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("decode error in probe clip (skipping): {}", e);
                    continue;
                }
                Err(e) => return Err(anyhow!("decode failed: {}", e)),
            }
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Interleaved f32 samples, ready for the output stream.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get the sample rate of the clip
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Clip length in milliseconds (zero for the single-sample asset).
    pub fn duration_ms(&self) -> u64 {
        let frames = self.samples.len() as u64 / self.channels.max(1) as u64;
        frames * 1000 / self.sample_rate.max(1) as u64
    }

    /// True when no sample rises above the 16-bit noise floor.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| s.abs() < 1.0 / 32768.0)
    }
}

/// Append one decoded buffer as interleaved f32. The probe asset space is
/// PCM WAV, so only the formats that can come out of it are handled.
fn append_interleaved(samples: &mut Vec<f32>, buf: &AudioBufferRef) -> Result<()> {
    match buf {
        AudioBufferRef::F32(b) => {
            interleave(samples, b.planes(), b.frames(), |s: f32| s);
        }
        AudioBufferRef::S16(b) => {
            let scale = 1.0 / 32768.0;
            interleave(samples, b.planes(), b.frames(), |s: i16| s as f32 * scale);
        }
        AudioBufferRef::U8(b) => {
            interleave(samples, b.planes(), b.frames(), |s: u8| {
                (s as f32 - 128.0) / 128.0
            });
        }
        _ => return Err(anyhow!("unsupported sample format in probe clip")),
    }
    Ok(())
}

fn interleave<T: Sample + Copy, F: Fn(T) -> f32>(
    out: &mut Vec<f32>,
    planes: AudioPlanes<T>,
    frames: usize,
    convert: F,
) {
    let num_channels = planes.planes().len();
    if num_channels == 0 || frames == 0 {
        return;
    }

    out.reserve(frames * num_channels);

    for frame in 0..frames {
        for ch in 0..num_channels {
            out.push(convert(planes.planes()[ch][frame]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::SILENT_CLIP_WAV;
    use hound::{SampleFormat, WavSpec, WavWriter};

    #[test]
    fn decodes_the_embedded_clip() {
        let clip = SilenceClip::decode(SILENT_CLIP_WAV).unwrap();

        assert_eq!(clip.sample_rate(), 44100);
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.samples().len(), 1);
        assert_eq!(clip.duration_ms(), 0);
        assert!(clip.is_silent());
    }

    #[test]
    fn decodes_a_generated_tone() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for n in 0..80 {
                let t = n as f32 / 8000.0;
                let value = (t * 440.0 * 2.0 * std::f32::consts::PI).sin();
                writer
                    .write_sample((value * i16::MAX as f32 * 0.5) as i16)
                    .unwrap();
            }
            writer.finalize().unwrap();
        }

        let clip = SilenceClip::decode(&cursor.into_inner()).unwrap();

        assert_eq!(clip.sample_rate(), 8000);
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.samples().len(), 80);
        assert!(!clip.is_silent());
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(SilenceClip::decode(b"definitely not audio").is_err());
    }
}
