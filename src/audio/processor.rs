//! # Audio Decode Pipeline
//!
//! Turns the speech service's base64 payload (raw 16-bit little-endian PCM, no
//! header) into an [`AudioBuffer`] of normalized floats, and back again.
//!
//! ## Pipeline Steps:
//! 1. **Base64 decode**: text payload → raw bytes
//! 2. **PCM16 read**: bytes → signed 16-bit little-endian samples
//! 3. **De-interleave**: sample `i` belongs to channel `i % channels`
//! 4. **Normalize**: each sample divided by 32768 → [-1.0, 1.0)
//! 5. **Assemble**: one [`AudioBuffer`] with `floor(samples / channels)` frames
//!
//! Samples left over after the last complete frame are dropped, as is a
//! trailing odd byte. Neither is reported as an error.

use crate::audio::buffer::{AudioBuffer, MAX_CHANNELS};
use base64::{engine::general_purpose, Engine as _};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use thiserror::Error;

/// Divisor mapping the i16 range onto [-1.0, 1.0).
const PCM16_SCALE: f32 = 32768.0;

/// Errors produced while decoding an audio payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Audio payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
}

/// Format of a raw PCM16 payload.
///
/// ## Purpose:
/// Raw PCM carries no header, so the caller has to say how to read it.
/// Synthesized speech is 24kHz mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(DecodeError::InvalidFormat(format!(
                "channel count must be between 1 and {}",
                MAX_CHANNELS
            )));
        }
        if self.sample_rate == 0 {
            return Err(DecodeError::InvalidFormat("sample rate must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Decode a base64 PCM16 payload into a normalized multi-channel buffer.
///
/// ## Returns:
/// - **Ok(AudioBuffer)**: `format.channels` channels of equal length
/// - **Err(DecodeError::Base64)**: Payload is not base64
/// - **Err(DecodeError::InvalidFormat)**: Zero channels or zero sample rate
pub fn decode_base64_pcm16(payload: &str, format: PcmFormat) -> Result<AudioBuffer, DecodeError> {
    format.validate()?;
    let bytes = general_purpose::STANDARD.decode(payload.trim())?;
    decode_pcm16(&bytes, format)
}

/// Decode raw PCM16 bytes (steps 2-5 of the pipeline).
pub fn decode_pcm16(bytes: &[u8], format: PcmFormat) -> Result<AudioBuffer, DecodeError> {
    format.validate()?;

    let samples = read_samples(bytes);
    let channel_count = format.channels as usize;
    let frame_count = samples.len() / channel_count;

    let mut data: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frame_count))
        .collect();

    // Only whole frames are consumed; the remainder is truncated.
    for (i, &sample) in samples.iter().take(frame_count * channel_count).enumerate() {
        data[i % channel_count].push(normalize(sample));
    }

    AudioBuffer::from_channels(format.sample_rate, data)
        .ok_or_else(|| DecodeError::InvalidFormat("channels decoded with unequal lengths".to_string()))
}

/// Map one 16-bit sample onto [-1.0, 1.0).
pub fn normalize(sample: i16) -> f32 {
    sample as f32 / PCM16_SCALE
}

/// Encode interleaved float samples as base64 PCM16 (the inverse pipeline).
///
/// ## Conversion:
/// Each float is scaled by 32768, rounded, and clamped to the i16 range, so
/// `1.0` becomes 32767 rather than overflowing.
pub fn encode_pcm16_base64(samples: &[f32]) -> String {
    general_purpose::STANDARD.encode(encode_pcm16(samples))
}

/// Encode interleaved float samples as little-endian PCM16 bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample * PCM16_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }
    bytes
}

/// Render a decoded buffer as a 16-bit PCM WAV file.
///
/// ## Layout:
/// Standard 44-byte RIFF header (`fmt ` chunk with PCM format tag 1) followed
/// by the interleaved samples in a `data` chunk.
pub fn render_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let pcm = encode_pcm16(&buffer.interleaved());
    let channels = buffer.channels();
    let bits_per_sample: u16 = 16;
    // channels <= MAX_CHANNELS, so this stays well inside u16.
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = buffer.sample_rate() * u32::from(block_align);
    let data_size = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(&pcm);
    wav
}

/// Read every complete little-endian i16 from the byte slice.
fn read_samples(bytes: &[u8]) -> Vec<i16> {
    let mut cursor = Cursor::new(bytes);
    let mut samples = Vec::with_capacity(bytes.len() / 2);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample);
    }
    samples
}
