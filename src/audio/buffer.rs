//! # Decoded Audio Buffer
//!
//! Holds normalized floating-point audio split into one sequence per channel.
//! This is the shape the browser's audio output expects: it copies each channel
//! into its own playback buffer and plays them side by side.
//!
//! ## Layout:
//! - **channels**: Number of channels (1 = mono, 2 = stereo)
//! - **frame_count**: Samples per channel (every channel has exactly this many)
//! - **sample_rate**: Playback rate in Hz (24kHz for synthesized speech)
//! - **data**: `data[c][f]` is frame `f` of channel `c`, in [-1.0, 1.0)

use serde::Serialize;

/// Most channels a buffer may carry. Keeps WAV header fields inside u16.
pub const MAX_CHANNELS: u16 = 8;

/// A planar (non-interleaved) float audio buffer.
///
/// ## Rust Concepts:
/// - **Vec<Vec<f32>>**: One owned vector per channel, so each channel can be
///   borrowed independently as a `&[f32]`
/// - **Private fields**: Construction goes through `from_channels`, which keeps
///   the "all channels have the same length" rule in one place
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBuffer {
    channels: u16,
    frame_count: usize,
    sample_rate: u32,
    data: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample vectors.
    ///
    /// ## Returns:
    /// - **Some(buffer)**: All channels present and the same length
    /// - **None**: No channels, more than [`MAX_CHANNELS`], or channels of different lengths
    pub fn from_channels(sample_rate: u32, data: Vec<Vec<f32>>) -> Option<Self> {
        if data.len() > MAX_CHANNELS as usize {
            return None;
        }
        let frame_count = data.first()?.len();
        if data.iter().any(|channel| channel.len() != frame_count) {
            return None;
        }

        Some(Self {
            channels: data.len() as u16,
            frame_count,
            sample_rate,
            data,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Borrow the samples of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.data.get(index).map(Vec::as_slice)
    }

    /// Length of the clip in seconds.
    ///
    /// ## Calculation:
    /// Duration = frames per channel / sample_rate
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Re-interleave the channels (frame 0 of every channel, then frame 1, ...).
    ///
    /// ## Usage:
    /// Needed when writing the buffer back out as PCM or WAV.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frame_count * self.channels as usize);
        for frame in 0..self.frame_count {
            for channel in &self.data {
                out.push(channel[frame]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_channels_rejects_ragged_input() {
        assert!(AudioBuffer::from_channels(24000, vec![]).is_none());
        assert!(AudioBuffer::from_channels(24000, vec![vec![0.0; 3], vec![0.0; 2]]).is_none());
        assert!(AudioBuffer::from_channels(24000, vec![vec![0.0]; MAX_CHANNELS as usize + 1]).is_none());
    }

    #[test]
    fn test_duration_and_interleave() {
        let buffer = AudioBuffer::from_channels(4, vec![vec![0.1, 0.2], vec![-0.1, -0.2]]).unwrap();
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.duration_seconds(), 0.5);
        assert_eq!(buffer.interleaved(), vec![0.1, -0.1, 0.2, -0.2]);
        assert_eq!(buffer.channel(1), Some(&[-0.1f32, -0.2][..]));
        assert!(buffer.channel(2).is_none());
    }
}
