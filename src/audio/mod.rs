//! # Audio Module
//!
//! Decodes synthesized speech for playback in the browser.
//!
//! ## Key Components:
//! - **Audio Buffer**: Planar float buffer, one sequence per channel
//! - **Audio Processor**: base64 → PCM16 → normalized float pipeline (and back)
//! - **Audio Context**: Lazily created, process-wide decoder with explicit shutdown
//!
//! ## Speech Audio Format:
//! - **Sample Rate**: 24kHz (24,000 Hz)
//! - **Bit Depth**: 16-bit PCM, little-endian signed integers
//! - **Channels**: Mono (1 channel)
//! - **Container**: None (raw samples, base64 encoded)

pub mod buffer;       // Planar float audio buffer
pub mod context;      // Shared decoder lifecycle
pub mod processor;    // Decode / encode pipeline

pub use buffer::AudioBuffer;
pub use context::AudioContextHandle;
pub use processor::{DecodeError, PcmFormat};
