//! # Audio Context Lifecycle
//!
//! The speech endpoint decodes every clip through one shared [`AudioContext`].
//! The context is created the first time speech is requested and lives until
//! the server shuts down, at which point [`AudioContextHandle::close`] drops it.
//!
//! ## Lifecycle:
//! 1. **Absent**: Server started, no speech requested yet
//! 2. **Open**: Created by the first `get_or_create` call, reused afterwards
//! 3. **Closed**: `close` called during shutdown; later requests are rejected

use crate::audio::buffer::AudioBuffer;
use crate::audio::processor::{decode_base64_pcm16, DecodeError, PcmFormat};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Decoder state shared by every speech request.
#[derive(Debug)]
pub struct AudioContext {
    format: PcmFormat,
    buffers_decoded: AtomicU64,
}

impl AudioContext {
    fn new(format: PcmFormat) -> Self {
        Self {
            format,
            buffers_decoded: AtomicU64::new(0),
        }
    }

    pub fn buffers_decoded(&self) -> u64 {
        self.buffers_decoded.load(Ordering::Relaxed)
    }

    /// Decode a base64 PCM16 payload using this context's format.
    pub fn decode(&self, payload: &str) -> Result<AudioBuffer, DecodeError> {
        let buffer = decode_base64_pcm16(payload, self.format)?;
        self.buffers_decoded.fetch_add(1, Ordering::Relaxed);
        debug!(
            frames = buffer.frame_count(),
            channels = buffer.channels(),
            "Decoded speech payload"
        );
        Ok(buffer)
    }
}

#[derive(Debug)]
enum Slot {
    Absent,
    Open(Arc<AudioContext>),
    Closed,
}

/// Owner of the lazily created [`AudioContext`].
///
/// ## Rust Concepts:
/// - **Arc<Mutex<Slot>>**: Cheap to clone into every request handler while
///   keeping a single context for the whole process
/// - **Arc<AudioContext>**: Requests keep using their context even if shutdown
///   closes the slot mid-request
#[derive(Debug, Clone)]
pub struct AudioContextHandle {
    format: PcmFormat,
    slot: Arc<Mutex<Slot>>,
}

impl AudioContextHandle {
    pub fn new(format: PcmFormat) -> Self {
        Self {
            format,
            slot: Arc::new(Mutex::new(Slot::Absent)),
        }
    }

    /// Return the open context, creating it on first use.
    ///
    /// ## Returns:
    /// - **Some(context)**: The shared context
    /// - **None**: The handle has been closed for shutdown
    pub fn get_or_create(&self) -> Option<Arc<AudioContext>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            Slot::Open(context) => Some(context.clone()),
            Slot::Closed => None,
            Slot::Absent => {
                info!(
                    sample_rate = self.format.sample_rate,
                    channels = self.format.channels,
                    "Creating audio context"
                );
                let context = Arc::new(AudioContext::new(self.format));
                *slot = Slot::Open(context.clone());
                Some(context)
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.slot.lock().unwrap_or_else(PoisonError::into_inner), Slot::Open(_))
    }

    /// Dispose of the context. Safe to call more than once.
    pub fn close(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Slot::Open(context) = &*slot {
            info!(buffers_decoded = context.buffers_decoded(), "Closing audio context");
        }
        *slot = Slot::Closed;
    }
}
