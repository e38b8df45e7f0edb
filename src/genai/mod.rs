//! # Generative AI Service Module
//!
//! Everything that talks to the hosted generative AI service: scene text,
//! images, long-running video jobs, structured evaluations and speech.
//!
//! ## Key Components:
//! - **Client**: The [`GenAiBackend`] trait and its reqwest implementation
//! - **Types**: Request/response wire types
//! - **Requests**: Builders for each call and extraction of their results
//! - **Poller**: Fixed-interval wait for long-running video jobs
//!
//! ## Error Policy:
//! Nothing in this module retries on error. The only repetition is the poller
//! re-checking a job that is still pending.

pub mod client;      // Backend trait + HTTP client
pub mod poller;      // Long-running operation wait
pub mod requests;    // Request builders and result extraction
pub mod types;       // Wire types

#[cfg(test)]
pub mod testing;

pub use client::{ApiCredential, GenAiBackend, GenAiError, GeminiClient};
pub use poller::OperationPoller;
