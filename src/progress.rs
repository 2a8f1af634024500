//! Progress-callback trait for streamed generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to see
//! the report as it is written: every text fragment from the model is
//! handed to [`GenerationProgressCallback::on_chunk`] before the full
//! text is assembled and turned into a document.
//!
//! # Example
//!
//! ```rust
//! use edgequake_reportgen::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CharCounter {
//!     chars: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CharCounter {
//!     fn on_chunk(&self, _index: usize, chunk: &str, _total_len: usize) {
//!         self.chars.fetch_add(chunk.chars().count(), Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CharCounter { chars: AtomicUsize::new(0) });
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline as fragments arrive.
///
/// Implementations must be `Send + Sync` so the config holding them can
/// move across tasks. All methods have default no-op implementations so
/// callers only override what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once, right before the request is sent to the model.
    fn on_generation_start(&self) {}

    /// Called for every non-empty fragment, in arrival order.
    ///
    /// # Arguments
    /// * `index`     : 0-based fragment index
    /// * `chunk`     : the fragment text
    /// * `total_len` : byte length of all text received so far,
    ///   this fragment included
    fn on_chunk(&self, index: usize, chunk: &str, total_len: usize) {
        let _ = (index, chunk, total_len);
    }

    /// Called once after the last fragment.
    ///
    /// # Arguments
    /// * `chunks`    : number of fragments received
    /// * `total_len` : byte length of the full generated text
    fn on_generation_complete(&self, chunks: usize, total_len: usize) {
        let _ = (chunks, total_len);
    }

    /// Called when generation fails; no completion event follows.
    fn on_generation_error(&self, error: String) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
#[derive(Debug, Default)]
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
