//! Progress-callback trait for generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to be told
//! when the provider call starts, when its response arrives, and how the
//! request ended. The CLI uses it to drive a spinner; a web front end could
//! push the same events to the browser.
//!
//! # Example
//!
//! ```rust
//! use edgequake_salonpost::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     responses: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_response(&self, raw_len: usize) {
//!         self.responses.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("response: {raw_len} chars");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { responses: AtomicUsize::new(0) });
//! let config = GenerationConfig::builder()
//!     .progress_callback(cb as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::attributes::Platform;
use crate::variation::VariationAngle;
use std::sync::Arc;

/// Called by [`crate::generate`] as a request moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called just before the provider request is sent.
    ///
    /// # Arguments
    /// * `platforms` — platforms requested in this generation
    /// * `angle`     — the opening framing asked for, if any
    fn on_generation_start(&self, platforms: &[Platform], angle: Option<VariationAngle>) {
        let _ = (platforms, angle);
    }

    /// Called when the provider has answered, before segmentation.
    ///
    /// # Arguments
    /// * `raw_len` — character count of the raw response
    fn on_response(&self, raw_len: usize) {
        let _ = raw_len;
    }

    /// Called when at least one caption was produced.
    ///
    /// # Arguments
    /// * `produced` — platforms with a caption
    /// * `missing`  — requested platforms whose section was absent
    fn on_generation_complete(&self, produced: &[Platform], missing: &[Platform]) {
        let _ = (produced, missing);
    }

    /// Called when the request failed and no caption was produced.
    fn on_generation_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        responses: AtomicUsize,
        errors: AtomicUsize,
        missing: Mutex<Vec<Platform>>,
    }

    impl GenerationProgressCallback for TrackingCallback {
        fn on_generation_start(&self, _platforms: &[Platform], _angle: Option<VariationAngle>) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_response(&self, _raw_len: usize) {
            self.responses.fetch_add(1, Ordering::SeqCst);
        }

        fn on_generation_complete(&self, _produced: &[Platform], missing: &[Platform]) {
            self.missing.lock().unwrap().extend_from_slice(missing);
        }

        fn on_generation_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_generation_start(&[Platform::Instagram], None);
        cb.on_response(120);
        cb.on_generation_complete(&[Platform::Instagram], &[]);
        cb.on_generation_error("quota exceeded");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_generation_start(
            &[Platform::Instagram, Platform::X],
            Some(VariationAngle::Season),
        );
        tracker.on_response(300);
        tracker.on_generation_complete(&[Platform::Instagram], &[Platform::X]);
        tracker.on_generation_start(&[Platform::X], None);
        tracker.on_generation_error("timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.responses.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.missing.lock().unwrap(), vec![Platform::X]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn GenerationProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_generation_start(&[Platform::X], Some(VariationAngle::FinishedLook));
        cb.on_response(64);
    }
}
