//! Progress-callback trait for per-image extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch runner works through the folder.
//!
//! # Example
//!
//! ```rust
//! use edgequake_contacts::{ExtractionProgressCallback, ExtractionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, path: &Path, fields: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {} ({fields} fields)", path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch runner as it processes each image.
///
/// Images are processed one at a time, so events arrive strictly in order.
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the folder has been listed.
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before an image is encoded and sent.
    ///
    /// `index` is 1-based.
    fn on_image_start(&self, index: usize, total_images: usize, path: &Path) {
        let _ = (index, total_images, path);
    }

    /// Called when an image produced a record.
    ///
    /// `filled_fields` counts the non-empty values in the record.
    fn on_image_complete(&self, index: usize, total_images: usize, path: &Path, filled_fields: usize) {
        let _ = (index, total_images, path, filled_fields);
    }

    /// Called when an image yielded no record.
    fn on_image_error(&self, index: usize, total_images: usize, path: &Path, error: &str) {
        let _ = (index, total_images, path, error);
    }

    /// Called once after every image has been attempted, before export.
    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let _ = (total_images, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        success_total: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_image_start(&self, _index: usize, _total: usize, _path: &Path) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _index: usize, _total: usize, _path: &Path, _fields: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_error(&self, _index: usize, _total: usize, _path: &Path, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.success_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let p = Path::new("images/a.png");
        cb.on_batch_start(2);
        cb.on_image_start(1, 2, p);
        cb.on_image_complete(1, 2, p, 5);
        cb.on_image_error(2, 2, p, "no JSON");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let p = Path::new("x.jpg");

        tracker.on_image_start(1, 2, p);
        tracker.on_image_complete(1, 2, p, 12);
        tracker.on_image_start(2, 2, p);
        tracker.on_image_error(2, 2, p, "timeout");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.success_total.load(Ordering::SeqCst), 1);
    }
}
