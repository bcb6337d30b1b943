//! Label service - render and print calls over the engine and the queue

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{LabelError, QueueError, SubmitError, SubmitResult};
use crate::layout::LayoutEngine;
use crate::queue::{PrintDispatchQueue, QueueStats};
use crate::types::{InventoryItem, LabelImage, PrintJob, Variant};

/// Validation bounds for print submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitLimits {
    /// Inclusive upper bound of copies per submission
    pub max_copies: u32,
}

impl Default for SubmitLimits {
    fn default() -> Self {
        Self { max_copies: 9 }
    }
}

/// An accepted print submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub variant: Variant,
    /// One queue job per copy, in print order
    pub job_ids: Vec<u64>,
}

impl Submission {
    pub fn copies(&self) -> usize {
        self.job_ids.len()
    }
}

/// Label service
///
/// Responsibilities:
/// - Render previews (PNG, mounted on the configured sheet)
/// - Validate print requests before anything reaches the queue
/// - Enqueue one job per copy, all sharing one rendered image
#[derive(Clone)]
pub struct LabelService {
    engine: Arc<LayoutEngine>,
    queue: PrintDispatchQueue,
    limits: SubmitLimits,
}

impl LabelService {
    pub fn new(
        engine: Arc<LayoutEngine>,
        queue: PrintDispatchQueue,
        limits: SubmitLimits,
    ) -> Self {
        Self {
            engine,
            queue,
            limits,
        }
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    /// Render the label as printed, without encoding
    pub fn render(&self, item: &InventoryItem, variant: Variant) -> LabelImage {
        let label = self.engine.render(item, variant);
        self.engine.mount(&label)
    }

    /// Render the label as printed and encode it as PNG
    #[instrument(skip(self, item), fields(id = %item.id, variant = %variant))]
    pub fn preview(&self, item: &InventoryItem, variant: Variant) -> Result<Vec<u8>, LabelError> {
        self.render(item, variant).to_png()
    }

    /// Validate, render and enqueue `copies` jobs.
    ///
    /// Out-of-range copy counts are rejected without touching the queue.
    /// Printing itself is fire-and-forget: failures after acceptance are only
    /// visible in logs and [`LabelService::queue_stats`].
    #[instrument(skip(self, item), fields(id = %item.id, variant = %variant))]
    pub fn submit(
        &self,
        item: &InventoryItem,
        variant: Variant,
        copies: u32,
    ) -> SubmitResult<Submission> {
        if copies == 0 || copies > self.limits.max_copies {
            return Err(SubmitError::CopiesOutOfRange {
                requested: copies,
                max: self.limits.max_copies,
            });
        }
        if self.queue.is_shut_down() {
            return Err(QueueError::ShutDown.into());
        }

        let image = Arc::new(self.render(item, variant));
        let job_ids = self
            .queue
            .enqueue_all((0..copies).map(|_| PrintJob::new(Arc::clone(&image))))?;

        info!(copies, first_job = job_ids[0], "Print request accepted");
        Ok(Submission { variant, job_ids })
    }

    /// Same as [`LabelService::submit`] with the variant given by name
    pub fn submit_named(
        &self,
        item: &InventoryItem,
        variant: &str,
        copies: u32,
    ) -> SubmitResult<Submission> {
        let variant = variant.parse::<Variant>()?;
        self.submit(item, variant, copies)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await
    }

    pub async fn shutdown(&self) {
        self.queue.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintResult;
    use crate::geometry::LabelGeometry;
    use crate::layout::LayoutOptions;
    use crate::printer::PrinterAdapter;
    use crate::queue::QueueConfig;
    use async_trait::async_trait;

    struct Sink;

    #[async_trait]
    impl PrinterAdapter for Sink {
        async fn print(&self, _image: &LabelImage) -> PrintResult<()> {
            Ok(())
        }
    }

    fn service(geometry: LabelGeometry) -> LabelService {
        let engine = LayoutEngine::new(geometry, LayoutOptions::default()).unwrap();
        let queue = PrintDispatchQueue::new(Arc::new(Sink), QueueConfig::default()).unwrap();
        LabelService::new(Arc::new(engine), queue, SubmitLimits::default())
    }

    #[tokio::test]
    async fn test_rejects_copies_out_of_range() {
        let svc = service(LabelGeometry::default());
        let item = InventoryItem::new("A1", "Tripod");
        for copies in [0, 10, 15] {
            let err = svc.submit(&item, Variant::Text, copies).unwrap_err();
            assert!(err.is_rejection());
        }
        assert_eq!(svc.queue_stats().workers_spawned, 0);
        assert!(svc.submit(&item, Variant::Text, 9).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_variant_rejected() {
        let svc = service(LabelGeometry::default());
        let item = InventoryItem::new("A1", "Tripod");
        let err = svc.submit_named(&item, "hologram", 1).unwrap_err();
        assert!(matches!(err, SubmitError::UnknownVariant(_)));
        assert_eq!(svc.queue_stats().pending, 0);
    }

    #[tokio::test]
    async fn test_preview_is_mounted_png() {
        let svc = service(LabelGeometry::default().with_sheet(50.0, 50.0));
        let item = InventoryItem::new("A6500-01", "Sony A6500");
        let png = svc.preview(&item, Variant::Qr).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (399, 399));
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let svc = service(LabelGeometry::default());
        svc.shutdown().await;
        let err = svc
            .submit(&InventoryItem::new("A1", "Tripod"), Variant::Text, 1)
            .unwrap_err();
        assert!(matches!(err, SubmitError::Queue(_)));
        assert!(!err.is_rejection());
    }
}
