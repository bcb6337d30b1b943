//! # label-printer
//!
//! Inventory label rendering and serialized print dispatch.
//!
//! ## Scope
//!
//! This crate handles the whole path from an inventory tag to paper:
//! - Label layout (QR, Code 128 barcode, one or two lines of text)
//! - Shrink-to-fit typography with a guaranteed size floor
//! - Mounting a label on a larger output sheet
//! - ZPL graphic encoding
//! - Network (TCP port 9100) and spool-directory printers
//! - A single-worker print queue with retry, backoff and a fail-safe clear
//!
//! Operator front-ends (command line, HTTP) stay in application code.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use label_printer::{
//!     InventoryItem, LabelGeometry, LabelService, LayoutEngine, LayoutOptions,
//!     PrintDispatchQueue, PrinterConfig, QueueConfig, SubmitLimits, Variant, connect_printer,
//! };
//!
//! let geometry = LabelGeometry::default();
//! let engine = LayoutEngine::new(geometry, LayoutOptions::default())?;
//! let printer = connect_printer(&PrinterConfig::default(), geometry.dpi)?;
//! let queue = PrintDispatchQueue::new(printer, QueueConfig::default())?;
//! let service = LabelService::new(Arc::new(engine), queue, SubmitLimits::default());
//!
//! let item = InventoryItem::from_input("A6500-01", "Sony A6500");
//! service.submit(&item, Variant::Qr, 2)?;
//! service.wait_idle().await;
//! ```

mod error;
mod geometry;
pub mod layout;
mod printer;
mod queue;
mod service;
mod types;
mod zpl;

// Re-exports
pub use error::{
    FailureKind, LabelError, PrintError, PrintResult, QueueError, SubmitError, SubmitResult,
};
pub use geometry::{LabelGeometry, LayoutRegions, Region, mm_to_px};
pub use layout::text::{MIN_FONT_PX, TextFit, shrink_to_fit};
pub use layout::{LayoutEngine, LayoutOptions, PlacedText, RenderReport, TextRole};
pub use printer::{NetworkPrinter, PrinterAdapter, PrinterConfig, SpoolPrinter, connect_printer};
pub use queue::{BackoffPolicy, Decision, PrintDispatchQueue, QueueConfig, QueueStats};
pub use service::{LabelService, SubmitLimits, Submission};
pub use types::{InventoryItem, LabelImage, PLACEHOLDER, PrintJob, Variant};
pub use zpl::{ZplBuilder, encode_label};
