//! Capture quality assessment
//!
//! Per-frame metrics (sharpness, depth validity, object occupancy) and the
//! session-level summary that feeds the capture gate.

pub mod frame;
pub mod session;

pub use frame::{DepthStatistics, FrameQuality, FrameQualityAnalyzer};
pub use session::{estimate_coverage, CaptureSummary};
