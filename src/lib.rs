//! ScanGate: depth conditioning, foreground segmentation and quality gates
//! for RGBD scan-to-asset pipelines.
//!
//! Raw captures are scored frame by frame, keyframes are cleaned up and
//! masked against the floor and background, and every pipeline stage is
//! judged PASS, WARN or FAIL with reasons and remediation hints. The stage
//! verdicts are merged into one report per project.
//!
//! # Features
//! - Laplacian sharpness, depth validity and occupancy scoring
//! - Median outlier removal and conservative hole filling of depth images
//! - Depth-band and RANSAC floor-plane foreground masks
//! - Capture, preprocess, reconstruction and asset gates with escalation
//! - Pipeline-wide aggregation over an ordered stage registry
//!
//! # Usage
//! ```rust
//! use scangate::gates::{CaptureGate, QualityGate};
//! use scangate::models::CaptureMetrics;
//!
//! let metrics = CaptureMetrics {
//!     num_frames_raw: 120,
//!     num_keyframes: 40,
//!     depth_valid_ratio_mean: 0.9,
//!     depth_valid_ratio_min: 0.8,
//!     blur_score_mean: 0.7,
//!     blur_score_min: 0.5,
//!     coverage_score: 0.9,
//!     capture_duration_sec: 60.0,
//!     ..CaptureMetrics::default()
//! };
//! let result = CaptureGate::default().evaluate(&metrics);
//! assert!(result.is_pass());
//! ```
pub mod config;
pub mod errors;
pub mod gates;
pub mod invariants;
pub mod models;
pub mod preprocess;
pub mod quality;
pub mod report;
pub mod types;

// Testing utilities - synthetic RGBD data for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::{AnalysisConfig, ScanGateConfig, SegmentationConfig};
pub use errors::{InputError, ScanGateError};
pub use gates::{
    AssetGate, CaptureGate, GateReport, GateResult, GateStatus, PreprocessGate, QualityGate,
    QualityThresholds, ReconGate,
};
pub use models::{
    AssetMetrics, CaptureMetrics, PreprocessMetrics, ReconReport, StageRecord, StageStatus,
};
pub use preprocess::{
    apply_mask, DepthConditioner, ForegroundSegmenter, MaskMethod, MaskedFrameRecord, Preprocessor,
};
pub use quality::{CaptureSummary, FrameQuality, FrameQualityAnalyzer};
pub use report::{GateAggregator, PipelineMetrics, QualityReport, StageRegistry};
pub use types::{CameraIntrinsics, DepthImage, Mask, RawFrame, RgbFrame};

/// Initialize logging, defaulting to `scangate=info` when `RUST_LOG` is unset
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "scangate=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "scangate");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_is_repeatable() {
        init_logging();
        init_logging();
        assert!(std::env::var("RUST_LOG").is_ok());
    }
}
