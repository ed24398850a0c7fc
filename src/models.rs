//! Stage metric records
//!
//! Flat, serde-serializable records exchanged with the storage layer. Every
//! record carries a `gate_status` string (`pending`, `pass`, `warn`, `fail`)
//! and a `gate_reasons` list; both field names and value sets are stable
//! because stored records are reloaded across runs.

use crate::gates::thresholds::QualityThresholds;
use crate::gates::{GateResult, GateStatus};
use crate::preprocess::MaskMethod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted gate status of a stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Pending,
    Pass,
    Warn,
    Fail,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Pass => "pass",
            StageStatus::Warn => "warn",
            StageStatus::Fail => "fail",
        }
    }

    /// Gate verdict, or `None` while the stage has not been evaluated
    pub fn verdict(&self) -> Option<GateStatus> {
        match self {
            StageStatus::Pending => None,
            StageStatus::Pass => Some(GateStatus::Pass),
            StageStatus::Warn => Some(GateStatus::Warn),
            StageStatus::Fail => Some(GateStatus::Fail),
        }
    }
}

impl From<GateStatus> for StageStatus {
    fn from(status: GateStatus) -> Self {
        match status {
            GateStatus::Pass => StageStatus::Pass,
            GateStatus::Warn => StageStatus::Warn,
            GateStatus::Fail => StageStatus::Fail,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage's metrics record as seen by the aggregator
pub trait StageRecord {
    fn gate_status(&self) -> StageStatus;

    fn gate_reasons(&self) -> &[String];

    fn set_gate_result(&mut self, status: StageStatus, reasons: Vec<String>);

    /// Remediation hints derived from the raw metric values
    fn suggestions(&self, thresholds: &QualityThresholds) -> Vec<String>;

    /// Copy a verdict's status and reasons into the record
    fn with_gate_result(mut self, result: &GateResult) -> Self
    where
        Self: Sized,
    {
        self.set_gate_result(result.status().into(), result.reasons().to_vec());
        self
    }
}

macro_rules! impl_gate_fields {
    () => {
        fn gate_status(&self) -> StageStatus {
            self.gate_status
        }

        fn gate_reasons(&self) -> &[String] {
            &self.gate_reasons
        }

        fn set_gate_result(&mut self, status: StageStatus, reasons: Vec<String>) {
            self.gate_status = status;
            self.gate_reasons = reasons;
        }
    };
}

pub(crate) const RERUN_RECONSTRUCTION: &str =
    "Re-run reconstruction with more frames to increase mesh detail";

/// Summary of a capture session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetrics {
    pub num_frames_raw: u32,
    pub num_keyframes: u32,
    pub depth_valid_ratio_mean: f64,
    pub depth_valid_ratio_min: f64,
    pub blur_score_mean: f64,
    pub blur_score_min: f64,
    /// Viewpoint coverage uniformity in [0, 1]
    pub coverage_score: f64,
    pub capture_duration_sec: f64,
    #[serde(default)]
    pub gate_status: StageStatus,
    #[serde(default)]
    pub gate_reasons: Vec<String>,
}

impl StageRecord for CaptureMetrics {
    impl_gate_fields!();

    fn suggestions(&self, thresholds: &QualityThresholds) -> Vec<String> {
        let t = &thresholds.capture;
        let mut hints = Vec::new();
        if self.num_keyframes < t.min_keyframes {
            hints.push(format!(
                "Capture more keyframes ({} of {} required)",
                self.num_keyframes, t.min_keyframes
            ));
        }
        if self.coverage_score < t.min_coverage {
            hints.push(
                "Improve viewpoint coverage by capturing from more angles around the object".to_string(),
            );
        }
        if self.depth_valid_ratio_mean < t.min_depth_valid_ratio {
            hints.push(
                "Improve depth validity: keep the object within sensor range and avoid reflective surfaces".to_string(),
            );
        }
        if self.blur_score_mean < t.blur_warn_mean || self.blur_score_min < t.blur_fail_min {
            hints.push("Reduce motion blur by moving the camera more slowly".to_string());
        }
        hints
    }
}

/// Aggregate statistics of the masking pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessMetrics {
    pub num_input_frames: u32,
    pub num_output_frames: u32,
    pub mask_method: MaskMethod,
    pub mask_area_ratio_mean: f64,
    pub mask_area_ratio_min: f64,
    pub valid_frames_ratio: f64,
    #[serde(default)]
    pub gate_status: StageStatus,
    #[serde(default)]
    pub gate_reasons: Vec<String>,
}

impl StageRecord for PreprocessMetrics {
    impl_gate_fields!();

    fn suggestions(&self, thresholds: &QualityThresholds) -> Vec<String> {
        let t = &thresholds.preprocess;
        let mut hints = Vec::new();
        if self.num_output_frames == 0 {
            hints.push("Check that keyframes exist and raw frame data is readable".to_string());
            return hints;
        }
        if self.valid_frames_ratio < t.ideal_valid_frames_ratio {
            hints.push("Adjust the depth range or lighting to improve segmentation".to_string());
        }
        if self.mask_area_ratio_min < t.ideal_mask_area_ratio {
            hints.push("Move the camera closer so the object fills more of the frame".to_string());
        }
        if self.mask_area_ratio_mean > t.max_mask_area_ratio_mean {
            hints.push("Move the camera further away or tighten the depth range".to_string());
        }
        hints
    }
}

/// Estimated camera pose of one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub frame_id: u32,
    /// Row-major 4x4 camera-to-world transform
    pub transformation: [[f64; 4]; 4],
    pub fitness: f64,
    pub inlier_rmse: f64,
}

/// Reconstruction outcome reported by the external reconstructor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconReport {
    pub num_frames_used: u32,
    pub tracking_success_rate: f64,
    /// Meters
    pub alignment_rmse_mean: f64,
    /// Meters
    pub alignment_rmse_max: f64,
    /// Meters
    pub drift_indicator: f64,
    #[serde(default)]
    pub poses: Vec<PoseEstimate>,
    pub tsdf_voxel_size: f64,
    pub mesh_vertices: u64,
    pub mesh_triangles: u64,
    pub processing_time_sec: f64,
    #[serde(default)]
    pub gate_status: StageStatus,
    #[serde(default)]
    pub gate_reasons: Vec<String>,
}

impl StageRecord for ReconReport {
    impl_gate_fields!();

    fn suggestions(&self, thresholds: &QualityThresholds) -> Vec<String> {
        let t = &thresholds.reconstruct;
        let mut hints = Vec::new();
        if self.tracking_success_rate < t.tracking_success_rate_pass {
            hints.push(
                "Capture with more overlap between consecutive frames to improve tracking".to_string(),
            );
        }
        if self.alignment_rmse_mean > t.alignment_rmse_pass {
            hints.push(
                "Add surface texture or features to the scene to improve alignment".to_string(),
            );
        }
        if self.drift_indicator > t.drift_indicator_pass {
            hints.push("Finish the capture loop where it started to reduce drift".to_string());
        }
        if self.mesh_triangles < t.min_mesh_triangles {
            hints.push(RERUN_RECONSTRUCTION.to_string());
        }
        hints
    }
}

/// Geometry statistics of one level of detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodMetrics {
    /// 0 is the highest detail
    pub level: u32,
    pub triangles: u64,
    pub vertices: u64,
    pub file_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionMetrics {
    /// `convex_hull` or `vhacd`
    pub method: String,
    pub num_convex_parts: u32,
    pub total_triangles: u64,
}

impl Default for CollisionMetrics {
    fn default() -> Self {
        Self {
            method: "convex_hull".to_string(),
            num_convex_parts: 1,
            total_triangles: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleUncertainty {
    #[default]
    Low,
    Medium,
    High,
}

/// Quality of the optimized, game-ready asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub lod_metrics: Vec<LodMetrics>,
    pub collision_metrics: CollisionMetrics,
    /// Axis-aligned bounding box extent in meters
    pub aabb_size: [f64; 3],
    /// Oriented bounding box extent in meters
    pub obb_size: [f64; 3],
    pub hole_area_ratio: f64,
    pub non_manifold_edges: u32,
    pub texture_resolution: u32,
    pub texture_coverage: f64,
    pub scale_uncertainty: ScaleUncertainty,
    #[serde(default)]
    pub gate_status: StageStatus,
    #[serde(default)]
    pub gate_reasons: Vec<String>,
}

impl AssetMetrics {
    pub fn lod(&self, level: u32) -> Option<&LodMetrics> {
        self.lod_metrics.iter().find(|lod| lod.level == level)
    }
}

impl StageRecord for AssetMetrics {
    impl_gate_fields!();

    fn suggestions(&self, thresholds: &QualityThresholds) -> Vec<String> {
        let t = &thresholds.asset;
        let mut hints = Vec::new();
        let lod0 = self.lod(0).map_or(0, |lod| lod.triangles);
        if lod0 < t.min_lod0_triangles {
            hints.push(RERUN_RECONSTRUCTION.to_string());
        }
        let over_budget = self.lod_metrics.iter().any(|lod| {
            t.lod_max_triangles
                .get(lod.level as usize)
                .is_some_and(|&ceiling| lod.triangles > ceiling)
        });
        if over_budget {
            hints.push("Increase mesh simplification to meet the LOD triangle budgets".to_string());
        }
        if self.hole_area_ratio > t.hole_area_ratio_pass {
            hints.push("Capture the missing areas of the object to close mesh holes".to_string());
        }
        if self.non_manifold_edges > t.non_manifold_edges_pass {
            hints.push("Repair mesh topology to remove non-manifold edges".to_string());
        }
        if self.scale_uncertainty == ScaleUncertainty::High {
            hints.push("Place a scale reference of known size in the scene".to_string());
        }
        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::Verdict;

    #[test]
    fn test_stage_status_wire_format() {
        assert_eq!(serde_json::to_string(&StageStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&StageStatus::Fail).unwrap(), "\"fail\"");
        let status: StageStatus = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(status, StageStatus::Warn);
        assert_eq!(status.verdict(), Some(GateStatus::Warn));
        assert_eq!(StageStatus::Pending.verdict(), None);
    }

    #[test]
    fn test_record_defaults_to_pending() {
        let json = r#"{
            "num_frames_raw": 10, "num_keyframes": 5,
            "depth_valid_ratio_mean": 0.9, "depth_valid_ratio_min": 0.8,
            "blur_score_mean": 0.7, "blur_score_min": 0.6,
            "coverage_score": 0.9, "capture_duration_sec": 12.0
        }"#;
        let metrics: CaptureMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.gate_status, StageStatus::Pending);
        assert!(metrics.gate_reasons.is_empty());
    }

    #[test]
    fn test_with_gate_result_copies_status_and_reasons() {
        let mut verdict = Verdict::new();
        verdict.raise(GateStatus::Warn, "coverage_low", "capture more views");
        let result = verdict.finish("capture");

        let metrics = CaptureMetrics::default().with_gate_result(&result);
        assert_eq!(metrics.gate_status, StageStatus::Warn);
        assert_eq!(metrics.gate_reasons, vec!["coverage_low".to_string()]);

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["gate_status"], "warn");
        assert_eq!(json["gate_reasons"][0], "coverage_low");
    }

    #[test]
    fn test_asset_lod_lookup_and_scale_wire_format() {
        let asset = AssetMetrics {
            lod_metrics: vec![LodMetrics {
                level: 1,
                triangles: 20_000,
                vertices: 10_000,
                file_size_bytes: 1024,
            }],
            scale_uncertainty: ScaleUncertainty::High,
            ..AssetMetrics::default()
        };
        assert!(asset.lod(0).is_none());
        assert_eq!(asset.lod(1).map(|l| l.triangles), Some(20_000));

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["scale_uncertainty"], "high");
    }

    #[test]
    fn test_suggestions_follow_raw_metrics() {
        let thresholds = QualityThresholds::default();
        let capture = CaptureMetrics {
            num_keyframes: 40,
            coverage_score: 0.5,
            depth_valid_ratio_mean: 0.9,
            blur_score_mean: 0.8,
            blur_score_min: 0.6,
            ..CaptureMetrics::default()
        };
        let hints = capture.suggestions(&thresholds);
        assert_eq!(hints.len(), 1);
        assert!(hints[0].to_lowercase().contains("coverage"));

        let recon = ReconReport {
            tracking_success_rate: 0.95,
            mesh_triangles: 10,
            ..ReconReport::default()
        };
        assert_eq!(recon.suggestions(&thresholds), vec![RERUN_RECONSTRUCTION.to_string()]);
    }
}
