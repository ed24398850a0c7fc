//! Capture stage gate

use super::thresholds::CaptureThresholds;
use super::{GateResult, GateStatus, QualityGate, Verdict};
use crate::models::CaptureMetrics;
use serde_json::json;

/// Judges keyframe count, viewpoint coverage, depth validity and sharpness
#[derive(Debug, Clone, Default)]
pub struct CaptureGate {
    thresholds: CaptureThresholds,
}

impl CaptureGate {
    pub fn new(thresholds: CaptureThresholds) -> Self {
        Self { thresholds }
    }

    pub fn config(&self) -> &CaptureThresholds {
        &self.thresholds
    }

    /// Relative cutoff: FAIL below `fail_ratio * minimum`, WARN below
    /// `warn_ratio * minimum`.
    fn relative(&self, value: f64, minimum: f64) -> GateStatus {
        if value < minimum * self.thresholds.fail_ratio {
            GateStatus::Fail
        } else if value < minimum * self.thresholds.warn_ratio {
            GateStatus::Warn
        } else {
            GateStatus::Pass
        }
    }
}

impl QualityGate for CaptureGate {
    type Metrics = CaptureMetrics;

    fn name(&self) -> &'static str {
        "capture"
    }

    fn evaluate(&self, m: &CaptureMetrics) -> GateResult {
        let t = &self.thresholds;
        let mut verdict = Verdict::new();

        match self.relative(m.num_keyframes as f64, t.min_keyframes as f64) {
            GateStatus::Fail => verdict.raise(
                GateStatus::Fail,
                format!(
                    "Keyframe count critically low: {} (minimum {})",
                    m.num_keyframes, t.min_keyframes
                ),
                "Capture significantly more frames from varied viewpoints",
            ),
            GateStatus::Warn => verdict.raise(
                GateStatus::Warn,
                format!(
                    "Keyframe count below recommended: {} (minimum {})",
                    m.num_keyframes, t.min_keyframes
                ),
                "Capture additional frames to reach the recommended keyframe count",
            ),
            GateStatus::Pass => {}
        }

        match self.relative(m.coverage_score, t.min_coverage) {
            GateStatus::Fail => verdict.raise(
                GateStatus::Fail,
                format!(
                    "Coverage critically low: {:.2} (minimum {:.2})",
                    m.coverage_score, t.min_coverage
                ),
                "Walk around the object and capture from all sides",
            ),
            GateStatus::Warn => verdict.raise(
                GateStatus::Warn,
                format!(
                    "Coverage below recommended: {:.2} (minimum {:.2})",
                    m.coverage_score, t.min_coverage
                ),
                "Capture from the angles that are still missing",
            ),
            GateStatus::Pass => {}
        }

        if m.depth_valid_ratio_min < t.min_depth_valid_ratio * t.fail_ratio {
            verdict.raise(
                GateStatus::Fail,
                format!(
                    "Minimum depth valid ratio critically low: {:.2} (threshold {:.2})",
                    m.depth_valid_ratio_min,
                    t.min_depth_valid_ratio * t.fail_ratio
                ),
                "Keep the object within the depth sensor's working range",
            );
        }
        if m.depth_valid_ratio_mean < t.min_depth_valid_ratio {
            verdict.raise(
                GateStatus::Warn,
                format!(
                    "Mean depth valid ratio below threshold: {:.2} (minimum {:.2})",
                    m.depth_valid_ratio_mean, t.min_depth_valid_ratio
                ),
                "Avoid reflective or transparent surfaces and improve lighting",
            );
        }

        if m.blur_score_min < t.blur_fail_min {
            verdict.raise(
                GateStatus::Fail,
                format!(
                    "Minimum blur score critically low: {:.2} (threshold {:.2})",
                    m.blur_score_min, t.blur_fail_min
                ),
                "Hold the camera steady; some keyframes are too blurry",
            );
        }
        if m.blur_score_mean < t.blur_warn_mean {
            verdict.raise(
                GateStatus::Warn,
                format!(
                    "Mean blur score below threshold: {:.2} (minimum {:.2})",
                    m.blur_score_mean, t.blur_warn_mean
                ),
                "Move the camera more slowly to reduce motion blur",
            );
        }

        verdict.finish(self.name())
    }

    fn thresholds(&self) -> serde_json::Value {
        let t = &self.thresholds;
        json!({
            "min_frames": t.min_keyframes,
            "min_coverage": t.min_coverage,
            "min_depth_valid_ratio": t.min_depth_valid_ratio,
            "min_blur_score": t.blur_warn_mean,
            "blur_fail_score": t.blur_fail_min,
            "fail_ratio": t.fail_ratio,
            "warn_ratio": t.warn_ratio,
        })
    }
}
