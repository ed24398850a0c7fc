//! Preprocess stage gate
//!
//! Hard failures mean the masked frames are unusable, so evaluation stops at
//! the first one. Only when none trip are the softer warnings accumulated.

use super::thresholds::PreprocessThresholds;
use super::{GateResult, GateStatus, QualityGate, Verdict};
use crate::models::PreprocessMetrics;
use serde_json::json;

#[derive(Debug, Clone, Default)]
pub struct PreprocessGate {
    thresholds: PreprocessThresholds,
}

impl PreprocessGate {
    pub fn new(thresholds: PreprocessThresholds) -> Self {
        Self { thresholds }
    }

    pub fn config(&self) -> &PreprocessThresholds {
        &self.thresholds
    }

    fn hard_failure(&self, m: &PreprocessMetrics) -> Option<(&'static str, String)> {
        let t = &self.thresholds;
        if m.num_output_frames == 0 {
            return Some((
                "no_output_frames",
                "No frames were processed successfully. Check that keyframes exist and raw frame data is valid.".to_string(),
            ));
        }
        if m.valid_frames_ratio < t.min_valid_frames_ratio {
            return Some((
                "low_valid_frames_ratio",
                format!(
                    "Valid frames ratio ({}) is below threshold ({}). Check lighting conditions and object placement.",
                    percent(m.valid_frames_ratio),
                    percent(t.min_valid_frames_ratio)
                ),
            ));
        }
        if m.mask_area_ratio_min < t.min_mask_area_ratio {
            return Some((
                "mask_area_too_small",
                format!(
                    "Minimum mask area ratio ({}) is too small. The object may be too far from the camera or depth thresholds need adjustment.",
                    percent(m.mask_area_ratio_min)
                ),
            ));
        }
        if m.mask_area_ratio_mean > t.max_mask_area_ratio_mean {
            return Some((
                "mask_area_too_large",
                format!(
                    "Mean mask area ratio ({}) is too large. The object may be too close or depth thresholds need adjustment.",
                    percent(m.mask_area_ratio_mean)
                ),
            ));
        }
        None
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

impl QualityGate for PreprocessGate {
    type Metrics = PreprocessMetrics;

    fn name(&self) -> &'static str {
        "preprocess"
    }

    fn evaluate(&self, m: &PreprocessMetrics) -> GateResult {
        let t = &self.thresholds;
        let mut verdict = Verdict::new();

        if let Some((reason, suggestion)) = self.hard_failure(m) {
            verdict.raise(GateStatus::Fail, reason, suggestion);
            return verdict.finish(self.name());
        }

        if m.valid_frames_ratio < t.ideal_valid_frames_ratio {
            verdict.raise(
                GateStatus::Warn,
                "valid_frames_ratio_warn",
                format!(
                    "Valid frames ratio ({}) is below optimal ({}). Consider recapturing with better lighting.",
                    percent(m.valid_frames_ratio),
                    percent(t.ideal_valid_frames_ratio)
                ),
            );
        }
        if m.mask_area_ratio_min < t.ideal_mask_area_ratio {
            verdict.raise(
                GateStatus::Warn,
                "mask_area_min_warn",
                format!(
                    "Minimum mask area ratio ({}) is below optimal ({}). Some frames may have poor segmentation.",
                    percent(m.mask_area_ratio_min),
                    percent(t.ideal_mask_area_ratio)
                ),
            );
        }

        verdict.finish(self.name())
    }

    fn thresholds(&self) -> serde_json::Value {
        let t = &self.thresholds;
        json!({
            "min_valid_frames_ratio": t.min_valid_frames_ratio,
            "warn_valid_frames_ratio": t.ideal_valid_frames_ratio,
            "min_mask_area_ratio": t.min_mask_area_ratio,
            "warn_mask_area_min": t.ideal_mask_area_ratio,
            "max_mask_area_ratio": t.max_mask_area_ratio_mean,
        })
    }
}
