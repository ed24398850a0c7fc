//! Reconstruction stage gate

use super::thresholds::ReconThresholds;
use super::{GateResult, GateStatus, QualityGate, Verdict};
use crate::models::ReconReport;
use serde_json::json;

/// Judges tracking, alignment, drift and mesh density of a reconstruction
#[derive(Debug, Clone, Default)]
pub struct ReconGate {
    thresholds: ReconThresholds,
}

/// Higher-is-better tiering: PASS at or above `pass`, WARN at or above `warn`
fn at_least(value: f64, pass: f64, warn: f64) -> GateStatus {
    if value >= pass {
        GateStatus::Pass
    } else if value >= warn {
        GateStatus::Warn
    } else {
        GateStatus::Fail
    }
}

/// Lower-is-better tiering: PASS at or below `pass`, WARN at or below `warn`
fn at_most(value: f64, pass: f64, warn: f64) -> GateStatus {
    if value <= pass {
        GateStatus::Pass
    } else if value <= warn {
        GateStatus::Warn
    } else {
        GateStatus::Fail
    }
}

impl ReconGate {
    pub fn new(thresholds: ReconThresholds) -> Self {
        Self { thresholds }
    }

    pub fn config(&self) -> &ReconThresholds {
        &self.thresholds
    }
}

impl QualityGate for ReconGate {
    type Metrics = ReconReport;

    fn name(&self) -> &'static str {
        "reconstruct"
    }

    fn evaluate(&self, r: &ReconReport) -> GateResult {
        let t = &self.thresholds;
        let mut verdict = Verdict::new();

        match at_least(
            r.tracking_success_rate,
            t.tracking_success_rate_pass,
            t.tracking_success_rate_warn,
        ) {
            GateStatus::Pass => {}
            GateStatus::Warn => verdict.raise(
                GateStatus::Warn,
                "tracking_success_rate_low",
                format!(
                    "Tracking success rate ({:.1}%) is below optimal. Capture with more overlap between frames.",
                    r.tracking_success_rate * 100.0
                ),
            ),
            GateStatus::Fail => verdict.raise(
                GateStatus::Fail,
                "tracking_success_rate_critical",
                format!(
                    "Tracking success rate ({:.1}%) is critically low. Recapture with slower, smoother camera motion.",
                    r.tracking_success_rate * 100.0
                ),
            ),
        }

        match at_most(r.alignment_rmse_mean, t.alignment_rmse_pass, t.alignment_rmse_warn) {
            GateStatus::Pass => {}
            GateStatus::Warn => verdict.raise(
                GateStatus::Warn,
                "alignment_rmse_high",
                format!(
                    "Alignment RMSE ({:.1} mm) is above optimal. Add texture or geometric features to the scene.",
                    r.alignment_rmse_mean * 1000.0
                ),
            ),
            GateStatus::Fail => verdict.raise(
                GateStatus::Fail,
                "alignment_rmse_critical",
                format!(
                    "Alignment RMSE ({:.1} mm) is too high. Check depth quality and recapture.",
                    r.alignment_rmse_mean * 1000.0
                ),
            ),
        }

        match at_most(r.drift_indicator, t.drift_indicator_pass, t.drift_indicator_warn) {
            GateStatus::Pass => {}
            GateStatus::Warn => verdict.raise(
                GateStatus::Warn,
                "drift_indicator_high",
                format!(
                    "Drift ({:.1} mm) is above optimal. End the capture near its starting viewpoint.",
                    r.drift_indicator * 1000.0
                ),
            ),
            GateStatus::Fail => verdict.raise(
                GateStatus::Fail,
                "drift_indicator_critical",
                format!(
                    "Drift ({:.1} mm) is too high. Recapture with a closed loop around the object.",
                    r.drift_indicator * 1000.0
                ),
            ),
        }

        if r.mesh_triangles < t.min_mesh_triangles {
            verdict.raise(
                GateStatus::Fail,
                "mesh_triangles_low",
                format!(
                    "Mesh has only {} triangles (minimum {}). Check masks and capture more frames.",
                    r.mesh_triangles, t.min_mesh_triangles
                ),
            );
        }

        verdict.finish(self.name())
    }

    fn thresholds(&self) -> serde_json::Value {
        let t = &self.thresholds;
        json!({
            "tracking_success_rate_pass": t.tracking_success_rate_pass,
            "tracking_success_rate_warn": t.tracking_success_rate_warn,
            "alignment_rmse_pass": t.alignment_rmse_pass,
            "alignment_rmse_warn": t.alignment_rmse_warn,
            "drift_indicator_pass": t.drift_indicator_pass,
            "drift_indicator_warn": t.drift_indicator_warn,
            "min_mesh_triangles": t.min_mesh_triangles,
        })
    }
}
