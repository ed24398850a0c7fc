//! Optimized asset gate

use super::thresholds::AssetThresholds;
use super::{GateResult, GateStatus, QualityGate, Verdict};
use crate::models::{AssetMetrics, ScaleUncertainty, RERUN_RECONSTRUCTION};
use serde_json::json;

/// Judges LOD triangle budgets, surface holes, topology and scale confidence
#[derive(Debug, Clone, Default)]
pub struct AssetGate {
    thresholds: AssetThresholds,
}

impl AssetGate {
    pub fn new(thresholds: AssetThresholds) -> Self {
        Self { thresholds }
    }

    pub fn config(&self) -> &AssetThresholds {
        &self.thresholds
    }

    fn check_lods(&self, m: &AssetMetrics, verdict: &mut Verdict) {
        let t = &self.thresholds;

        match m.lod(0) {
            None => verdict.raise(GateStatus::Fail, "lod0_missing", RERUN_RECONSTRUCTION),
            Some(lod0) if lod0.triangles < t.min_lod0_triangles => verdict.raise(
                GateStatus::Fail,
                "lod0_triangles_low",
                format!(
                    "LOD0 has only {} triangles (minimum {}). {}.",
                    lod0.triangles, t.min_lod0_triangles, RERUN_RECONSTRUCTION
                ),
            ),
            Some(_) => {}
        }

        for lod in &m.lod_metrics {
            let Some(&ceiling) = t.lod_max_triangles.get(lod.level as usize) else {
                continue;
            };
            if lod.triangles > ceiling {
                verdict.raise(
                    GateStatus::Warn,
                    format!("lod{}_triangles_exceeded", lod.level),
                    format!(
                        "LOD{} has {} triangles (budget {}). Increase simplification for this level.",
                        lod.level, lod.triangles, ceiling
                    ),
                );
            }
        }
    }
}

impl QualityGate for AssetGate {
    type Metrics = AssetMetrics;

    fn name(&self) -> &'static str {
        "optimize"
    }

    fn evaluate(&self, m: &AssetMetrics) -> GateResult {
        let t = &self.thresholds;
        let mut verdict = Verdict::new();

        self.check_lods(m, &mut verdict);

        if m.hole_area_ratio > t.hole_area_ratio_warn {
            verdict.raise(
                GateStatus::Fail,
                "hole_area_ratio_critical",
                format!(
                    "Hole area ratio ({:.1}%) is too high. Capture the missing areas and reconstruct again.",
                    m.hole_area_ratio * 100.0
                ),
            );
        } else if m.hole_area_ratio > t.hole_area_ratio_pass {
            verdict.raise(
                GateStatus::Warn,
                "hole_area_ratio_high",
                format!(
                    "Hole area ratio ({:.1}%) is above optimal. Consider hole filling or additional views.",
                    m.hole_area_ratio * 100.0
                ),
            );
        }

        if m.non_manifold_edges > t.non_manifold_edges_warn {
            verdict.raise(
                GateStatus::Fail,
                "non_manifold_edges_critical",
                format!(
                    "Mesh has {} non-manifold edges. Repair the mesh topology before export.",
                    m.non_manifold_edges
                ),
            );
        } else if m.non_manifold_edges > t.non_manifold_edges_pass {
            verdict.raise(
                GateStatus::Warn,
                "non_manifold_edges_present",
                format!(
                    "Mesh has {} non-manifold edges. Some engines may reject the asset.",
                    m.non_manifold_edges
                ),
            );
        }

        if m.scale_uncertainty == ScaleUncertainty::High {
            verdict.raise(
                GateStatus::Warn,
                "scale_uncertainty_high",
                "Scale is uncertain. Place a reference object of known size in the scene.",
            );
        }

        verdict.finish(self.name())
    }

    fn thresholds(&self) -> serde_json::Value {
        let t = &self.thresholds;
        json!({
            "lod_max_triangles": t.lod_max_triangles,
            "min_lod0_triangles": t.min_lod0_triangles,
            "hole_area_ratio_pass": t.hole_area_ratio_pass,
            "hole_area_ratio_warn": t.hole_area_ratio_warn,
            "non_manifold_edges_pass": t.non_manifold_edges_pass,
            "non_manifold_edges_warn": t.non_manifold_edges_warn,
        })
    }
}
