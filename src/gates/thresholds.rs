//! Per-stage gate thresholds
//!
//! Loaded as the `[thresholds.*]` tables of the TOML configuration.

use serde::{Deserialize, Serialize};

/// Thresholds for every gate in the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub capture: CaptureThresholds,
    pub preprocess: PreprocessThresholds,
    pub reconstruct: ReconThresholds,
    pub asset: AssetThresholds,
}

/// Capture gate thresholds
///
/// Keyframe count and coverage use relative cutoffs: below
/// `fail_ratio * minimum` fails, below `warn_ratio * minimum` warns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureThresholds {
    pub min_keyframes: u32,
    pub min_coverage: f64,
    pub min_depth_valid_ratio: f64,
    /// Minimum blur score below which the capture fails
    pub blur_fail_min: f64,
    /// Mean blur score below which the capture warns
    pub blur_warn_mean: f64,
    pub fail_ratio: f64,
    pub warn_ratio: f64,
}

impl Default for CaptureThresholds {
    fn default() -> Self {
        Self {
            min_keyframes: 30,
            min_coverage: 0.8,
            min_depth_valid_ratio: 0.7,
            blur_fail_min: 0.3,
            blur_warn_mean: 0.5,
            fail_ratio: 0.5,
            warn_ratio: 0.8,
        }
    }
}

/// Preprocess gate thresholds: hard floors fail, ideal levels warn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessThresholds {
    pub min_valid_frames_ratio: f64,
    pub ideal_valid_frames_ratio: f64,
    pub min_mask_area_ratio: f64,
    pub ideal_mask_area_ratio: f64,
    pub max_mask_area_ratio_mean: f64,
}

impl Default for PreprocessThresholds {
    fn default() -> Self {
        Self {
            min_valid_frames_ratio: 0.8,
            ideal_valid_frames_ratio: 0.9,
            min_mask_area_ratio: 0.1,
            ideal_mask_area_ratio: 0.15,
            max_mask_area_ratio_mean: 0.9,
        }
    }
}

/// Reconstruction gate thresholds; distances in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconThresholds {
    pub tracking_success_rate_pass: f64,
    pub tracking_success_rate_warn: f64,
    pub alignment_rmse_pass: f64,
    pub alignment_rmse_warn: f64,
    pub drift_indicator_pass: f64,
    pub drift_indicator_warn: f64,
    pub min_mesh_triangles: u64,
}

impl Default for ReconThresholds {
    fn default() -> Self {
        Self {
            tracking_success_rate_pass: 0.9,
            tracking_success_rate_warn: 0.7,
            alignment_rmse_pass: 0.01,
            alignment_rmse_warn: 0.02,
            drift_indicator_pass: 0.05,
            drift_indicator_warn: 0.1,
            min_mesh_triangles: 1000,
        }
    }
}

/// Asset gate thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetThresholds {
    /// Triangle ceiling per LOD level, indexed by level
    pub lod_max_triangles: Vec<u64>,
    pub min_lod0_triangles: u64,
    pub hole_area_ratio_pass: f64,
    pub hole_area_ratio_warn: f64,
    pub non_manifold_edges_pass: u32,
    pub non_manifold_edges_warn: u32,
}

impl Default for AssetThresholds {
    fn default() -> Self {
        Self {
            lod_max_triangles: vec![100_000, 50_000, 10_000],
            min_lod0_triangles: 1000,
            hole_area_ratio_pass: 0.01,
            hole_area_ratio_warn: 0.05,
            non_manifold_edges_pass: 0,
            non_manifold_edges_warn: 10,
        }
    }
}

fn unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl QualityThresholds {
    /// Check that every pass/warn pair is ordered and ratios are in range
    pub fn validate(&self) -> Result<(), String> {
        let c = &self.capture;
        if c.min_keyframes == 0 {
            return Err("capture.min_keyframes must be at least 1".to_string());
        }
        if !unit(c.min_coverage) || !unit(c.min_depth_valid_ratio) {
            return Err("capture ratio thresholds must be between 0.0 and 1.0".to_string());
        }
        if !unit(c.fail_ratio) || !unit(c.warn_ratio) || c.fail_ratio > c.warn_ratio {
            return Err("capture.fail_ratio must not exceed capture.warn_ratio".to_string());
        }
        if c.blur_fail_min > c.blur_warn_mean {
            return Err("capture.blur_fail_min must not exceed capture.blur_warn_mean".to_string());
        }

        let p = &self.preprocess;
        if p.min_valid_frames_ratio > p.ideal_valid_frames_ratio {
            return Err(
                "preprocess.min_valid_frames_ratio must not exceed the ideal ratio".to_string(),
            );
        }
        if p.min_mask_area_ratio > p.ideal_mask_area_ratio {
            return Err(
                "preprocess.min_mask_area_ratio must not exceed the ideal ratio".to_string(),
            );
        }
        if !unit(p.ideal_valid_frames_ratio) || !unit(p.max_mask_area_ratio_mean) {
            return Err("preprocess ratio thresholds must be between 0.0 and 1.0".to_string());
        }

        let r = &self.reconstruct;
        if r.tracking_success_rate_warn > r.tracking_success_rate_pass {
            return Err(
                "reconstruct.tracking_success_rate_warn must not exceed the pass level".to_string(),
            );
        }
        if r.alignment_rmse_pass > r.alignment_rmse_warn {
            return Err(
                "reconstruct.alignment_rmse_pass must not exceed the warn level".to_string(),
            );
        }
        if r.drift_indicator_pass > r.drift_indicator_warn {
            return Err(
                "reconstruct.drift_indicator_pass must not exceed the warn level".to_string(),
            );
        }

        let a = &self.asset;
        if a.lod_max_triangles.is_empty() {
            return Err("asset.lod_max_triangles must list at least LOD0".to_string());
        }
        if a.hole_area_ratio_pass > a.hole_area_ratio_warn {
            return Err("asset.hole_area_ratio_pass must not exceed the warn level".to_string());
        }
        if a.non_manifold_edges_pass > a.non_manifold_edges_warn {
            return Err("asset.non_manifold_edges_pass must not exceed the warn level".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let thresholds = QualityThresholds::default();
        assert!(thresholds.validate().is_ok());
        assert_eq!(thresholds.asset.lod_max_triangles, vec![100_000, 50_000, 10_000]);
        assert_eq!(thresholds.reconstruct.min_mesh_triangles, 1000);
    }

    #[test]
    fn test_inverted_pairs_rejected() {
        let mut t = QualityThresholds::default();
        t.asset.hole_area_ratio_pass = 0.1;
        assert!(t.validate().unwrap_err().contains("hole_area_ratio"));

        let mut t = QualityThresholds::default();
        t.capture.fail_ratio = 0.9;
        assert!(t.validate().is_err());

        let mut t = QualityThresholds::default();
        t.preprocess.min_mask_area_ratio = 0.2;
        assert!(t.validate().is_err());
    }
}
