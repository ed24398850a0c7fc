//! Configuration management for scangate
//!
//! Provides loading, saving, and validation of frame-analysis parameters,
//! segmentation parameters, and the per-stage gate thresholds.

use crate::errors::{Result, ScanGateError};
use crate::gates::thresholds::QualityThresholds;
use crate::gates::{AssetGate, CaptureGate, PreprocessGate, ReconGate};
use crate::preprocess::{DepthConditioner, Preprocessor};
use crate::quality::FrameQualityAnalyzer;
use crate::report::{GateAggregator, PipelineMetrics, StageRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanGateConfig {
    pub analysis: AnalysisConfig,
    pub segmentation: SegmentationConfig,
    pub thresholds: QualityThresholds,
}

/// Per-frame quality analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Laplacian variance mapped to blur score 0.0
    pub blur_laplacian_low: f64,
    /// Laplacian variance mapped to blur score 1.0
    pub blur_laplacian_high: f64,
    /// Lower bound (exclusive) of the object depth range in mm
    pub occupancy_min_mm: u16,
    /// Upper bound (exclusive) of the object depth range in mm
    pub occupancy_max_mm: u16,
    /// Minimum depth valid ratio for a frame to become a keyframe
    pub keyframe_min_depth_valid_ratio: f64,
    /// Minimum blur score for a frame to become a keyframe
    pub keyframe_min_blur_score: f64,
    /// Number of azimuth bins used for coverage estimation
    pub coverage_azimuth_bins: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            blur_laplacian_low: 100.0,
            blur_laplacian_high: 500.0,
            occupancy_min_mm: 200,
            occupancy_max_mm: 1000,
            keyframe_min_depth_valid_ratio: 0.6,
            keyframe_min_blur_score: 0.5,
            coverage_azimuth_bins: 12,
        }
    }
}

/// Depth conditioning and foreground segmentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Foreground lower bound (exclusive) in mm
    pub depth_min_mm: u16,
    /// Foreground upper bound (exclusive) in mm
    pub depth_max_mm: u16,
    /// Fraction of image rows, counted from the bottom, searched for floor points
    pub floor_region_ratio: f64,
    /// RANSAC sample count
    pub ransac_iterations: u32,
    /// Point-to-plane distance (mm) under which a point is a floor inlier
    pub ransac_inlier_threshold: f64,
    /// Fixed RANSAC seed; `None` draws from the thread RNG
    pub ransac_seed: Option<u64>,
    /// Masked frames below this area ratio are invalid
    pub valid_mask_area_min: f64,
    /// Masked frames above this area ratio are invalid
    pub valid_mask_area_max: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            depth_min_mm: 200,
            depth_max_mm: 1000,
            floor_region_ratio: 0.3,
            ransac_iterations: 100,
            ransac_inlier_threshold: 10.0,
            ransac_seed: None,
            valid_mask_area_min: 0.05,
            valid_mask_area_max: 0.8,
        }
    }
}

impl ScanGateConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: ScanGateConfig = toml::from_str(&contents).map_err(|e| {
            ScanGateError::Config(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            ScanGateError::Config(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path, toml_string)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("scangate.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ScanGateError::Config(msg.to_string()));

        let a = &self.analysis;
        if a.blur_laplacian_high <= a.blur_laplacian_low {
            return invalid("blur_laplacian_high must exceed blur_laplacian_low");
        }
        if a.occupancy_max_mm <= a.occupancy_min_mm {
            return invalid("occupancy_max_mm must exceed occupancy_min_mm");
        }
        if !(0.0..=1.0).contains(&a.keyframe_min_depth_valid_ratio)
            || !(0.0..=1.0).contains(&a.keyframe_min_blur_score)
        {
            return invalid("keyframe floors must be between 0.0 and 1.0");
        }
        if a.coverage_azimuth_bins == 0 {
            return invalid("coverage_azimuth_bins must be at least 1");
        }

        let s = &self.segmentation;
        if s.depth_max_mm <= s.depth_min_mm {
            return invalid("depth_max_mm must exceed depth_min_mm");
        }
        if !(0.0..=1.0).contains(&s.floor_region_ratio) {
            return invalid("floor_region_ratio must be between 0.0 and 1.0");
        }
        if s.ransac_iterations == 0 {
            return invalid("ransac_iterations must be at least 1");
        }
        if s.ransac_inlier_threshold <= 0.0 {
            return invalid("ransac_inlier_threshold must be positive");
        }
        if !(0.0..=1.0).contains(&s.valid_mask_area_min)
            || !(0.0..=1.0).contains(&s.valid_mask_area_max)
            || s.valid_mask_area_min > s.valid_mask_area_max
        {
            return invalid("valid mask area range must be an ordered range within 0.0-1.0");
        }

        self.thresholds.validate().map_err(ScanGateError::Config)
    }
}

impl From<&ScanGateConfig> for FrameQualityAnalyzer {
    fn from(config: &ScanGateConfig) -> Self {
        FrameQualityAnalyzer::new(config.analysis.clone())
    }
}

impl From<&ScanGateConfig> for Preprocessor {
    fn from(config: &ScanGateConfig) -> Self {
        Preprocessor::new(DepthConditioner::default(), config.segmentation.clone())
    }
}

impl From<&ScanGateConfig> for CaptureGate {
    fn from(config: &ScanGateConfig) -> Self {
        CaptureGate::new(config.thresholds.capture.clone())
    }
}

impl From<&ScanGateConfig> for PreprocessGate {
    fn from(config: &ScanGateConfig) -> Self {
        PreprocessGate::new(config.thresholds.preprocess.clone())
    }
}

impl From<&ScanGateConfig> for ReconGate {
    fn from(config: &ScanGateConfig) -> Self {
        ReconGate::new(config.thresholds.reconstruct.clone())
    }
}

impl From<&ScanGateConfig> for AssetGate {
    fn from(config: &ScanGateConfig) -> Self {
        AssetGate::new(config.thresholds.asset.clone())
    }
}

impl From<&ScanGateConfig> for GateAggregator<PipelineMetrics> {
    fn from(config: &ScanGateConfig) -> Self {
        GateAggregator::new(StageRegistry::default(), config.thresholds.clone())
    }
}
