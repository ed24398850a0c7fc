//! Single-frame quality analysis
//!
//! Blur is scored from the variance of a 5-point Laplacian over the luminance
//! plane; depth validity and object occupancy are plain pixel ratios.

use crate::config::AnalysisConfig;
use crate::errors::InputError;
use crate::invariants::check_unit_ratio;
use crate::types::{reflect_index, DepthImage, RawFrame, RgbFrame};
use serde::{Deserialize, Serialize};

/// Quality metrics attached to one captured frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameQuality {
    pub depth_valid_ratio: f64,
    /// 0.0 = blurry, 1.0 = sharp
    pub blur_score: f64,
    pub object_occupancy: f64,
    pub is_keyframe: bool,
}

/// Summary statistics over the valid (non-zero) depth readings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthStatistics {
    pub valid_ratio: f64,
    pub mean_depth_mm: f64,
    pub std_depth_mm: f64,
    pub min_depth_mm: f64,
    pub max_depth_mm: f64,
}

/// Computes blur, depth validity and occupancy for RGB + depth pairs
#[derive(Debug, Clone, Default)]
pub struct FrameQualityAnalyzer {
    config: AnalysisConfig,
}

impl FrameQualityAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Sharpness in [0, 1]: Laplacian variance linearly mapped from
    /// [blur_laplacian_low, blur_laplacian_high] and clamped.
    pub fn blur_score(&self, rgb: &RgbFrame) -> Result<f64, InputError> {
        let variance = laplacian_variance(rgb)?;
        let low = self.config.blur_laplacian_low;
        let high = self.config.blur_laplacian_high;
        Ok(((variance - low) / (high - low)).clamp(0.0, 1.0))
    }

    /// Fraction of pixels with a non-zero depth reading
    pub fn depth_valid_ratio(&self, depth: &DepthImage) -> Result<f64, InputError> {
        if depth.is_empty() {
            return Err(InputError::Empty("depth image"));
        }
        let valid = depth.data().iter().filter(|&&d| d > 0).count();
        Ok(valid as f64 / depth.len() as f64)
    }

    /// Fraction of pixels with `min_mm < depth < max_mm`.
    ///
    /// Zero depth is never in range, even when `min_mm` is zero.
    pub fn object_occupancy(
        &self,
        depth: &DepthImage,
        min_mm: u16,
        max_mm: u16,
    ) -> Result<f64, InputError> {
        if depth.is_empty() {
            return Err(InputError::Empty("depth image"));
        }
        let in_range = depth
            .data()
            .iter()
            .filter(|&&d| d > 0 && d > min_mm && d < max_mm)
            .count();
        Ok(in_range as f64 / depth.len() as f64)
    }

    /// Statistics over valid depths; all zeros when nothing is valid
    pub fn depth_statistics(&self, depth: &DepthImage) -> DepthStatistics {
        let valid: Vec<f64> = depth
            .data()
            .iter()
            .filter(|&&d| d > 0)
            .map(|&d| d as f64)
            .collect();
        if valid.is_empty() {
            return DepthStatistics::default();
        }

        let n = valid.len() as f64;
        let mean = valid.iter().sum::<f64>() / n;
        let variance = valid.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;

        DepthStatistics {
            valid_ratio: n / depth.len() as f64,
            mean_depth_mm: mean,
            std_depth_mm: variance.sqrt(),
            min_depth_mm: valid.iter().copied().fold(f64::INFINITY, f64::min),
            max_depth_mm: valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Score a raw frame and decide whether it qualifies as a keyframe
    pub fn evaluate_frame(&self, frame: &RawFrame) -> Result<FrameQuality, InputError> {
        let blur_score = self.blur_score(&frame.rgb)?;
        let depth_valid_ratio = self.depth_valid_ratio(&frame.depth)?;
        let object_occupancy = self.object_occupancy(
            &frame.depth,
            self.config.occupancy_min_mm,
            self.config.occupancy_max_mm,
        )?;

        check_unit_ratio(blur_score, "blur_score");
        check_unit_ratio(depth_valid_ratio, "depth_valid_ratio");
        check_unit_ratio(object_occupancy, "object_occupancy");

        let is_keyframe = depth_valid_ratio >= self.config.keyframe_min_depth_valid_ratio
            && blur_score >= self.config.keyframe_min_blur_score;

        log::debug!(
            "Frame quality: blur={:.3}, depth_valid={:.3}, occupancy={:.3}, keyframe={}",
            blur_score,
            depth_valid_ratio,
            object_occupancy,
            is_keyframe
        );

        Ok(FrameQuality {
            depth_valid_ratio,
            blur_score,
            object_occupancy,
            is_keyframe,
        })
    }
}

/// Population variance of the 5-point Laplacian response with reflect padding
pub fn laplacian_variance(rgb: &RgbFrame) -> Result<f64, InputError> {
    if rgb.is_empty() {
        return Err(InputError::Empty("rgb image"));
    }

    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    let gray = rgb.luminance();
    let at = |x: isize, y: isize| {
        gray[reflect_index(y, height) * width + reflect_index(x, width)]
    };

    let mut response = Vec::with_capacity(gray.len());
    for y in 0..height as isize {
        for x in 0..width as isize {
            let lap = -4.0 * at(x, y) + at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y);
            response.push(lap);
        }
    }

    let n = response.len() as f64;
    let mean = response.iter().sum::<f64>() / n;
    Ok(response.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n)
}
