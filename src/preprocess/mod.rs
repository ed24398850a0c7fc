//! Keyframe preprocessing
//!
//! Each keyframe's depth is conditioned, a foreground mask is computed from
//! it, and the mask is applied to both images. The per-frame outcome is kept
//! as a [`MaskedFrameRecord`]; the records of a whole session fold into the
//! [`PreprocessMetrics`] judged by the preprocess gate.

pub mod depth_filter;
pub mod segment;

pub use depth_filter::DepthConditioner;
pub use segment::{
    apply_mask, depth_to_points, fit_plane_ransac, ForegroundSegmenter, MaskMethod, Plane,
};

use crate::config::SegmentationConfig;
use crate::errors::InputError;
use crate::invariants::check_unit_ratio;
use crate::models::PreprocessMetrics;
use crate::types::{DepthImage, Mask, RawFrame, RgbFrame};
use serde::{Deserialize, Serialize};

/// Outcome of masking one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedFrameRecord {
    pub frame_id: u32,
    pub mask_method: MaskMethod,
    pub mask_area_ratio: f64,
    /// Area ratio fell inside the configured valid range
    pub is_valid: bool,
}

/// Masked images of one frame together with its record
#[derive(Debug, Clone)]
pub struct MaskedFrame {
    pub rgb: RgbFrame,
    pub depth: DepthImage,
    pub mask: Mask,
    pub record: MaskedFrameRecord,
}

/// Filter, segment and mask keyframes
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    conditioner: DepthConditioner,
    segmenter: ForegroundSegmenter,
}

impl Preprocessor {
    pub fn new(conditioner: DepthConditioner, config: SegmentationConfig) -> Self {
        Self {
            conditioner,
            segmenter: ForegroundSegmenter::new(config),
        }
    }

    pub fn conditioner(&self) -> &DepthConditioner {
        &self.conditioner
    }

    pub fn segmenter(&self) -> &ForegroundSegmenter {
        &self.segmenter
    }

    pub fn process_frame(
        &self,
        frame_id: u32,
        rgb: &RgbFrame,
        depth: &DepthImage,
        method: MaskMethod,
    ) -> Result<MaskedFrame, InputError> {
        let filtered = self.conditioner.filter_depth(depth)?;
        let mask = self.segmenter.create_mask(&filtered, method)?;
        let (masked_rgb, masked_depth) = apply_mask(rgb, &filtered, &mask)?;

        let config = self.segmenter.config();
        let area = mask.area_ratio();
        let is_valid = area >= config.valid_mask_area_min && area <= config.valid_mask_area_max;
        log::debug!(
            "Frame {}: mask area {:.3} via {} ({})",
            frame_id,
            area,
            method,
            if is_valid { "valid" } else { "invalid" }
        );

        Ok(MaskedFrame {
            rgb: masked_rgb,
            depth: masked_depth,
            mask,
            record: MaskedFrameRecord {
                frame_id,
                mask_method: method,
                mask_area_ratio: area,
                is_valid,
            },
        })
    }

    /// Process a batch of keyframes and summarize them.
    ///
    /// Frames that cannot be processed are logged and left out of the
    /// output, so they count against `valid_frames_ratio`.
    pub fn process_session<'a, I>(&self, frames: I, method: MaskMethod) -> PreprocessMetrics
    where
        I: IntoIterator<Item = (u32, &'a RawFrame)>,
    {
        let mut num_input = 0;
        let mut records = Vec::new();
        for (frame_id, frame) in frames {
            num_input += 1;
            match self.process_frame(frame_id, &frame.rgb, &frame.depth, method) {
                Ok(masked) => records.push(masked.record),
                Err(e) => log::warn!("Skipping frame {}: {}", frame_id, e),
            }
        }
        PreprocessMetrics::from_records(num_input, method, &records)
    }
}

impl PreprocessMetrics {
    /// Fold per-frame records into session metrics. All ratios are zero when
    /// there are no records; `valid_frames_ratio` is relative to `num_input`.
    pub fn from_records(
        num_input: u32,
        method: MaskMethod,
        records: &[MaskedFrameRecord],
    ) -> Self {
        let (mean, min) = if records.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: f64 = records.iter().map(|r| r.mask_area_ratio).sum();
            let min = records
                .iter()
                .map(|r| r.mask_area_ratio)
                .fold(f64::INFINITY, f64::min);
            (sum / records.len() as f64, min)
        };
        let valid = records.iter().filter(|r| r.is_valid).count();
        let valid_ratio = if num_input == 0 {
            0.0
        } else {
            (valid as f64 / num_input as f64).min(1.0)
        };

        check_unit_ratio(mean, "mask_area_ratio_mean");
        check_unit_ratio(min, "mask_area_ratio_min");
        check_unit_ratio(valid_ratio, "valid_frames_ratio");

        log::info!(
            "Preprocessed {}/{} frames with {}, {} valid",
            records.len(),
            num_input,
            method,
            valid
        );

        Self {
            num_input_frames: num_input,
            num_output_frames: records.len() as u32,
            mask_method: method,
            mask_area_ratio_mean: mean,
            mask_area_ratio_min: min,
            valid_frames_ratio: valid_ratio,
            gate_status: Default::default(),
            gate_reasons: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StageStatus;
    use crate::testing::tabletop_frame;
    use crate::types::CameraIntrinsics;

    fn record(frame_id: u32, area: f64, is_valid: bool) -> MaskedFrameRecord {
        MaskedFrameRecord {
            frame_id,
            mask_method: MaskMethod::DepthThreshold,
            mask_area_ratio: area,
            is_valid,
        }
    }

    #[test]
    fn test_from_records_aggregates() {
        let records = [record(0, 0.2, true), record(1, 0.4, true), record(2, 0.9, false)];
        let metrics = PreprocessMetrics::from_records(4, MaskMethod::DepthThreshold, &records);

        assert_eq!(metrics.num_input_frames, 4);
        assert_eq!(metrics.num_output_frames, 3);
        assert!((metrics.mask_area_ratio_mean - 0.5).abs() < 1e-9);
        assert!((metrics.mask_area_ratio_min - 0.2).abs() < 1e-9);
        assert!((metrics.valid_frames_ratio - 0.5).abs() < 1e-9);
        assert_eq!(metrics.gate_status, StageStatus::Pending);
    }

    #[test]
    fn test_no_keyframes_gives_zero_metrics() {
        let metrics =
            Preprocessor::default().process_session(std::iter::empty(), MaskMethod::DepthThreshold);
        assert_eq!(metrics.num_input_frames, 0);
        assert_eq!(metrics.num_output_frames, 0);
        assert_eq!(metrics.valid_frames_ratio, 0.0);
        assert_eq!(metrics.mask_area_ratio_mean, 0.0);
    }

    #[test]
    fn test_process_frame_masks_background() {
        let frame = tabletop_frame(64, 48);
        let masked = Preprocessor::default()
            .process_frame(3, &frame.rgb, &frame.depth, MaskMethod::DepthThreshold)
            .unwrap();

        assert_eq!(masked.record.frame_id, 3);
        assert_eq!(masked.record.mask_area_ratio, masked.mask.area_ratio());
        for y in 0..48 {
            for x in 0..64 {
                if !masked.mask.is_foreground(x, y) {
                    assert_eq!(masked.depth.get(x, y), 0);
                    assert_eq!(masked.rgb.pixel(x, y), [0, 0, 0]);
                }
            }
        }
    }

    #[test]
    fn test_validity_follows_area_range() {
        let rgb = RgbFrame::filled(16, 16, [90, 90, 90]);

        // Everything in range: area 1.0 is above the valid maximum
        let near = DepthImage::filled(16, 16, 500);
        let masked = Preprocessor::default()
            .process_frame(0, &rgb, &near, MaskMethod::DepthThreshold)
            .unwrap();
        assert_eq!(masked.record.mask_area_ratio, 1.0);
        assert!(!masked.record.is_valid);

        let half = DepthImage::from_fn(16, 16, |x, _| if x < 8 { 500 } else { 3000 });
        let masked = Preprocessor::default()
            .process_frame(1, &rgb, &half, MaskMethod::DepthThreshold)
            .unwrap();
        assert!(masked.record.is_valid);
    }

    #[test]
    fn test_bad_frames_are_skipped() {
        let good = tabletop_frame(32, 24);
        let bad = RawFrame::new(
            RgbFrame::filled(8, 8, [0, 0, 0]),
            DepthImage::filled(4, 4, 500),
            CameraIntrinsics::approximate(8, 8),
        );

        let metrics = Preprocessor::default()
            .process_session([(0, &good), (1, &bad)], MaskMethod::DepthThreshold);
        assert_eq!(metrics.num_input_frames, 2);
        assert_eq!(metrics.num_output_frames, 1);
        assert!(metrics.valid_frames_ratio <= 0.5);
    }

    #[test]
    fn test_manual_bounding_is_rejected() {
        let frame = tabletop_frame(16, 16);
        let result = Preprocessor::default().process_frame(
            0,
            &frame.rgb,
            &frame.depth,
            MaskMethod::ManualBounding,
        );
        assert!(matches!(result, Err(InputError::Unsupported(_))));
    }
}
