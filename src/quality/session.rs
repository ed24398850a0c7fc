//! Capture session accumulation
//!
//! Collects per-frame quality while a capture loop runs and turns it into the
//! `CaptureMetrics` record consumed by the capture gate.

use super::frame::FrameQuality;
use crate::invariants::check_unit_ratio;
use crate::models::CaptureMetrics;

/// Fraction of `bins` equal azimuth sectors that received at least one view.
///
/// Angles are wrapped into [0, 360). Zero bins yields 0.0.
pub fn estimate_coverage(azimuths_deg: &[f64], bins: u32) -> f64 {
    if bins == 0 {
        return 0.0;
    }

    let width = 360.0 / bins as f64;
    let mut occupied = vec![false; bins as usize];
    for azimuth in azimuths_deg.iter().filter(|a| a.is_finite()) {
        let bin = (azimuth.rem_euclid(360.0) / width) as usize;
        occupied[bin.min(bins as usize - 1)] = true;
    }

    occupied.iter().filter(|&&o| o).count() as f64 / bins as f64
}

/// Running summary of one capture session
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    azimuth_bins: u32,
    frames: Vec<FrameQuality>,
    keyframe_azimuths: Vec<f64>,
}

impl CaptureSummary {
    pub fn new(azimuth_bins: u32) -> Self {
        Self {
            azimuth_bins,
            frames: Vec::new(),
            keyframe_azimuths: Vec::new(),
        }
    }

    /// Record a frame. The azimuth (degrees around the object) only
    /// contributes to coverage when the frame is a keyframe.
    pub fn record(&mut self, quality: FrameQuality, azimuth_deg: Option<f64>) {
        if quality.is_keyframe {
            if let Some(azimuth) = azimuth_deg {
                self.keyframe_azimuths.push(azimuth);
            }
        }
        self.frames.push(quality);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframes().count()
    }

    pub fn coverage_score(&self) -> f64 {
        estimate_coverage(&self.keyframe_azimuths, self.azimuth_bins)
    }

    fn keyframes(&self) -> impl Iterator<Item = &FrameQuality> {
        self.frames.iter().filter(|f| f.is_keyframe)
    }

    /// Close the session. Means and minimums are taken over keyframes only
    /// and are zero when no keyframe was selected.
    pub fn finish(&self, capture_duration_sec: f64) -> CaptureMetrics {
        let keyframes: Vec<&FrameQuality> = self.keyframes().collect();
        let (depth_mean, depth_min) = mean_and_min(keyframes.iter().map(|f| f.depth_valid_ratio));
        let (blur_mean, blur_min) = mean_and_min(keyframes.iter().map(|f| f.blur_score));
        let coverage = self.coverage_score();

        for (value, name) in [
            (depth_mean, "depth_valid_ratio_mean"),
            (depth_min, "depth_valid_ratio_min"),
            (blur_mean, "blur_score_mean"),
            (blur_min, "blur_score_min"),
            (coverage, "coverage_score"),
        ] {
            check_unit_ratio(value, name);
        }

        log::info!(
            "Capture session finished: {} frames, {} keyframes, coverage {:.2}",
            self.frames.len(),
            keyframes.len(),
            coverage
        );

        CaptureMetrics {
            num_frames_raw: self.frames.len() as u32,
            num_keyframes: keyframes.len() as u32,
            depth_valid_ratio_mean: depth_mean,
            depth_valid_ratio_min: depth_min,
            blur_score_mean: blur_mean,
            blur_score_min: blur_min,
            coverage_score: coverage,
            capture_duration_sec: capture_duration_sec.max(0.0),
            ..CaptureMetrics::default()
        }
    }
}

fn mean_and_min(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (count, sum, min) = values.fold((0usize, 0.0, f64::INFINITY), |(n, s, m), v| {
        (n + 1, s + v, m.min(v))
    });
    if count == 0 {
        (0.0, 0.0)
    } else {
        (sum / count as f64, min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StageRecord, StageStatus};

    fn quality(depth: f64, blur: f64, keyframe: bool) -> FrameQuality {
        FrameQuality {
            depth_valid_ratio: depth,
            blur_score: blur,
            object_occupancy: 0.4,
            is_keyframe: keyframe,
        }
    }

    #[test]
    fn test_estimate_coverage() {
        assert_eq!(estimate_coverage(&[], 12), 0.0);
        assert_eq!(estimate_coverage(&[0.0, 10.0, 29.9], 12), 1.0 / 12.0);
        assert_eq!(estimate_coverage(&[0.0, 90.0, 180.0, 270.0], 4), 1.0);
        // Wrapped and negative angles land in the expected sectors
        assert_eq!(estimate_coverage(&[360.0, -90.0], 4), 0.5);
        assert_eq!(estimate_coverage(&[45.0], 0), 0.0);
    }

    #[test]
    fn test_summary_uses_keyframes_only() {
        let mut summary = CaptureSummary::new(4);
        summary.record(quality(0.9, 0.8, true), Some(0.0));
        summary.record(quality(0.7, 0.6, true), Some(100.0));
        summary.record(quality(0.1, 0.1, false), Some(200.0));

        assert_eq!(summary.frame_count(), 3);
        assert_eq!(summary.keyframe_count(), 2);
        assert_eq!(summary.coverage_score(), 0.5);

        let metrics = summary.finish(42.0);
        assert_eq!(metrics.num_frames_raw, 3);
        assert_eq!(metrics.num_keyframes, 2);
        assert!((metrics.depth_valid_ratio_mean - 0.8).abs() < 1e-12);
        assert_eq!(metrics.depth_valid_ratio_min, 0.7);
        assert!((metrics.blur_score_mean - 0.7).abs() < 1e-12);
        assert_eq!(metrics.blur_score_min, 0.6);
        assert_eq!(metrics.capture_duration_sec, 42.0);
        assert_eq!(metrics.gate_status(), StageStatus::Pending);
    }

    #[test]
    fn test_empty_session() {
        let metrics = CaptureSummary::new(12).finish(0.0);
        assert_eq!(metrics.num_keyframes, 0);
        assert_eq!(metrics.blur_score_min, 0.0);
        assert_eq!(metrics.coverage_score, 0.0);
    }
}
