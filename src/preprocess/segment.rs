//! Foreground segmentation.
//!
//! Two strategies: a plain depth band, and a floor-plane mask that fits the
//! floor with RANSAC in the bottom band of the image and keeps only points
//! standing off that plane.

use crate::assert_invariant;
use crate::config::SegmentationConfig;
use crate::errors::InputError;
use crate::invariants::SHAPE_PRESERVED;
use crate::types::{CameraIntrinsics, DepthImage, Mask, RgbFrame};
use nalgebra::Vector3;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Background removal strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMethod {
    DepthThreshold,
    FloorPlane,
    /// Reserved for user-drawn bounds; not implemented by the segmenter
    ManualBounding,
}

impl MaskMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskMethod::DepthThreshold => "depth_threshold",
            MaskMethod::FloorPlane => "floor_plane",
            MaskMethod::ManualBounding => "manual_bounding",
        }
    }
}

impl fmt::Display for MaskMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaskMethod {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "depth_threshold" => Ok(MaskMethod::DepthThreshold),
            "floor_plane" => Ok(MaskMethod::FloorPlane),
            "manual_bounding" => Ok(MaskMethod::ManualBounding),
            other => Err(InputError::unsupported(format!("mask method '{}'", other))),
        }
    }
}

/// Plane `n . p + d = 0` with unit normal `n`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    /// Plane through three points; `None` when they are (nearly) collinear
    pub fn from_points(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        let norm = normal.norm();
        if norm < 1e-10 {
            return None;
        }
        let normal = normal / norm;
        Some(Self {
            normal,
            d: -normal.dot(&a),
        })
    }

    pub fn signed_distance(&self, p: &Vector3<f64>) -> f64 {
        self.normal.dot(p) + self.d
    }

    /// `[a, b, c, d]`
    pub fn coefficients(&self) -> [f64; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.d]
    }
}

/// Back-project the pixels selected by `select` using approximate intrinsics
pub fn depth_to_points<F>(depth: &DepthImage, mut select: F) -> Vec<Vector3<f64>>
where
    F: FnMut(u32, u32) -> bool,
{
    let camera = CameraIntrinsics::approximate(depth.width(), depth.height());
    let mut points = Vec::new();
    for v in 0..depth.height() {
        for u in 0..depth.width() {
            if select(u, v) {
                points.push(camera.back_project(u as f64, v as f64, depth.get(u, v) as f64));
            }
        }
    }
    points
}

/// Fit a plane with RANSAC, keeping the sample with strictly the most inliers.
///
/// Returns `None` for fewer than three points or when every sample was
/// degenerate.
pub fn fit_plane_ransac<R: Rng>(
    points: &[Vector3<f64>],
    iterations: u32,
    inlier_threshold: f64,
    rng: &mut R,
) -> Option<(Plane, usize)> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut best: Option<(Plane, usize)> = None;
    for _ in 0..iterations {
        let i0 = rng.gen_range(0..n);
        let mut i1 = rng.gen_range(0..n);
        while i1 == i0 {
            i1 = rng.gen_range(0..n);
        }
        let mut i2 = rng.gen_range(0..n);
        while i2 == i0 || i2 == i1 {
            i2 = rng.gen_range(0..n);
        }

        let Some(candidate) = Plane::from_points(points[i0], points[i1], points[i2]) else {
            continue;
        };

        let inliers = points
            .iter()
            .filter(|p| candidate.signed_distance(p).abs() < inlier_threshold)
            .count();

        if best.map_or(true, |(_, count)| inliers > count) {
            best = Some((candidate, inliers));
        }
    }
    best
}

/// Produces binary foreground masks from depth images
#[derive(Debug, Clone, Default)]
pub struct ForegroundSegmenter {
    config: SegmentationConfig,
}

impl ForegroundSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Create a mask, drawing RANSAC samples from the configured seed or,
    /// without one, from the thread RNG.
    pub fn create_mask(&self, depth: &DepthImage, method: MaskMethod) -> Result<Mask, InputError> {
        let mut rng: Box<dyn RngCore> = match self.config.ransac_seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(thread_rng()),
        };
        self.create_mask_with_rng(depth, method, &mut rng)
    }

    pub fn create_mask_with_rng<R: Rng>(
        &self,
        depth: &DepthImage,
        method: MaskMethod,
        rng: &mut R,
    ) -> Result<Mask, InputError> {
        if depth.is_empty() {
            return Err(InputError::Empty("depth image"));
        }

        let mask = match method {
            MaskMethod::DepthThreshold => self.threshold_mask(depth),
            MaskMethod::FloorPlane => self.floor_plane_mask(depth, rng),
            MaskMethod::ManualBounding => {
                return Err(InputError::unsupported(format!(
                    "mask method '{}' is not supported for automatic segmentation",
                    method
                )))
            }
        };

        assert_invariant!(
            mask.dimensions() == depth.dimensions(),
            SHAPE_PRESERVED,
            "create_mask"
        );
        Ok(mask)
    }

    fn in_band(&self, d: u16) -> bool {
        d > self.config.depth_min_mm && d < self.config.depth_max_mm
    }

    /// Foreground where `depth_min_mm < depth < depth_max_mm`
    pub fn threshold_mask(&self, depth: &DepthImage) -> Mask {
        Mask::from_fn(depth.width(), depth.height(), |x, y| self.in_band(depth.get(x, y)))
    }

    // TODO: the foreground side assumes the fitted normal points away from the
    // floor towards the camera's "up"; confirm the expected camera mounting and
    // orient the normal explicitly instead of relying on sample order.
    fn floor_plane_mask<R: Rng>(&self, depth: &DepthImage, rng: &mut R) -> Mask {
        let floor_start =
            (depth.height() as f64 * (1.0 - self.config.floor_region_ratio)) as u32;
        let candidates = depth_to_points(depth, |x, y| {
            y >= floor_start && self.in_band(depth.get(x, y))
        });

        if candidates.len() < 3 {
            log::warn!(
                "Only {} floor candidates, falling back to depth threshold",
                candidates.len()
            );
            return self.threshold_mask(depth);
        }

        let Some((plane, inliers)) = fit_plane_ransac(
            &candidates,
            self.config.ransac_iterations,
            self.config.ransac_inlier_threshold,
            rng,
        ) else {
            log::warn!("No valid floor plane found, falling back to depth threshold");
            return self.threshold_mask(depth);
        };

        log::debug!(
            "Floor plane {:?} with {}/{} inliers",
            plane.coefficients(),
            inliers,
            candidates.len()
        );

        let camera = CameraIntrinsics::approximate(depth.width(), depth.height());
        let threshold = self.config.ransac_inlier_threshold;
        Mask::from_fn(depth.width(), depth.height(), |x, y| {
            let d = depth.get(x, y);
            self.in_band(d)
                && plane.signed_distance(&camera.back_project(x as f64, y as f64, d as f64))
                    > threshold
        })
    }
}

/// Zero every pixel outside the mask
pub fn apply_mask(
    rgb: &RgbFrame,
    depth: &DepthImage,
    mask: &Mask,
) -> Result<(RgbFrame, DepthImage), InputError> {
    if rgb.dimensions() != mask.dimensions() {
        return Err(InputError::DimensionMismatch {
            expected: mask.dimensions(),
            got: rgb.dimensions(),
        });
    }
    if depth.dimensions() != mask.dimensions() {
        return Err(InputError::DimensionMismatch {
            expected: mask.dimensions(),
            got: depth.dimensions(),
        });
    }

    let (width, height) = mask.dimensions();
    let masked_rgb = RgbFrame::from_fn(width, height, |x, y| {
        if mask.is_foreground(x, y) {
            rgb.pixel(x, y)
        } else {
            [0, 0, 0]
        }
    });
    let masked_depth = DepthImage::from_fn(width, height, |x, y| {
        if mask.is_foreground(x, y) {
            depth.get(x, y)
        } else {
            0
        }
    });
    Ok((masked_rgb, masked_depth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{floor_scene_depth, FloorScene};

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_threshold_mask_bounds_are_exclusive() {
        let depth = DepthImage::from_fn(10, 10, |_, y| match y {
            0 | 1 => 100,
            8 | 9 => 1500,
            2 => 200,
            7 => 1000,
            _ => 500,
        });
        let mask = ForegroundSegmenter::default()
            .create_mask(&depth, MaskMethod::DepthThreshold)
            .unwrap();

        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(mask.is_foreground(x, y), (3..7).contains(&y));
            }
        }
        assert_eq!(mask.foreground_count(), 40);
    }

    #[test]
    fn test_manual_bounding_is_unsupported() {
        let depth = DepthImage::filled(4, 4, 500);
        let err = ForegroundSegmenter::default()
            .create_mask(&depth, MaskMethod::ManualBounding)
            .unwrap_err();
        assert!(matches!(err, InputError::Unsupported(_)));
    }

    #[test]
    fn test_empty_depth_rejected() {
        let depth = DepthImage::new(0, 0, vec![]).unwrap();
        let err = ForegroundSegmenter::default()
            .create_mask(&depth, MaskMethod::FloorPlane)
            .unwrap_err();
        assert_eq!(err, InputError::Empty("depth image"));
    }

    #[test]
    fn test_mask_method_names() {
        assert_eq!("floor_plane".parse::<MaskMethod>().unwrap(), MaskMethod::FloorPlane);
        assert!("lasso".parse::<MaskMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&MaskMethod::DepthThreshold).unwrap(),
            "\"depth_threshold\""
        );
    }

    #[test]
    fn test_plane_from_collinear_points_is_rejected() {
        let a = Vector3::new(0.0, 0.0, 500.0);
        let b = Vector3::new(1.0, 0.0, 500.0);
        let c = Vector3::new(2.0, 0.0, 500.0);
        assert!(Plane::from_points(a, b, c).is_none());
    }

    #[test]
    fn test_fit_plane_ransac_recovers_plane() {
        let mut rng = seeded();
        let points: Vec<Vector3<f64>> = (0..9)
            .map(|i| {
                Vector3::new(
                    (i % 3) as f64 + rng.gen_range(-0.1..0.1),
                    (i / 3) as f64 + rng.gen_range(-0.1..0.1),
                    500.0 + rng.gen_range(-0.1..0.1),
                )
            })
            .collect();

        let (plane, inliers) = fit_plane_ransac(&points, 100, 10.0, &mut rng).unwrap();
        assert!(plane.normal.z.abs() > 0.9);
        assert_eq!(inliers, 9);
    }

    #[test]
    fn test_fit_plane_ransac_needs_three_points() {
        let points = vec![Vector3::new(0.0, 0.0, 500.0), Vector3::new(1.0, 0.0, 500.0)];
        assert!(fit_plane_ransac(&points, 100, 10.0, &mut seeded()).is_none());
    }

    #[test]
    fn test_depth_to_points() {
        let depth = DepthImage::filled(2, 2, 500);
        let points = depth_to_points(&depth, |_, _| true);
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.z == 500.0));
    }

    #[test]
    fn test_floor_plane_never_keeps_floor() {
        let depth = floor_scene_depth(64, 64);
        let segmenter = ForegroundSegmenter::default();
        let mask = segmenter
            .create_mask_with_rng(&depth, MaskMethod::FloorPlane, &mut seeded())
            .unwrap();
        let threshold = segmenter.threshold_mask(&depth);
        let (x0, x1, y0, y1) = FloorScene::object_bounds(64, 64);

        for y in 0..64 {
            for x in 0..64 {
                let on_object = (x0..x1).contains(&x) && (y0..y1).contains(&y);
                if !on_object {
                    assert!(!mask.is_foreground(x, y), "floor pixel ({}, {}) kept", x, y);
                }
                if mask.is_foreground(x, y) {
                    assert!(threshold.is_foreground(x, y));
                }
            }
        }
    }

    #[test]
    fn test_floor_plane_keeps_object_whole_or_not_at_all() {
        // Which side counts as "above" follows the sampled normal's sign
        let depth = floor_scene_depth(64, 64);
        let (x0, x1, y0, y1) = FloorScene::object_bounds(64, 64);
        let area = ((x1 - x0) * (y1 - y0)) as usize;

        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mask = ForegroundSegmenter::default()
                .create_mask_with_rng(&depth, MaskMethod::FloorPlane, &mut rng)
                .unwrap();
            let kept = mask.foreground_count();
            assert!(kept == 0 || kept == area, "seed {} kept {}", seed, kept);
        }
    }

    #[test]
    fn test_floor_plane_keeps_exactly_the_object() {
        // Seed 2 samples a normal pointing toward the camera side of the floor
        let depth = floor_scene_depth(64, 64);
        let (x0, x1, y0, y1) = FloorScene::object_bounds(64, 64);
        let mut rng = StdRng::seed_from_u64(2);
        let mask = ForegroundSegmenter::default()
            .create_mask_with_rng(&depth, MaskMethod::FloorPlane, &mut rng)
            .unwrap();

        let object = Mask::from_fn(64, 64, |x, y| {
            (x0..x1).contains(&x) && (y0..y1).contains(&y)
        });
        assert_eq!(mask.foreground_count(), ((x1 - x0) * (y1 - y0)) as usize);
        assert_eq!(mask, object);
    }

    #[test]
    fn test_floor_plane_is_reproducible_with_seed() {
        let depth = floor_scene_depth(48, 48);
        let segmenter = ForegroundSegmenter::new(SegmentationConfig {
            ransac_seed: Some(7),
            ..SegmentationConfig::default()
        });
        let a = segmenter.create_mask(&depth, MaskMethod::FloorPlane).unwrap();
        let b = segmenter.create_mask(&depth, MaskMethod::FloorPlane).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_floor_plane_falls_back_without_candidates() {
        // Nothing valid in the bottom 30% of rows
        let depth = DepthImage::from_fn(20, 20, |_, y| if y < 14 { 500 } else { 0 });
        let segmenter = ForegroundSegmenter::default();
        let mask = segmenter
            .create_mask_with_rng(&depth, MaskMethod::FloorPlane, &mut seeded())
            .unwrap();
        assert_eq!(mask, segmenter.threshold_mask(&depth));
    }

    #[test]
    fn test_floor_plane_falls_back_on_degenerate_floor() {
        // A single valid floor row back-projects to collinear points
        let depth = DepthImage::from_fn(20, 20, |_, y| if y < 10 || y == 19 { 500 } else { 0 });
        let segmenter = ForegroundSegmenter::default();
        let mask = segmenter
            .create_mask_with_rng(&depth, MaskMethod::FloorPlane, &mut seeded())
            .unwrap();
        assert_eq!(mask, segmenter.threshold_mask(&depth));
    }

    #[test]
    fn test_apply_mask_zeroes_background() {
        let rgb = RgbFrame::filled(10, 10, [128, 128, 128]);
        let depth = DepthImage::filled(10, 10, 500);
        let mask = Mask::from_fn(10, 10, |_, y| y >= 5);

        let (masked_rgb, masked_depth) = apply_mask(&rgb, &depth, &mask).unwrap();
        for y in 0..10 {
            for x in 0..10 {
                if y < 5 {
                    assert_eq!(masked_rgb.pixel(x, y), [0, 0, 0]);
                    assert_eq!(masked_depth.get(x, y), 0);
                } else {
                    assert_eq!(masked_rgb.pixel(x, y), [128, 128, 128]);
                    assert_eq!(masked_depth.get(x, y), 500);
                }
            }
        }
    }

    #[test]
    fn test_apply_mask_rejects_mismatched_shapes() {
        let rgb = RgbFrame::filled(8, 8, [1, 2, 3]);
        let depth = DepthImage::filled(8, 6, 500);
        let mask = Mask::empty(8, 8);
        assert!(matches!(
            apply_mask(&rgb, &depth, &mask),
            Err(InputError::DimensionMismatch { .. })
        ));
    }
}
