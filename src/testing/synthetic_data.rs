//! Synthetic RGBD data
//!
//! Deterministic frames for offline tests and benchmarks: a textured RGB
//! image and a tabletop depth scene with a box held above a flat floor,
//! generated with the same pinhole model the segmenter back-projects with.

use crate::types::{CameraIntrinsics, DepthImage, RawFrame, RgbFrame};
use rand::prelude::*;

/// Geometry of the synthetic tabletop scene
pub struct FloorScene;

impl FloorScene {
    /// Height of the camera above the floor (mm, camera Y axis points down)
    pub const CAMERA_HEIGHT_MM: f64 = 200.0;
    /// Depth of the front face of the box
    pub const OBJECT_DEPTH_MM: u16 = 450;
    /// Depth written where the floor is not visible
    pub const BACKGROUND_DEPTH_MM: u16 = 2000;

    /// Pixel bounds `(x0, x1, y0, y1)` of the box, half-open
    pub fn object_bounds(width: u32, height: u32) -> (u32, u32, u32, u32) {
        (width * 3 / 8, width * 5 / 8, height * 5 / 16, height * 5 / 8)
    }

    /// Depth of the floor seen at image row `v`, if the floor is visible there
    pub fn floor_depth(width: u32, height: u32, v: u32) -> Option<u16> {
        let focal = width.max(height) as f64;
        let cy = height as f64 / 2.0;
        let below_center = v as f64 - cy;
        if below_center <= 0.0 {
            return None;
        }
        let z = Self::CAMERA_HEIGHT_MM * focal / below_center;
        Some(z.round().min(u16::MAX as f64) as u16)
    }
}

/// Black and white checkerboard with square cells of `cell` pixels
pub fn checkerboard_rgb(width: u32, height: u32, cell: u32) -> RgbFrame {
    let cell = cell.max(1);
    RgbFrame::from_fn(width, height, |x, y| {
        let value = if ((x / cell) + (y / cell)) % 2 == 0 { 255 } else { 0 };
        [value; 3]
    })
}

/// Mid-gray image with uniform per-pixel noise of +/- `amplitude`
pub fn noisy_rgb(width: u32, height: u32, amplitude: u8, seed: u64) -> RgbFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let amplitude = amplitude as i16;
    RgbFrame::from_fn(width, height, |_, _| {
        let offset = rng.gen_range(-amplitude..=amplitude);
        [(128 + offset).clamp(0, 255) as u8; 3]
    })
}

/// Tabletop depth: a box in front of a flat floor, far background elsewhere
pub fn floor_scene_depth(width: u32, height: u32) -> DepthImage {
    let (x0, x1, y0, y1) = FloorScene::object_bounds(width, height);
    DepthImage::from_fn(width, height, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            FloorScene::OBJECT_DEPTH_MM
        } else {
            FloorScene::floor_depth(width, height, y).unwrap_or(FloorScene::BACKGROUND_DEPTH_MM)
        }
    })
}

/// Copy of `depth` with a fraction of pixels zeroed at random
pub fn with_dropouts(depth: &DepthImage, fraction: f64, seed: u64) -> DepthImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = depth.clone();
    for y in 0..depth.height() {
        for x in 0..depth.width() {
            if rng.gen_bool(fraction.clamp(0.0, 1.0)) {
                out.set(x, y, 0);
            }
        }
    }
    out
}

/// Sharp, fully valid frame of the tabletop scene
pub fn tabletop_frame(width: u32, height: u32) -> RawFrame {
    RawFrame::new(
        checkerboard_rgb(width, height, 4),
        floor_scene_depth(width, height),
        CameraIntrinsics::approximate(width, height),
    )
}
