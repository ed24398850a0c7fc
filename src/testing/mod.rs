//! Testing utilities for scangate
//!
//! Provides deterministic synthetic RGBD data so the analyzers, filters and
//! segmenter can be exercised without a depth camera.

pub mod synthetic_data;

pub use synthetic_data::{
    checkerboard_rgb,
    floor_scene_depth,
    noisy_rgb,
    tabletop_frame,
    with_dropouts,
    FloorScene,
};
