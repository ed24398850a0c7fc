//! Image containers and camera metadata shared by the analyzers and filters.
//!
//! All containers are row-major and validate their buffer length on
//! construction, so downstream code can index without re-checking shapes.

use crate::errors::InputError;
use chrono::{DateTime, Utc};
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 16-bit single channel image as produced by depth sensors
pub type Depth16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

fn check_len(width: u32, height: u32, channels: usize, actual: usize) -> Result<(), InputError> {
    let expected = width as usize * height as usize * channels;
    if expected != actual {
        return Err(InputError::ShapeMismatch {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Mirror an out-of-range index back into `0..n` without repeating the edge
/// sample (`-1 -> 1`, `n -> n - 2`).
pub(crate) fn reflect_index(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// 8-bit RGB image (H x W x 3), interleaved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, InputError> {
        check_len(width, height, 3, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build from an interleaved buffer with an explicit channel count.
    ///
    /// Only 3-channel data is accepted.
    pub fn from_interleaved(
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, InputError> {
        if channels != 3 {
            return Err(InputError::ChannelCount(channels));
        }
        Self::new(width, height, data)
    }

    /// Uniform color frame
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Luminance plane using Y = 0.299R + 0.587G + 0.114B
    pub fn luminance(&self) -> Vec<f64> {
        self.data
            .chunks_exact(3)
            .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
            .collect()
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| Rgb(self.pixel(x, y)))
    }
}

impl From<&RgbImage> for RgbFrame {
    fn from(img: &RgbImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }
}

/// 16-bit depth image in millimeters; zero marks an invalid reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthImage {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl DepthImage {
    pub fn new(width: u32, height: u32, data: Vec<u16>) -> Result<Self, InputError> {
        check_len(width, height, 1, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, depth_mm: u16) -> Self {
        Self {
            width,
            height,
            data: vec![depth_mm; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> u16,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_luma16(img: &Depth16Image) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }

    pub fn to_luma16(&self) -> Depth16Image {
        ImageBuffer::from_fn(self.width, self.height, |x, y| Luma([self.get(x, y)]))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, depth_mm: u16) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = depth_mm;
    }
}

/// Binary segmentation mask, 255 = foreground, 0 = background
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub const FOREGROUND: u8 = 255;
    pub const BACKGROUND: u8 = 0;

    /// Wrap a raw buffer. Any non-zero value counts as foreground.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, InputError> {
        check_len(width, height, 1, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Self::BACKGROUND; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut is_foreground: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(if is_foreground(x, y) {
                    Self::FOREGROUND
                } else {
                    Self::BACKGROUND
                });
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] > 0
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }

    /// Fraction of pixels marked foreground, 0.0 for an empty mask
    pub fn area_ratio(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.foreground_count() as f64 / self.data.len() as f64
    }

    pub fn to_gray_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            Luma([self.data[y as usize * self.width as usize + x as usize]])
        })
    }
}

/// Pinhole camera intrinsics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Meters per depth unit
    pub depth_scale: f64,
}

impl CameraIntrinsics {
    /// Approximate intrinsics: centered principal point, fx = fy = max(W, H).
    pub fn approximate(width: u32, height: u32) -> Self {
        let focal = width.max(height) as f64;
        Self {
            width,
            height,
            fx: focal,
            fy: focal,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
            depth_scale: 0.001,
        }
    }

    /// Camera-space point of pixel `(u, v)` at `depth` (same unit as depth)
    pub fn back_project(&self, u: f64, v: f64, depth: f64) -> Vector3<f64> {
        Vector3::new(
            (u - self.cx) * depth / self.fx,
            (v - self.cy) * depth / self.fy,
            depth,
        )
    }
}

/// One RGB + depth pair straight from the capture loop
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub rgb: RgbFrame,
    pub depth: DepthImage,
    pub timestamp: DateTime<Utc>,
    pub intrinsics: CameraIntrinsics,
}

impl RawFrame {
    pub fn new(rgb: RgbFrame, depth: DepthImage, intrinsics: CameraIntrinsics) -> Self {
        Self {
            rgb,
            depth,
            timestamp: Utc::now(),
            intrinsics,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_frame_rejects_wrong_length() {
        let err = RgbFrame::new(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, InputError::ShapeMismatch { expected: 48, .. }));
    }

    #[test]
    fn test_rgb_frame_rejects_wrong_channels() {
        let err = RgbFrame::from_interleaved(2, 2, 4, vec![0; 16]).unwrap_err();
        assert_eq!(err, InputError::ChannelCount(4));
    }

    #[test]
    fn test_luminance_weights() {
        let frame = RgbFrame::filled(1, 1, [100, 100, 100]);
        let luma = frame.luminance();
        assert!((luma[0] - 100.0).abs() < 1e-9);

        let red = RgbFrame::filled(1, 1, [255, 0, 0]);
        assert!((red.luminance()[0] - 0.299 * 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_image_crate_interop() {
        let img = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        let frame = RgbFrame::from(&img);
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.pixel(2, 1), [1, 2, 3]);
        assert_eq!(frame.to_rgb_image(), img);

        let depth = DepthImage::from_fn(3, 2, |x, y| (x + 10 * y) as u16);
        let round_trip = DepthImage::from_luma16(&depth.to_luma16());
        assert_eq!(round_trip, depth);
    }

    #[test]
    fn test_mask_area_ratio() {
        let mask = Mask::from_fn(4, 4, |x, _| x < 1);
        assert_eq!(mask.foreground_count(), 4);
        assert!((mask.area_ratio() - 0.25).abs() < 1e-12);
        assert_eq!(mask.to_gray_image().get_pixel(0, 0)[0], Mask::FOREGROUND);
        assert_eq!(Mask::empty(0, 0).area_ratio(), 0.0);
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 1);
        assert_eq!(reflect_index(-2, 5), 2);
        assert_eq!(reflect_index(5, 5), 3);
        assert_eq!(reflect_index(6, 5), 2);
        assert_eq!(reflect_index(2, 5), 2);
        assert_eq!(reflect_index(-2, 2), 0);
        assert_eq!(reflect_index(3, 1), 0);
    }

    #[test]
    fn test_approximate_intrinsics() {
        let k = CameraIntrinsics::approximate(640, 480);
        assert_eq!(k.fx, 640.0);
        assert_eq!(k.fy, 640.0);
        assert_eq!(k.cx, 320.0);
        assert_eq!(k.cy, 240.0);

        let p = k.back_project(320.0 + 64.0, 240.0, 500.0);
        assert_eq!(p, Vector3::new(50.0, 0.0, 500.0));
    }
}
