//! Depth conditioning: outlier removal followed by conservative hole filling.

use crate::assert_invariant;
use crate::errors::InputError;
use crate::invariants::SHAPE_PRESERVED;
use crate::types::{reflect_index, DepthImage};

/// Two-pass depth cleanup.
///
/// The outlier pass replaces every valid pixel by the median of the valid
/// readings in a reflect-padded square window; invalid (zero) pixels are left
/// alone. The hole-fill pass then fills a zero pixel with the mean of its
/// valid 8-neighbors, but only when at least `min_valid_neighbors` of them
/// are valid, so real silhouette edges are not grown.
#[derive(Debug, Clone)]
pub struct DepthConditioner {
    /// Side of the median window, odd
    pub window: usize,
    pub hole_fill_iterations: usize,
    pub min_valid_neighbors: usize,
}

impl Default for DepthConditioner {
    fn default() -> Self {
        Self {
            window: 5,
            hole_fill_iterations: 2,
            min_valid_neighbors: 4,
        }
    }
}

const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

fn quantize(value: f64) -> u16 {
    value.round().clamp(0.0, u16::MAX as f64) as u16
}

impl DepthConditioner {
    pub fn filter_depth(&self, depth: &DepthImage) -> Result<DepthImage, InputError> {
        if depth.is_empty() {
            return Err(InputError::Empty("depth image"));
        }

        let mut filtered = self.remove_outliers(depth);
        let mut passes = 0;
        while passes < self.hole_fill_iterations {
            if !filtered.data().contains(&0) {
                break;
            }
            let (next, filled) = self.fill_holes(&filtered);
            filtered = next;
            passes += 1;
            log::debug!("Hole fill pass {}: filled {} pixels", passes, filled);
            if filled == 0 {
                break;
            }
        }

        assert_invariant!(
            filtered.dimensions() == depth.dimensions(),
            SHAPE_PRESERVED,
            "filter_depth"
        );
        Ok(filtered)
    }

    fn remove_outliers(&self, depth: &DepthImage) -> DepthImage {
        let width = depth.width() as usize;
        let height = depth.height() as usize;
        let radius = (self.window / 2) as isize;
        let src = depth.data();
        let mut window = Vec::with_capacity(self.window * self.window);

        DepthImage::from_fn(depth.width(), depth.height(), |x, y| {
            let center = src[y as usize * width + x as usize];
            if center == 0 {
                return 0;
            }

            window.clear();
            for dy in -radius..=radius {
                let row = reflect_index(y as isize + dy, height) * width;
                for dx in -radius..=radius {
                    let value = src[row + reflect_index(x as isize + dx, width)];
                    if value > 0 {
                        window.push(value);
                    }
                }
            }
            median(&mut window)
        })
    }

    /// One hole-fill iteration computed entirely from `depth`
    fn fill_holes(&self, depth: &DepthImage) -> (DepthImage, usize) {
        let width = depth.width() as isize;
        let height = depth.height() as isize;
        let mut filled = 0;

        let next = DepthImage::from_fn(depth.width(), depth.height(), |x, y| {
            let current = depth.get(x, y);
            if current > 0 {
                return current;
            }

            let (count, sum) = NEIGHBORS
                .iter()
                .map(|(dx, dy)| (x as isize + dx, y as isize + dy))
                .filter(|&(nx, ny)| nx >= 0 && ny >= 0 && nx < width && ny < height)
                .map(|(nx, ny)| depth.get(nx as u32, ny as u32))
                .filter(|&d| d > 0)
                .fold((0usize, 0u64), |(n, s), d| (n + 1, s + d as u64));

            if count >= self.min_valid_neighbors {
                filled += 1;
                quantize(sum as f64 / count as f64)
            } else {
                0
            }
        });

        (next, filled)
    }
}

/// Median of a non-empty sample; the two middle values are averaged
fn median(values: &mut [u16]) -> u16 {
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        quantize((values[mid - 1] as f64 + values[mid] as f64) / 2.0)
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_depth_rejected() {
        let depth = DepthImage::new(0, 0, vec![]).unwrap();
        assert_eq!(
            DepthConditioner::default().filter_depth(&depth),
            Err(InputError::Empty("depth image"))
        );
    }

    #[test]
    fn test_clean_depth_is_unchanged() {
        let depth = DepthImage::filled(12, 9, 640);
        let filtered = DepthConditioner::default().filter_depth(&depth).unwrap();
        assert_eq!(filtered, depth);
    }

    #[test]
    fn test_small_hole_is_filled() {
        let mut depth = DepthImage::filled(10, 10, 500);
        depth.set(5, 5, 0);
        let filtered = DepthConditioner::default().filter_depth(&depth).unwrap();
        assert_eq!(filtered.get(5, 5), 500);
    }

    #[test]
    fn test_outlier_is_replaced_by_median() {
        let mut depth = DepthImage::filled(10, 10, 500);
        depth.set(5, 5, 5000);
        let filtered = DepthConditioner::default().filter_depth(&depth).unwrap();
        assert_eq!(filtered.get(5, 5), 500);
    }

    #[test]
    fn test_silhouette_edges_are_not_grown() {
        let depth = DepthImage::from_fn(10, 10, |x, y| {
            if (2..8).contains(&x) && (2..8).contains(&y) { 500 } else { 0 }
        });
        let filtered = DepthConditioner::default().filter_depth(&depth).unwrap();

        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..8).contains(&x) && (2..8).contains(&y);
                assert_eq!(filtered.get(x, y) > 0, inside, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_hole_fill_needs_four_valid_neighbors() {
        // A zero pixel with exactly three valid neighbors stays empty
        let mut depth = DepthImage::filled(5, 5, 0);
        depth.set(0, 0, 400);
        depth.set(1, 0, 400);
        depth.set(2, 0, 400);
        let filtered = DepthConditioner::default().filter_depth(&depth).unwrap();
        assert_eq!(filtered.get(1, 1), 0);
    }

    #[test]
    fn test_even_window_median_is_averaged() {
        let mut values = vec![400, 500, 600, 700];
        assert_eq!(median(&mut values), 550);
        let mut odd = vec![900, 100, 500];
        assert_eq!(median(&mut odd), 500);
    }
}
