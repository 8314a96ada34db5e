//! Depth layering: split the total depth into equal passes.

use tracing::debug;

/// Z of every pass floor, top to bottom, relative to the stock top.
///
/// Uses `ceil(total_depth / stepdown)` equal layers. Intermediate depths
/// are rounded to 0.1 mm when that keeps them strictly decreasing and
/// above the final depth; the last layer is always exactly `-total_depth`.
pub fn compute_depth_levels(total_depth: f64, stepdown: f64) -> Vec<f64> {
    if !(total_depth > 0.0) || !total_depth.is_finite() {
        return Vec::new();
    }
    let count = if stepdown > 0.0 && stepdown.is_finite() {
        ((total_depth / stepdown) - 1e-9).ceil().max(1.0) as usize
    } else {
        1
    };
    let height = total_depth / count as f64;

    let raw: Vec<f64> = (1..count).map(|i| -(height * i as f64)).collect();
    let rounded: Vec<f64> = raw.iter().map(|z| (z * 10.0).round() / 10.0).collect();

    let mut previous = 0.0;
    let rounding_ok = rounded.iter().all(|&z| {
        let ok = z < previous && z > -total_depth;
        previous = z;
        ok
    });

    let mut levels = if rounding_ok { rounded } else { raw };
    levels.push(-total_depth);
    debug!(count, height, rounding_ok, "depth levels");
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_strictly_decreasing(levels: &[f64]) {
        assert!(levels[0] < 0.0);
        for pair in levels.windows(2) {
            assert!(pair[1] < pair[0], "{levels:?}");
        }
    }

    #[test]
    fn test_two_equal_layers() {
        assert_eq!(compute_depth_levels(5.0, 2.5), vec![-2.5, -5.0]);
    }

    #[test]
    fn test_single_layer() {
        assert_eq!(compute_depth_levels(3.0, 3.0), vec![-3.0]);
        assert_eq!(compute_depth_levels(3.0, 10.0), vec![-3.0]);
    }

    #[test]
    fn test_rounded_to_tenths() {
        let levels = compute_depth_levels(1.0, 0.3);
        assert_eq!(levels, vec![-0.3, -0.5, -0.8, -1.0]);
    }

    #[test]
    fn test_last_level_is_exact() {
        let levels = compute_depth_levels(3.33, 1.0);
        assert_eq!(levels.len(), 4);
        assert_eq!(*levels.last().unwrap(), -3.33);
        assert_strictly_decreasing(&levels);
    }

    #[test]
    fn test_fine_layers_keep_raw_depths() {
        // Rounding would merge these into duplicate 0.1 mm steps.
        let levels = compute_depth_levels(0.2, 0.04);
        assert_eq!(levels.len(), 5);
        assert_strictly_decreasing(&levels);
        assert!((levels[0] + 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_level_count_matches_ceiling() {
        for (total, step) in [(5.0, 2.5), (6.0, 1.5), (7.3, 2.0), (0.9, 0.25), (12.0, 0.7)] {
            let levels = compute_depth_levels(total, step);
            assert_eq!(levels.len(), (total / step).ceil() as usize, "{total}/{step}");
            assert_strictly_decreasing(&levels);
            assert_eq!(*levels.last().unwrap(), -total);
        }
    }
}
