//! Holding tabs on the final pass of a closed contour.

use crate::types::TabSpec;
use tracing::debug;

/// Share of the tab width used by each ramp.
const RAMP_FRACTION: f64 = 0.25;

/// Tab layout along one closed path, in arc length from the path start.
#[derive(Debug, Clone, PartialEq)]
pub struct TabConfig {
    /// Cut range of every tab, clipped to `[0, path_length]`.
    pub ranges: Vec<(f64, f64)>,
    /// Unclipped center of every tab; the Z profile is measured from these.
    pub centers: Vec<f64>,
    /// Floor Z on top of a tab.
    pub tab_z: f64,
    pub tab_width: f64,
}

impl TabConfig {
    /// Lay out tabs along a closed path of `path_length`. `None` when tabs
    /// are disabled or there is nothing to hold.
    pub fn new(spec: &TabSpec, path_length: f64, total_depth: f64) -> Option<Self> {
        if !spec.enabled || !(path_length > 0.0) || !(spec.width > 0.0) || !(spec.interval > 0.0) {
            return None;
        }
        let count = ((path_length / spec.interval).round() as usize).max(1);
        let spacing = path_length / count as f64;
        let half = spec.width / 2.0;
        let centers: Vec<f64> = (0..count).map(|i| (i as f64 + 0.5) * spacing).collect();
        let ranges = centers
            .iter()
            .map(|c| ((c - half).max(0.0), (c + half).min(path_length)))
            .collect();
        let tab_z = -(total_depth - spec.height).max(0.0);
        debug!(count, tab_z, path_length, "tab layout");
        Some(Self {
            ranges,
            centers,
            tab_z,
            tab_width: spec.width,
        })
    }

    /// Floor Z at arc length `s` when cutting at `cut_z`. Ramps up over
    /// the first quarter of each tab, stays flat over the middle half and
    /// ramps back down over the last quarter.
    pub fn z_at(&self, s: f64, cut_z: f64) -> f64 {
        if self.tab_z <= cut_z {
            return cut_z;
        }
        let ramp = self.tab_width * RAMP_FRACTION;
        for (&(start, end), &center) in self.ranges.iter().zip(&self.centers) {
            if s < start || s > end {
                continue;
            }
            let u = s - (center - self.tab_width / 2.0);
            let rise = self.tab_z - cut_z;
            let z = if u < ramp {
                cut_z + rise * u / ramp
            } else if u <= self.tab_width - ramp {
                self.tab_z
            } else {
                self.tab_z - rise * (u - (self.tab_width - ramp)) / ramp
            };
            return z.clamp(cut_z, self.tab_z);
        }
        cut_z
    }

    /// Arc lengths where the Z profile changes slope. Path walkers split
    /// segments here so flats stay flat and ramps keep a constant slope.
    pub fn breakpoints(&self) -> Vec<f64> {
        let ramp = self.tab_width * RAMP_FRACTION;
        let mut points: Vec<f64> = Vec::with_capacity(self.centers.len() * 4);
        for (&(start, end), &center) in self.ranges.iter().zip(&self.centers) {
            let nominal_start = center - self.tab_width / 2.0;
            for s in [
                nominal_start,
                nominal_start + ramp,
                nominal_start + self.tab_width - ramp,
                nominal_start + self.tab_width,
            ] {
                if s >= start && s <= end {
                    points.push(s);
                }
            }
        }
        points.sort_by(f64::total_cmp);
        points.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        points
    }
}
