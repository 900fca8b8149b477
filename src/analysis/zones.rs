use serde::{Deserialize, Serialize};

use crate::data::annotations::{Peak2D, Zone, ZoneAxis};
use crate::data::spectrum::Matrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneOptions {
    /// Fraction of the maximum intensity a cross peak must exceed
    pub threshold_fraction: f64,
    /// Half size of the box drawn around each cross peak, in grid points
    pub half_width: usize,
}

impl Default for ZoneOptions {
    fn default() -> Self {
        Self {
            threshold_fraction: 0.1,
            half_width: 2,
        }
    }
}

fn peak_at(matrix: &Matrix, row: usize, col: usize) -> Peak2D {
    Peak2D {
        id: uuid::Uuid::new_v4().to_string(),
        x: matrix.x_at(col),
        y: matrix.y_at(row),
        z: matrix.z[row][col],
    }
}

/// Local maxima of the 8-neighbourhood above the threshold, one zone each
pub fn detect_zones(matrix: &Matrix, options: &ZoneOptions) -> Vec<Zone> {
    let (rows, cols) = (matrix.rows(), matrix.cols());
    if rows < 3 || cols < 3 {
        return vec![];
    }
    let Some([_, max]) = matrix.z_extent() else {
        return vec![];
    };
    if max <= 0.0 {
        return vec![];
    }
    let threshold = max * options.threshold_fraction;
    let hw = options.half_width;

    let mut zones = Vec::new();
    for r in 1..rows - 1 {
        for c in 1..cols - 1 {
            let v = matrix.z[r][c];
            if v <= threshold {
                continue;
            }
            let is_max = (r - 1..=r + 1)
                .flat_map(|rr| (c - 1..=c + 1).map(move |cc| (rr, cc)))
                .filter(|&(rr, cc)| (rr, cc) != (r, c))
                .all(|(rr, cc)| matrix.z.get(rr).and_then(|row| row.get(cc)).map_or(true, |&n| v >= n));
            if !is_max {
                continue;
            }
            let x = ZoneAxis::new(
                matrix.x_at(c.saturating_sub(hw)),
                matrix.x_at((c + hw).min(cols - 1)),
            );
            let y = ZoneAxis::new(
                matrix.y_at(r.saturating_sub(hw)),
                matrix.y_at((r + hw).min(rows - 1)),
            );
            zones.push(Zone::around(peak_at(matrix, r, c), x, y));
        }
    }
    log::debug!("Detected {} zones above {:.3e}", zones.len(), threshold);
    zones
}

/// Zone for a manually drawn box, holding the strongest point inside it.
/// `None` when the box contains no grid point.
pub fn zone_in_box(matrix: &Matrix, x: ZoneAxis, y: ZoneAxis) -> Option<Zone> {
    let mut best: Option<(usize, usize)> = None;
    for r in 0..matrix.rows() {
        if !y.contains(matrix.y_at(r)) {
            continue;
        }
        for c in 0..matrix.z[r].len() {
            if !x.contains(matrix.x_at(c)) {
                continue;
            }
            if best.map_or(true, |(br, bc)| matrix.z[r][c] > matrix.z[br][bc]) {
                best = Some((r, c));
            }
        }
    }
    best.map(|(r, c)| Zone::around(peak_at(matrix, r, c), x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ft_2d_spectrum;

    #[test]
    fn test_detect_cross_peaks() {
        let spectrum = ft_2d_spectrum("hsqc", &[(2.0, 40.0, 10.0), (7.0, 120.0, 8.0)]);
        let matrix = &spectrum.as_2d().unwrap().data.rr;
        let zones = detect_zones(matrix, &ZoneOptions::default());
        assert_eq!(zones.len(), 2);
        let first = &zones[0].signals[0];
        assert!((first.x.delta - 2.0).abs() < 1e-9);
        assert!((first.y.delta - 40.0).abs() < 1e-9);
        assert!(zones[0].x.contains(2.0) && zones[0].y.contains(40.0));
    }

    #[test]
    fn test_manual_box() {
        let spectrum = ft_2d_spectrum("hsqc", &[(7.0, 120.0, 8.0)]);
        let matrix = &spectrum.as_2d().unwrap().data.rr;
        let zone = zone_in_box(matrix, ZoneAxis::new(6.0, 8.0), ZoneAxis::new(110.0, 130.0)).unwrap();
        assert!((zone.signals[0].x.delta - 7.0).abs() < 1e-9);
        assert!(zone_in_box(matrix, ZoneAxis::new(20.0, 30.0), ZoneAxis::new(0.0, 1.0)).is_none());
    }
}
