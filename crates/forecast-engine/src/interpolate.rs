//! Scattered-point spatial interpolation onto the fixed lattice.
//!
//! Scalar fields are interpolated linearly (barycentric over a Delaunay
//! triangulation of the scattered points); lattice cells outside the convex
//! hull are backfilled with the nearest source value, so every output cell
//! is defined. Fewer than four source points is underdetermined and falls
//! back to a flat mean field, flagged as degenerate.
//!
//! Wind is never interpolated as an angle: speed/direction decompose into
//! (u, v) components, the components interpolate independently, and both
//! speed and direction are reconstructed from the interpolated vectors.

use rayon::prelude::*;
use std::collections::HashMap;

/// Minimum scattered points for a linear surface; below this the mean
/// fallback applies.
pub const MIN_SURFACE_POINTS: usize = 4;

/// An interpolated scalar field over the target cells.
#[derive(Debug, Clone)]
pub struct InterpolatedField {
    pub values: Vec<f64>,
    /// True when the flat-field mean fallback was used (low confidence).
    pub degenerate: bool,
}

/// Interpolated wind over the target cells, reconstructed from components.
#[derive(Debug, Clone)]
pub struct WindField {
    pub speed: Vec<f64>,
    /// Meteorological direction in degrees, normalized to [0, 360).
    pub direction: Vec<f64>,
    pub degenerate: bool,
}

/// Interpolate one scalar attribute from scattered points onto targets.
///
/// `lons`/`lats`/`values` are parallel arrays; `targets` are (lon, lat)
/// pairs. Never errors and never produces NaN: with no points at all the
/// field is zero (and degenerate), with fewer than [`MIN_SURFACE_POINTS`]
/// it is the broadcast mean.
pub fn interpolate_scalar(
    lons: &[f64],
    lats: &[f64],
    values: &[f64],
    targets: &[(f64, f64)],
) -> InterpolatedField {
    debug_assert_eq!(lons.len(), lats.len());
    debug_assert_eq!(lons.len(), values.len());

    let n = values.len();
    if n < MIN_SURFACE_POINTS {
        let mean = if n == 0 {
            0.0
        } else {
            values.iter().sum::<f64>() / n as f64
        };
        return InterpolatedField {
            values: vec![mean; targets.len()],
            degenerate: true,
        };
    }

    let points: Vec<(f64, f64)> = lons.iter().zip(lats).map(|(&x, &y)| (x, y)).collect();
    let triangles = triangulate(&points);

    let out: Vec<f64> = targets
        .par_iter()
        .map(|&(x, y)| {
            for t in &triangles {
                if let Some((u, v, w)) =
                    barycentric(points[t.0], points[t.1], points[t.2], (x, y))
                {
                    return u * values[t.0] + v * values[t.1] + w * values[t.2];
                }
            }
            // Outside the convex hull (or no valid triangulation): nearest
            // source point.
            values[nearest_point(&points, (x, y))]
        })
        .collect();

    InterpolatedField {
        values: out,
        degenerate: false,
    }
}

/// Interpolate wind component-wise and reconstruct speed and direction.
pub fn interpolate_wind(
    lons: &[f64],
    lats: &[f64],
    speeds: &[f64],
    directions: &[f64],
    targets: &[(f64, f64)],
) -> WindField {
    let (us, vs): (Vec<f64>, Vec<f64>) = speeds
        .iter()
        .zip(directions)
        .map(|(&s, &d)| {
            let rad = d.to_radians();
            (-s * rad.sin(), -s * rad.cos())
        })
        .unzip();

    let fu = interpolate_scalar(lons, lats, &us, targets);
    let fv = interpolate_scalar(lons, lats, &vs, targets);

    let speed = fu
        .values
        .iter()
        .zip(&fv.values)
        .map(|(&u, &v)| u.hypot(v))
        .collect();
    let direction = fu
        .values
        .iter()
        .zip(&fv.values)
        .map(|(&u, &v)| (-u).atan2(-v).to_degrees().rem_euclid(360.0))
        .collect();

    WindField {
        speed,
        direction,
        degenerate: fu.degenerate || fv.degenerate,
    }
}

fn nearest_point(points: &[(f64, f64)], target: (f64, f64)) -> usize {
    let mut best = 0usize;
    let mut best_d2 = f64::INFINITY;
    for (i, p) in points.iter().enumerate() {
        let d2 = (p.0 - target.0).powi(2) + (p.1 - target.1).powi(2);
        if d2 < best_d2 {
            best_d2 = d2;
            best = i;
        }
    }
    best
}

/// Barycentric coordinates of `p` in triangle (a, b, c), if inside.
fn barycentric(
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
    p: (f64, f64),
) -> Option<(f64, f64, f64)> {
    let denom = (b.1 - c.1) * (a.0 - c.0) + (c.0 - b.0) * (a.1 - c.1);
    if denom.abs() < 1e-30 {
        return None;
    }
    let u = ((b.1 - c.1) * (p.0 - c.0) + (c.0 - b.0) * (p.1 - c.1)) / denom;
    let v = ((c.1 - a.1) * (p.0 - c.0) + (a.0 - c.0) * (p.1 - c.1)) / denom;
    let w = 1.0 - u - v;

    const EPS: f64 = 1e-9;
    if u >= -EPS && v >= -EPS && w >= -EPS {
        Some((u, v, w))
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct Tri(usize, usize, usize);

fn signed_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)
}

/// True when `p` lies strictly inside the circumcircle of (a, b, c).
fn circumcircle_contains(a: (f64, f64), b: (f64, f64), c: (f64, f64), p: (f64, f64)) -> bool {
    let (ax, ay) = (a.0 - p.0, a.1 - p.1);
    let (bx, by) = (b.0 - p.0, b.1 - p.1);
    let (cx, cy) = (c.0 - p.0, c.1 - p.1);

    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);

    if signed_area(a, b, c) > 0.0 {
        det > 0.0
    } else {
        det < 0.0
    }
}

/// Bowyer-Watson Delaunay triangulation.
///
/// Exact duplicate points are collapsed before triangulation; collinear
/// inputs yield no triangles, which the caller handles via nearest
/// backfill. Triangle vertex indices refer to the input slice.
fn triangulate(points: &[(f64, f64)]) -> Vec<Tri> {
    // Collapse exact duplicates, remembering the first original index.
    let mut seen: HashMap<(u64, u64), usize> = HashMap::new();
    let mut unique: Vec<usize> = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let key = (p.0.to_bits(), p.1.to_bits());
        if seen.insert(key, i).is_none() {
            unique.push(i);
        }
    }
    if unique.len() < 3 {
        return Vec::new();
    }

    let pts: Vec<(f64, f64)> = unique.iter().map(|&i| points[i]).collect();
    let n = pts.len();

    // Super-triangle comfortably enclosing every point.
    let (mut min_x, mut min_y, mut max_x, mut max_y) =
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in &pts {
        min_x = min_x.min(p.0);
        min_y = min_y.min(p.1);
        max_x = max_x.max(p.0);
        max_y = max_y.max(p.1);
    }
    let dmax = (max_x - min_x).max(max_y - min_y).max(1.0);
    let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

    let mut all = pts.clone();
    all.push((mid_x - 20.0 * dmax, mid_y - dmax));
    all.push((mid_x, mid_y + 20.0 * dmax));
    all.push((mid_x + 20.0 * dmax, mid_y - dmax));

    let mut triangles = vec![Tri(n, n + 1, n + 2)];

    for i in 0..n {
        let p = all[i];

        let mut boundary: HashMap<(usize, usize), usize> = HashMap::new();
        let mut kept = Vec::with_capacity(triangles.len());
        for t in triangles {
            if circumcircle_contains(all[t.0], all[t.1], all[t.2], p) {
                for (a, b) in [(t.0, t.1), (t.1, t.2), (t.2, t.0)] {
                    let edge = if a < b { (a, b) } else { (b, a) };
                    *boundary.entry(edge).or_insert(0) += 1;
                }
            } else {
                kept.push(t);
            }
        }
        triangles = kept;

        for ((a, b), count) in boundary {
            // Shared edges of the cavity appear twice; only the rim survives.
            if count == 1 && signed_area(all[a], all[b], p).abs() > 1e-30 {
                triangles.push(Tri(a, b, i));
            }
        }
    }

    triangles
        .into_iter()
        .filter(|t| t.0 < n && t.1 < n && t.2 < n)
        .map(|t| Tri(unique[t.0], unique[t.1], unique[t.2]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> (Vec<f64>, Vec<f64>) {
        // 1°×1° box corners: SW, SE, NW, NE
        (
            vec![-99.0, -98.0, -99.0, -98.0],
            vec![19.0, 19.0, 20.0, 20.0],
        )
    }

    #[test]
    fn test_box_center_is_mean_of_corners() {
        let (lons, lats) = unit_box();
        let values = vec![10.0, 20.0, 30.0, 40.0];
        let field = interpolate_scalar(&lons, &lats, &values, &[(-98.5, 19.5)]);
        assert!(!field.degenerate);
        assert!(
            (field.values[0] - 25.0).abs() < 1e-9,
            "center = {}",
            field.values[0]
        );
    }

    #[test]
    fn test_constant_field_stays_constant() {
        let (lons, lats) = unit_box();
        let values = vec![7.5; 4];
        let targets = vec![
            (-98.5, 19.5),  // inside hull
            (-98.9, 19.1),  // inside, off-center
            (-97.0, 19.5),  // outside hull, nearest backfill
        ];
        let field = interpolate_scalar(&lons, &lats, &values, &targets);
        for v in &field.values {
            assert!((v - 7.5).abs() < 1e-9);
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_source_points_are_reproduced() {
        let (lons, lats) = unit_box();
        let values = vec![10.0, 20.0, 30.0, 40.0];
        let targets: Vec<(f64, f64)> = lons.iter().zip(&lats).map(|(&x, &y)| (x, y)).collect();
        let field = interpolate_scalar(&lons, &lats, &values, &targets);
        for (got, want) in field.values.iter().zip(&values) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fewer_than_four_points_broadcasts_mean() {
        let field = interpolate_scalar(
            &[-99.0, -98.0, -98.5],
            &[19.0, 19.0, 20.0],
            &[10.0, 20.0, 60.0],
            &[(-98.5, 19.5), (-90.0, 10.0)],
        );
        assert!(field.degenerate);
        for v in &field.values {
            assert!((v - 30.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_input_yields_zeros_not_nan() {
        let field = interpolate_scalar(&[], &[], &[], &[(-98.5, 19.5)]);
        assert!(field.degenerate);
        assert_eq!(field.values, vec![0.0]);
    }

    #[test]
    fn test_outside_hull_backfills_nearest() {
        let (lons, lats) = unit_box();
        let values = vec![10.0, 20.0, 30.0, 40.0];
        // Far east of the SE corner; nearest source is the 20.0 corner.
        let field = interpolate_scalar(&lons, &lats, &values, &[(-95.0, 19.0)]);
        assert!((field.values[0] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_points_never_undefined() {
        let field = interpolate_scalar(
            &[-99.0, -98.5, -98.0, -97.5],
            &[19.0, 19.0, 19.0, 19.0],
            &[1.0, 2.0, 3.0, 4.0],
            &[(-98.6, 19.4)],
        );
        assert!(field.values[0].is_finite());
        // Degenerate triangulation backfills with the nearest source point.
        assert!((field.values[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_direction_recovered_at_source_point() {
        let (lons, lats) = unit_box();
        let speeds = vec![2.0, 3.0, 4.0, 5.0];
        let dirs = vec![90.0, 180.0, 270.0, 45.0];
        let targets: Vec<(f64, f64)> = lons.iter().zip(&lats).map(|(&x, &y)| (x, y)).collect();
        let wind = interpolate_wind(&lons, &lats, &speeds, &dirs, &targets);
        for i in 0..4 {
            assert!((wind.speed[i] - speeds[i]).abs() < 1e-6, "speed {}", i);
            let dd = (wind.direction[i] - dirs[i]).abs();
            assert!(dd.min(360.0 - dd) < 1e-6, "direction {}", i);
        }
    }

    #[test]
    fn test_wind_wraps_across_north() {
        // Two points straddling 0°/360°: the vector mean is due north, where
        // a naive angular average would point south.
        let wind = interpolate_wind(
            &[-99.0, -98.0],
            &[19.0, 19.0],
            &[2.0, 2.0],
            &[350.0, 10.0],
            &[(-98.5, 19.0)],
        );
        assert!(wind.degenerate);
        let d = wind.direction[0];
        assert!(d < 1e-6 || (360.0 - d) < 1e-6, "direction = {}", d);
    }

    #[test]
    fn test_direction_normalized_to_0_360() {
        let (lons, lats) = unit_box();
        let wind = interpolate_wind(
            &lons,
            &lats,
            &[1.0, 1.0, 1.0, 1.0],
            &[359.0, 359.0, 359.0, 359.0],
            &[(-98.5, 19.5)],
        );
        assert!(wind.direction[0] >= 0.0 && wind.direction[0] < 360.0);
    }
}
